//! Declarative training-job objects.
//!
//! `TrainingJob` is the datastore's record of a desired training run:
//! identity and lifecycle markers in [`ObjectMeta`], the user's desired
//! configuration in [`TrainingJobSpec`], and the operator's observed view
//! in [`TrainingJobStatus`]. The datastore owns these objects; the engine
//! only ever holds a transient copy for the duration of one pass.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lodestar_core::{ResourceKey, ResourceUid};
use lodestar_remote::types::{CreateJobRequest, JobDescription, JobStatus};

/// Object identity and lifecycle markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Namespace the object lives in.
    pub namespace: String,
    /// Object name, unique within the namespace.
    pub name: String,
    /// Cluster-unique identifier, stable for the object's lifetime.
    pub uid: ResourceUid,
    /// Incremented by the datastore on every spec change (and only on
    /// spec changes).
    #[serde(default)]
    pub generation: i64,
    /// Incremented by the datastore on every write; the optimistic
    /// concurrency token for updates.
    #[serde(default)]
    pub resource_version: i64,
    /// Present iff deletion has been requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    /// Finalizer markers blocking removal from the datastore.
    #[serde(default)]
    pub finalizers: Vec<String>,
}

impl ObjectMeta {
    /// The namespace-scoped key this object is addressed by.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Whether deletion has been requested.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// Whether the named finalizer is present.
    #[must_use]
    pub fn has_finalizer(&self, name: &str) -> bool {
        self.finalizers.iter().any(|f| f == name)
    }

    /// Add the named finalizer if absent.
    pub fn add_finalizer(&mut self, name: &str) {
        if !self.has_finalizer(name) {
            self.finalizers.push(name.to_string());
        }
    }

    /// Remove the named finalizer if present.
    pub fn remove_finalizer(&mut self, name: &str) {
        self.finalizers.retain(|f| f != name);
    }
}

/// Where the remote platform writes training artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLocation {
    /// Base path artifacts land under (e.g. `s3://bucket/prefix/`). The
    /// model artifact path is derived by appending the job name and the
    /// platform's fixed artifact suffix.
    pub base_path: String,
}

/// Desired configuration. Fixed by the user; the engine only ever touches
/// `job_name`, once, to persist the generated remote name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJobSpec {
    /// Explicit remote job name. Assigned at most once: either by the
    /// user at creation or by the engine's name-assignment bootstrap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    /// Region the job runs in.
    pub region: String,
    /// Per-object endpoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Container image holding the training algorithm.
    pub training_image: String,
    /// Compute instance type.
    pub instance_type: String,
    /// Number of instances.
    pub instance_count: i32,
    /// Wall-clock runtime cap, in seconds.
    pub max_runtime_secs: i64,
    /// Algorithm hyperparameters. A `BTreeMap` keeps wire payloads and
    /// spec/description diffs deterministically ordered.
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, String>,
    /// Artifact output location.
    pub output_location: OutputLocation,
}

impl TrainingJobSpec {
    /// Build the remote create request for this spec under the given
    /// resolved job name.
    #[must_use]
    pub fn to_create_request(&self, job_name: &str) -> CreateJobRequest {
        CreateJobRequest {
            training_job_name: job_name.to_string(),
            training_image: self.training_image.clone(),
            instance_type: self.instance_type.clone(),
            instance_count: self.instance_count,
            max_runtime_in_seconds: self.max_runtime_secs,
            hyper_parameters: self.hyperparameters.clone(),
            output_path: self.output_location.base_path.clone(),
        }
    }
}

/// Observed state, written back by the engine. Always replaced wholesale,
/// never field-patched, to avoid merge races between writers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingJobStatus {
    /// Primary lifecycle status as the remote API renders it.
    #[serde(default)]
    pub primary_status: String,
    /// Finer-grained progress string.
    #[serde(default)]
    pub secondary_status: String,
    /// Remote job name the object is bound to.
    #[serde(default)]
    pub remote_job_name: String,
    /// When the engine last checked the remote job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_time: Option<DateTime<Utc>>,
    /// Free-text detail: a failure reason or drift report.
    #[serde(default)]
    pub additional: String,
    /// Console URL for the job's logs.
    #[serde(default)]
    pub log_url: String,
    /// Derived model artifact path, populated once the job completes.
    #[serde(default)]
    pub model_path: String,
}

impl TrainingJobStatus {
    /// Whether the recorded primary status is terminal
    /// (stopped/failed/completed).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        JobStatus::from(self.primary_status.clone()).is_terminal()
    }

    /// Whether the recorded primary and secondary statuses already match
    /// the remote description.
    #[must_use]
    pub fn matches_description(&self, description: &JobDescription) -> bool {
        self.primary_status == description.training_job_status.as_str()
            && self.secondary_status == description.secondary_status
    }
}

/// A declarative training-job object as stored in the datastore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub metadata: ObjectMeta,
    pub spec: TrainingJobSpec,
    #[serde(default)]
    pub status: TrainingJobStatus,
}

impl TrainingJob {
    /// The namespace-scoped key this object is addressed by.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.metadata.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ObjectMeta {
        ObjectMeta {
            namespace: "team-a".to_string(),
            name: "mnist".to_string(),
            uid: ResourceUid::new(),
            generation: 1,
            resource_version: 1,
            deletion_timestamp: None,
            finalizers: vec![],
        }
    }

    #[test]
    fn test_finalizer_add_is_idempotent() {
        let mut m = meta();
        m.add_finalizer("a/finalizer");
        m.add_finalizer("a/finalizer");
        assert_eq!(m.finalizers.len(), 1);
        assert!(m.has_finalizer("a/finalizer"));
    }

    #[test]
    fn test_finalizer_remove_leaves_others() {
        let mut m = meta();
        m.add_finalizer("a/finalizer");
        m.add_finalizer("b/finalizer");
        m.remove_finalizer("a/finalizer");
        assert_eq!(m.finalizers, vec!["b/finalizer".to_string()]);
    }

    #[test]
    fn test_is_deleting() {
        let mut m = meta();
        assert!(!m.is_deleting());
        m.deletion_timestamp = Some(Utc::now());
        assert!(m.is_deleting());
    }

    #[test]
    fn test_status_terminal_detection() {
        let mut status = TrainingJobStatus::default();
        assert!(!status.is_terminal());
        for terminal in ["Stopped", "Failed", "Completed"] {
            status.primary_status = terminal.to_string();
            assert!(status.is_terminal(), "{terminal} should be terminal");
        }
        status.primary_status = "InProgress".to_string();
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_create_request_carries_spec_fields() {
        let spec = TrainingJobSpec {
            job_name: None,
            region: "us-west-2".to_string(),
            endpoint: None,
            training_image: "registry.example.com/mnist:1".to_string(),
            instance_type: "gpu.xlarge".to_string(),
            instance_count: 2,
            max_runtime_secs: 3600,
            hyperparameters: [("lr".to_string(), "0.01".to_string())].into(),
            output_location: OutputLocation {
                base_path: "s3://bucket/prefix/".to_string(),
            },
        };
        let request = spec.to_create_request("mnist-abc");
        assert_eq!(request.training_job_name, "mnist-abc");
        assert_eq!(request.instance_count, 2);
        assert_eq!(request.output_path, "s3://bucket/prefix/");
        assert_eq!(request.hyper_parameters.get("lr").unwrap(), "0.01");
    }
}
