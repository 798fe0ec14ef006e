//! Wire types for the managed training-job API.
//!
//! These mirror the remote API's request/response shapes. Hyperparameters
//! are kept in a `BTreeMap` so serialized payloads and spec/description
//! diffs are deterministically ordered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Primary lifecycle status of a remote training job.
///
/// The API may grow new states; `Unknown` preserves the raw value so an
/// unrecognized status never fails deserialization (the reconciler logs it
/// and leaves the object alone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Job is running.
    InProgress,
    /// A stop was requested and is landing.
    Stopping,
    /// Job was stopped before completion.
    Stopped,
    /// Job failed.
    Failed,
    /// Job ran to completion and produced artifacts.
    Completed,
    /// A status string this operator does not recognize.
    Unknown(String),
}

impl JobStatus {
    /// String representation as the remote API renders it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::InProgress => "InProgress",
            JobStatus::Stopping => "Stopping",
            JobStatus::Stopped => "Stopped",
            JobStatus::Failed => "Failed",
            JobStatus::Completed => "Completed",
            JobStatus::Unknown(raw) => raw,
        }
    }

    /// Terminal statuses: no further remote state transitions will occur
    /// and the reconciler stops issuing remote mutations.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Stopped | JobStatus::Failed | JobStatus::Completed
        )
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "InProgress" => JobStatus::InProgress,
            "Stopping" => JobStatus::Stopping,
            "Stopped" => JobStatus::Stopped,
            "Failed" => JobStatus::Failed,
            "Completed" => JobStatus::Completed,
            _ => JobStatus::Unknown(raw),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for creating a training job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateJobRequest {
    /// Name the job will be addressed by. Fixed at creation time.
    pub training_job_name: String,
    /// Container image holding the training algorithm.
    pub training_image: String,
    /// Compute instance type.
    pub instance_type: String,
    /// Number of instances.
    pub instance_count: i32,
    /// Wall-clock runtime cap, in seconds.
    pub max_runtime_in_seconds: i64,
    /// Algorithm hyperparameters.
    pub hyper_parameters: BTreeMap<String, String>,
    /// Base path artifacts are written under (e.g. `s3://bucket/prefix/`).
    pub output_path: String,
}

/// The remote API's view of a training job, as returned by describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobDescription {
    /// Assigned job name.
    pub training_job_name: String,
    /// Primary lifecycle status.
    pub training_job_status: JobStatus,
    /// Finer-grained progress string (e.g. `Downloading`, `Training`).
    #[serde(default)]
    pub secondary_status: String,
    /// Populated when the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Creation-fixed fields echoed back by the API.
    pub training_image: String,
    pub instance_type: String,
    pub instance_count: i32,
    pub max_runtime_in_seconds: i64,
    #[serde(default)]
    pub hyper_parameters: BTreeMap<String, String>,
    pub output_path: String,
}
