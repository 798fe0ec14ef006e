//! Status synchronization.
//!
//! The engine reports observed state by replacing the object's entire
//! status through the datastore boundary. Partial field mutation is never
//! performed; builders here always produce a complete status value with a
//! fresh `last_check_time`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use lodestar_remote::types::JobDescription;

use crate::object::{TrainingJob, TrainingJobStatus};
use crate::store::{JobStore, StoreResult};

/// Intermediate status written before the first remote interaction, so an
/// object is never observed with an empty status after its first pass.
pub const INITIALIZING_STATUS: &str = "Initializing";

/// Suffix the remote platform stores the model artifact under, relative
/// to `output_path + job_name`.
pub const MODEL_ARTIFACT_SUFFIX: &str = "/output/model.tar.gz";

/// Console URL for a job's logs. Fixed template over region + job name.
#[must_use]
pub fn log_url_for(region: &str, job_name: &str) -> String {
    format!(
        "https://console.mljobs.cloud/{region}/logs?group=/mljobs/training-jobs&prefix={job_name}"
    )
}

/// Derived model artifact path. The base path is concatenated as-is (the
/// platform treats it as an opaque prefix), then the job name and the
/// fixed artifact suffix.
#[must_use]
pub fn model_artifact_path(output_base: &str, job_name: &str) -> String {
    format!("{output_base}{job_name}{MODEL_ARTIFACT_SUFFIX}")
}

/// Status written on a fresh object's first pass, before the remote job
/// exists.
#[must_use]
pub fn initializing_status() -> TrainingJobStatus {
    TrainingJobStatus {
        primary_status: INITIALIZING_STATUS.to_string(),
        last_check_time: Some(Utc::now()),
        ..TrainingJobStatus::default()
    }
}

/// Status reflecting a live remote description.
#[must_use]
pub fn status_from_description(
    description: &JobDescription,
    job_name: &str,
    log_url: &str,
) -> TrainingJobStatus {
    TrainingJobStatus {
        primary_status: description.training_job_status.as_str().to_string(),
        secondary_status: description.secondary_status.clone(),
        remote_job_name: job_name.to_string(),
        last_check_time: Some(Utc::now()),
        additional: description.failure_reason.clone().unwrap_or_default(),
        log_url: log_url.to_string(),
        model_path: String::new(),
    }
}

/// Terminal failed status carrying free-text detail (an unrecoverable
/// remote error or a drift report).
#[must_use]
pub fn failed_status(
    job_name: &str,
    log_url: &str,
    additional: impl Into<String>,
) -> TrainingJobStatus {
    TrainingJobStatus {
        primary_status: "Failed".to_string(),
        secondary_status: String::new(),
        remote_job_name: job_name.to_string(),
        last_check_time: Some(Utc::now()),
        additional: additional.into(),
        log_url: log_url.to_string(),
        model_path: String::new(),
    }
}

/// Writes status values back through the datastore boundary.
///
/// If `replace` fails the caller must request a requeue rather than drop
/// the write: a terminal status that fails to persist would otherwise
/// leave the object unfinished forever.
pub struct StatusWriter<S> {
    store: Arc<S>,
}

impl<S: JobStore> StatusWriter<S> {
    /// Create a writer over the store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Atomically replace the object's entire status.
    #[instrument(skip(self, job, status), fields(job = %job.key(), status = %status.primary_status))]
    pub async fn replace(&self, job: &TrainingJob, status: TrainingJobStatus) -> StoreResult<()> {
        debug!(
            secondary = %status.secondary_status,
            "Replacing job status"
        );
        self.store.update_status(job, &status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_artifact_path_concatenates_base_as_is() {
        // The base path is an opaque prefix: no separator is inserted.
        assert_eq!(
            model_artifact_path("s3://bucket/prefix", "job-123"),
            "s3://bucket/prefixjob-123/output/model.tar.gz"
        );
        assert_eq!(
            model_artifact_path("s3://bucket/prefix/", "job-123"),
            "s3://bucket/prefix/job-123/output/model.tar.gz"
        );
    }

    #[test]
    fn test_log_url_embeds_region_and_job() {
        let url = log_url_for("us-west-2", "mnist-abc");
        assert!(url.contains("us-west-2"));
        assert!(url.ends_with("prefix=mnist-abc"));
    }

    #[test]
    fn test_initializing_status_sets_marker_and_timestamp() {
        let status = initializing_status();
        assert_eq!(status.primary_status, INITIALIZING_STATUS);
        assert!(status.last_check_time.is_some());
        assert!(status.remote_job_name.is_empty());
    }

    #[test]
    fn test_status_from_description_carries_failure_reason() {
        use lodestar_remote::types::{JobDescription, JobStatus};

        let description = JobDescription {
            training_job_name: "mnist-abc".to_string(),
            training_job_status: JobStatus::Failed,
            secondary_status: "Failed".to_string(),
            failure_reason: Some("bad input channel".to_string()),
            training_image: String::new(),
            instance_type: String::new(),
            instance_count: 1,
            max_runtime_in_seconds: 0,
            hyper_parameters: Default::default(),
            output_path: String::new(),
        };
        let status = status_from_description(&description, "mnist-abc", "https://logs");
        assert_eq!(status.primary_status, "Failed");
        assert_eq!(status.additional, "bad input channel");
        assert_eq!(status.log_url, "https://logs");
    }
}
