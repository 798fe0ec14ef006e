//! Remote API traits
//!
//! The call boundary the reconciler drives the remote training platform
//! through, and the provider used to construct a client per reconciliation
//! pass from resolved region configuration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RemoteConfig;
use crate::error::RemoteResult;
use crate::types::{CreateJobRequest, JobDescription};

/// Call boundary to the managed training-job API.
///
/// All failures come back already classified; see
/// [`crate::error::RemoteError`].
#[async_trait]
pub trait TrainingJobApi: Send + Sync {
    /// Submit a new training job.
    ///
    /// Creation is asynchronous on the remote side: a successful return
    /// means the job was accepted, not that it is running. Callers
    /// re-describe to observe progress.
    async fn create_job(&self, request: &CreateJobRequest) -> RemoteResult<()>;

    /// Fetch the remote view of the named job.
    async fn describe_job(&self, job_name: &str) -> RemoteResult<JobDescription>;

    /// Request that the named job stop. Stopping is asynchronous; the job
    /// transitions through `Stopping` before reaching `Stopped`.
    async fn stop_job(&self, job_name: &str) -> RemoteResult<()>;
}

/// Constructs a [`TrainingJobApi`] client for a resolved region
/// configuration. The reconciler builds a fresh client each pass so that
/// per-object region and endpoint overrides take effect immediately.
pub trait ApiProvider: Send + Sync {
    /// Build a client for the given configuration.
    fn api_for(&self, config: &RemoteConfig) -> RemoteResult<Arc<dyn TrainingJobApi>>;
}

// Blanket implementation so a closure can serve as a provider, which keeps
// the engine wirable with scripted clients in tests.
impl<F> ApiProvider for F
where
    F: Fn(&RemoteConfig) -> RemoteResult<Arc<dyn TrainingJobApi>> + Send + Sync,
{
    fn api_for(&self, config: &RemoteConfig) -> RemoteResult<Arc<dyn TrainingJobApi>> {
        self(config)
    }
}
