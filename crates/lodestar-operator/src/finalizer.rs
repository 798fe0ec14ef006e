//! Finalizer-gated deletion.
//!
//! Deletion must never orphan a running remote job and never leave the
//! local object stuck. The finalizer marker blocks the datastore from
//! removing the object until the remote job is confirmed absent or fully
//! stopped; only then is the marker stripped and the datastore allowed to
//! complete the deletion.

use tracing::{debug, info, warn};

use lodestar_remote::config::RegionResolver;
use lodestar_remote::traits::{ApiProvider, TrainingJobApi};
use lodestar_remote::types::{JobDescription, JobStatus};

use crate::engine::TrainingJobReconciler;
use crate::object::TrainingJob;
use crate::requeue::Outcome;
use crate::status::status_from_description;
use crate::store::JobStore;

impl<S, P, R> TrainingJobReconciler<S, P, R>
where
    S: JobStore,
    P: ApiProvider,
    R: RegionResolver,
{
    /// Drive the stop-then-release sequence for an object under deletion
    /// whose remote job still exists.
    pub(crate) async fn finalize_with_description(
        &self,
        state: &TrainingJob,
        api: &dyn TrainingJobApi,
        description: &JobDescription,
        log_url: &str,
    ) -> Outcome {
        if !state.metadata.has_finalizer(&self.config.finalizer) {
            debug!("Object carries no finalizer, nothing to do");
            return Outcome::done();
        }

        let job_name = description.training_job_name.as_str();
        match &description.training_job_status {
            JobStatus::InProgress => {
                info!("Deletion requested while job is running, issuing stop");
                match api.stop_job(job_name).await {
                    Ok(()) => Outcome::requeue_immediately(),
                    Err(err) => {
                        self.handle_remote_api_error(state, job_name, log_url, err)
                            .await
                    }
                }
            }
            JobStatus::Stopping => {
                debug!("Stop is landing, waiting");
                let refreshed = status_from_description(description, job_name, log_url);
                if let Err(e) = self.status.replace(state, refreshed).await {
                    warn!(error = %e, "Failed to refresh status while waiting for stop");
                }
                Outcome::requeue_after(self.config.poll_interval())
            }
            JobStatus::Stopped | JobStatus::Failed | JobStatus::Completed => {
                info!("Remote job is terminal, releasing finalizer");
                self.remove_finalizer_and_update(state).await
            }
            JobStatus::Unknown(raw) => {
                // Safer to leak a pending deletion than to orphan a
                // possibly-running remote job.
                warn!(status = %raw, "Unrecognized remote status during deletion, keeping finalizer");
                Outcome::done()
            }
        }
    }

    /// Strip the finalizer marker and persist, letting the datastore
    /// complete the deletion.
    pub(crate) async fn remove_finalizer_and_update(&self, state: &TrainingJob) -> Outcome {
        let mut updated = state.clone();
        updated.metadata.remove_finalizer(&self.config.finalizer);
        Outcome::requeue_if_error(self.store.update(&updated).await)
    }
}
