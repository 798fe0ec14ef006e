//! Reconciliation engine.
//!
//! One bounded, side-effecting pass per invocation: load the object,
//! observe the remote job, and take exactly as much action as the gap
//! between declared and observed state requires, ending in a requeue
//! directive for the dispatcher. The engine keeps no state between
//! passes; correctness relies only on re-describing the remote job before
//! acting, so a pass may be re-invoked at any time, in any order relative
//! to previous passes.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use lodestar_core::{generated_job_name, ResourceKey, MAX_REMOTE_NAME_LEN};
use lodestar_remote::config::RegionResolver;
use lodestar_remote::error::RemoteError;
use lodestar_remote::traits::{ApiProvider, TrainingJobApi};
use lodestar_remote::types::JobStatus;

use crate::compare::{drift_failure_message, spec_matches_description};
use crate::config::OperatorConfig;
use crate::error::ReconcileError;
use crate::object::TrainingJob;
use crate::requeue::Outcome;
use crate::status::{
    failed_status, initializing_status, log_url_for, model_artifact_path,
    status_from_description, StatusWriter, INITIALIZING_STATUS,
};
use crate::store::JobStore;

/// Reconciles one `TrainingJob` object per invocation.
pub struct TrainingJobReconciler<S, P, R> {
    pub(crate) store: Arc<S>,
    pub(crate) status: StatusWriter<S>,
    pub(crate) provider: P,
    pub(crate) resolver: R,
    pub(crate) config: OperatorConfig,
}

impl<S, P, R> TrainingJobReconciler<S, P, R>
where
    S: JobStore,
    P: ApiProvider,
    R: RegionResolver,
{
    /// Create a reconciler.
    pub fn new(store: Arc<S>, resolver: R, provider: P, config: OperatorConfig) -> Self {
        Self {
            status: StatusWriter::new(store.clone()),
            store,
            provider,
            resolver,
            config,
        }
    }

    /// Perform one reconciliation pass for the object under `key`.
    #[instrument(skip(self), fields(job = %key))]
    pub async fn reconcile(&self, key: &ResourceKey) -> Outcome {
        let mut state = match self.store.get(key).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                debug!("Object is gone, nothing to reconcile");
                return Outcome::done();
            }
            Err(e) => return Outcome::fail(e),
        };

        // A fresh object gets an intermediate status before anything else
        // so it is never observed with an empty status.
        if state.status.primary_status.is_empty() {
            info!(status = INITIALIZING_STATUS, "Status is empty, writing intermediate status");
            return match self.status.replace(&state, initializing_status()).await {
                Ok(()) => Outcome::requeue_immediately(),
                Err(e) => Outcome::fail(e),
            };
        }

        let job_name = match state.spec.job_name.clone() {
            Some(name) if !name.is_empty() => name,
            _ => {
                let name = generated_job_name(
                    &state.metadata.uid,
                    &state.metadata.name,
                    MAX_REMOTE_NAME_LEN,
                );
                info!(generated = %name, "Assigning generated remote job name to spec");
                state.spec.job_name = Some(name);
                // The spec update triggers its own invocation through the
                // datastore; requeueing here as well would double-drive
                // the object.
                return Outcome::requeue_if_error(self.store.update(&state).await);
            }
        };

        let endpoint_override = state
            .spec
            .endpoint
            .as_deref()
            .or(self.config.default_endpoint.as_deref());
        let api = match self
            .resolver
            .resolve(&state.spec.region, endpoint_override)
            .map_err(ReconcileError::from)
            .and_then(|config| self.provider.api_for(&config).map_err(ReconcileError::from))
        {
            Ok(api) => api,
            Err(e) => {
                // An unchanged misconfiguration will not heal by retrying.
                error!(error = %e, "Cannot resolve remote access configuration");
                return Outcome::done();
            }
        };

        let log_url = log_url_for(&state.spec.region, &job_name);

        debug!("Describing remote job");
        let described = api.describe_job(&job_name).await;

        if state.metadata.is_deleting() {
            return match described {
                Ok(description) => {
                    self.finalize_with_description(&state, api.as_ref(), &description, &log_url)
                        .await
                }
                Err(err) if err.is_not_found() => {
                    info!("Remote job is already absent, releasing finalizer");
                    self.remove_finalizer_and_update(&state).await
                }
                Err(err) => {
                    self.handle_remote_api_error(&state, &job_name, &log_url, err)
                        .await
                }
            };
        }

        let description = match described {
            Ok(description) => description,
            Err(err) if err.is_not_found() => {
                if state.status.is_terminal() {
                    // The object already reached a terminal state; creating
                    // again would resurrect a finished job.
                    debug!(
                        status = %state.status.primary_status,
                        "Object is terminal, not re-creating remote job"
                    );
                    return Outcome::done();
                }
                info!("Remote job does not exist yet, creating it");
                return self
                    .create_remote_job(&state, api.as_ref(), &job_name, &log_url)
                    .await;
            }
            Err(err) => {
                return self
                    .handle_remote_api_error(&state, &job_name, &log_url, err)
                    .await
            }
        };

        // The remote API fixes configuration at creation time; drift means
        // the declared spec no longer describes the job that actually runs.
        let comparison = spec_matches_description(&state.spec, &description);
        if !comparison.equal {
            warn!(
                differences = comparison.differences.len(),
                "Declared spec differs from remote description, marking failed"
            );
            let failed = failed_status(
                &job_name,
                &log_url,
                drift_failure_message(&comparison.differences),
            );
            return Outcome::requeue_if_error(self.status.replace(&state, failed).await);
        }

        if !state.metadata.has_finalizer(&self.config.finalizer) {
            info!(finalizer = %self.config.finalizer, "Attaching finalizer");
            let previous_generation = state.metadata.generation;
            state.metadata.add_finalizer(&self.config.finalizer);
            return match self.store.update(&state).await {
                Ok(updated) => Outcome::requeue_immediately_unless_generation_changed(
                    previous_generation,
                    updated.metadata.generation,
                ),
                Err(e) => Outcome::fail(e),
            };
        }

        if !state.status.matches_description(&description) {
            debug!(
                remote_status = %description.training_job_status,
                "Local status trails remote job, refreshing"
            );
            let refreshed = status_from_description(&description, &job_name, &log_url);
            return match self.status.replace(&state, refreshed).await {
                Ok(()) => Outcome::requeue_after(self.config.poll_interval()),
                Err(e) => Outcome::requeue_after_with(self.config.poll_interval(), Some(e.into())),
            };
        }

        match &description.training_job_status {
            JobStatus::InProgress | JobStatus::Stopping => {
                let refreshed = status_from_description(&description, &job_name, &log_url);
                match self.status.replace(&state, refreshed).await {
                    Ok(()) => Outcome::requeue_after(self.config.poll_interval()),
                    Err(e) => {
                        Outcome::requeue_after_with(self.config.poll_interval(), Some(e.into()))
                    }
                }
            }
            JobStatus::Stopped | JobStatus::Failed => Outcome::done(),
            JobStatus::Completed => {
                info!("Training completed, recording model artifact path");
                let mut refreshed = status_from_description(&description, &job_name, &log_url);
                refreshed.model_path =
                    model_artifact_path(&state.spec.output_location.base_path, &job_name);
                Outcome::requeue_if_error(self.status.replace(&state, refreshed).await)
            }
            JobStatus::Unknown(raw) => {
                warn!(status = %raw, "Remote job is in an unrecognized status");
                Outcome::done()
            }
        }
    }

    /// Submit the remote job described by the spec.
    pub(crate) async fn create_remote_job(
        &self,
        state: &TrainingJob,
        api: &dyn TrainingJobApi,
        job_name: &str,
        log_url: &str,
    ) -> Outcome {
        let request = state.spec.to_create_request(job_name);
        info!(image = %request.training_image, "Creating remote training job");
        match api.create_job(&request).await {
            // Requeue to re-describe and pick up the job's initial status.
            Ok(()) => Outcome::requeue_immediately(),
            Err(err) => {
                self.handle_remote_api_error(state, job_name, log_url, err)
                    .await
            }
        }
    }

    /// Retry transient remote failures on the poll interval; persist a
    /// terminal failed status for everything else.
    pub(crate) async fn handle_remote_api_error(
        &self,
        state: &TrainingJob,
        job_name: &str,
        log_url: &str,
        err: RemoteError,
    ) -> Outcome {
        if err.is_transient() {
            warn!(error = %err, "Transient remote API failure, will retry");
            return Outcome::requeue_after_with(self.config.poll_interval(), Some(err.into()));
        }

        error!(error = %err, "Unrecoverable remote API failure");
        let failed = failed_status(job_name, log_url, err.to_string());
        Outcome::requeue_if_error(self.status.replace(state, failed).await)
    }
}
