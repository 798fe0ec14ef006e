//! HTTP client for the managed training-job API.
//!
//! Maps raw HTTP failures into the [`RemoteError`] taxonomy once, at this
//! boundary; the reconciler never inspects status codes or response
//! bodies.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::RemoteConfig;
use crate::error::{classify_api_failure, RemoteError, RemoteResult};
use crate::traits::{ApiProvider, TrainingJobApi};
use crate::types::{CreateJobRequest, JobDescription};

/// Fixed attribution tag sent with every call so remote-side audit logs
/// can identify operator-managed jobs.
pub const USER_AGENT: &str = "lodestar-operator/0.1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body shape the remote API uses for failures.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "__type", alias = "Code", default)]
    code: String,
    #[serde(rename = "message", alias = "Message", default)]
    message: String,
}

/// `reqwest`-backed implementation of [`TrainingJobApi`].
pub struct HttpTrainingJobClient {
    config: RemoteConfig,
    client: Client,
}

impl std::fmt::Debug for HttpTrainingJobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTrainingJobClient")
            .field("endpoint", &self.config.endpoint)
            .field("region", &self.config.region)
            .finish()
    }
}

impl HttpTrainingJobClient {
    /// Create a client for a resolved region configuration.
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::server_fault(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.endpoint)
    }

    /// Convert a non-success response into a classified error.
    async fn classify_response(response: Response) -> RemoteError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or(ApiErrorBody {
            code: String::new(),
            message: body.clone(),
        });
        classify_api_failure(status.as_u16(), &parsed.code, &parsed.message)
    }

    fn transport_error(err: reqwest::Error) -> RemoteError {
        RemoteError::server_fault(format!("transport failure: {err}"))
    }
}

#[async_trait::async_trait]
impl TrainingJobApi for HttpTrainingJobClient {
    #[instrument(skip(self, request), fields(job = %request.training_job_name))]
    async fn create_job(&self, request: &CreateJobRequest) -> RemoteResult<()> {
        let response = self
            .client
            .post(self.url("/jobs"))
            .json(request)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status().is_success() {
            debug!("Create accepted");
            return Ok(());
        }
        Err(Self::classify_response(response).await)
    }

    #[instrument(skip(self))]
    async fn describe_job(&self, job_name: &str) -> RemoteResult<JobDescription> {
        let response = self
            .client
            .get(self.url(&format!("/jobs/{job_name}")))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status() == StatusCode::OK {
            return response.json::<JobDescription>().await.map_err(|e| {
                RemoteError::server_fault(format!("malformed describe response: {e}"))
            });
        }
        Err(Self::classify_response(response).await)
    }

    #[instrument(skip(self))]
    async fn stop_job(&self, job_name: &str) -> RemoteResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/{job_name}/stop")))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status().is_success() {
            debug!("Stop accepted");
            return Ok(());
        }
        Err(Self::classify_response(response).await)
    }
}

/// Provider that builds an [`HttpTrainingJobClient`] per pass.
#[derive(Debug, Clone, Default)]
pub struct HttpApiProvider;

impl ApiProvider for HttpApiProvider {
    fn api_for(&self, config: &RemoteConfig) -> RemoteResult<Arc<dyn TrainingJobApi>> {
        Ok(Arc::new(HttpTrainingJobClient::new(config.clone())?))
    }
}
