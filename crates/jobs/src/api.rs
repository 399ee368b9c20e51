// crates/jobs/src/api.rs
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_types::{ActiveJob, JobSubmissionRequest};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SubmissionError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The job server's REST surface.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// `POST {api}/jobs/submit`. The response body is passed through as-is.
    async fn submit(&self, request: &JobSubmissionRequest) -> Result<Value, SubmissionError>;

    /// `GET {api}/jobs/status`.
    async fn job_status(&self) -> Result<Vec<ActiveJob>, SubmissionError>;
}

#[derive(Debug, Clone)]
pub struct HttpJobApi {
    client: reqwest::Client,
    api_url: String,
}

impl HttpJobApi {
    pub fn new(api_url: impl Into<String>) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SubmissionError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        warn!(%status, "job API request rejected");
        Err(SubmissionError::Status { status, body })
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn submit(&self, request: &JobSubmissionRequest) -> Result<Value, SubmissionError> {
        let url = format!("{}/jobs/submit", self.api_url);
        debug!(%url, jobs = request.jobs.len(), "POST job submission");
        let resp = self.client.post(&url).json(request).send().await?;
        let resp = Self::check(resp).await?;

        // Some servers answer 200 with an empty body.
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    async fn job_status(&self) -> Result<Vec<ActiveJob>, SubmissionError> {
        let url = format!("{}/jobs/status", self.api_url);
        debug!(%url, "GET job status");
        let resp = self.client.get(&url).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json::<Vec<ActiveJob>>().await?)
    }
}
