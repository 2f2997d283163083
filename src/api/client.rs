use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tokio::sync::OnceCell;

use crate::api::types::{JobDetails, JobLogBatch, JobSubmission};
use crate::api::JobService;
use crate::config::OvhConf;
use crate::error::ApiError;

/// Timestamp format for the `from` log query parameter (millisecond
/// precision, UTC).
const LOG_FROM_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Resolve the short endpoint aliases accepted in `[ovh]` configuration.
fn resolve_endpoint(endpoint: &str) -> String {
    match endpoint {
        "ovh-eu" => "https://eu.api.ovh.com/1.0".to_string(),
        "ovh-ca" => "https://ca.api.ovh.com/1.0".to_string(),
        "ovh-us" => "https://api.us.ovhcloud.com/1.0".to_string(),
        other => other.trim_end_matches('/').to_string(),
    }
}

/// Signed client for the Data Processing job API.
///
/// Owns no job state; its only memory is the timestamp of the last log entry
/// it has seen, which [`JobService::get_log_last`] replays as the `from`
/// bound. Deduplication of re-sent entries is the caller's business.
pub struct DataProcessingClient {
    http: reqwest::Client,
    endpoint: String,
    application_key: String,
    application_secret: String,
    consumer_key: String,
    /// Drift between the API clock and ours, fetched once from /auth/time.
    time_delta: OnceCell<i64>,
    last_log_seen: Option<DateTime<Utc>>,
}

impl DataProcessingClient {
    pub fn new(conf: &OvhConf) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: resolve_endpoint(&conf.endpoint),
            application_key: conf.application_key.clone(),
            application_secret: conf.application_secret.clone(),
            consumer_key: conf.consumer_key.clone(),
            time_delta: OnceCell::new(),
            last_log_seen: None,
        }
    }

    async fn time_delta(&self) -> Result<i64, ApiError> {
        self.time_delta
            .get_or_try_init(|| async {
                let url = format!("{}/auth/time", self.endpoint);
                let body = self.http.get(&url).send().await?.text().await?;
                let server_time: i64 = body
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::InvalidResponse(format!("bad /auth/time: {body}")))?;
                Ok(server_time - Utc::now().timestamp())
            })
            .await
            .copied()
    }

    /// Send a signed request. `path` includes any query string; the signature
    /// covers the exact URL and body bytes that go on the wire.
    async fn signed(&self, method: Method, path: &str, body: &str) -> Result<Response, ApiError> {
        let delta = self.time_delta().await?;
        let timestamp = Utc::now().timestamp() + delta;
        let url = format!("{}{}", self.endpoint, path);

        let payload = format!(
            "{}+{}+{}+{}+{}+{}",
            self.application_secret,
            self.consumer_key,
            method.as_str(),
            url,
            body,
            timestamp
        );
        let signature = format!("$1${}", hex::encode(Sha1::digest(payload.as_bytes())));

        let mut request = self
            .http
            .request(method, &url)
            .header("X-Ovh-Application", &self.application_key)
            .header("X-Ovh-Consumer", &self.consumer_key)
            .header("X-Ovh-Timestamp", timestamp.to_string())
            .header("X-Ovh-Signature", signature)
            .header("Content-Type", "application/json");
        if !body.is_empty() {
            request = request.body(body.to_string());
        }
        Ok(request.send().await?)
    }

    async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn api_error(response: Response) -> ApiError {
        #[derive(Deserialize, Default)]
        struct RawError {
            #[serde(default)]
            class: String,
            #[serde(default)]
            message: String,
        }

        let status = response.status().as_u16();
        let query_id = response
            .headers()
            .get("X-Ovh-Queryid")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response.text().await.unwrap_or_default();
        let raw: RawError = serde_json::from_str(&text).unwrap_or_default();
        let message = if raw.message.is_empty() {
            text
        } else {
            raw.message
        };

        ApiError::Api {
            status,
            class: raw.class,
            message,
            query_id,
        }
    }
}

#[async_trait]
impl JobService for DataProcessingClient {
    async fn submit(
        &mut self,
        project_id: &str,
        job: &JobSubmission,
    ) -> Result<JobDetails, ApiError> {
        let path = format!("/cloud/project/{project_id}/dataProcessing/jobs");
        let body = serde_json::to_string(job)
            .map_err(|e| ApiError::InvalidResponse(format!("unserializable submission: {e}")))?;
        let response = self.signed(Method::POST, &path, &body).await?;
        Self::expect_json(response).await
    }

    async fn get_status(
        &mut self,
        project_id: &str,
        job_id: &str,
    ) -> Result<JobDetails, ApiError> {
        let path = format!("/cloud/project/{project_id}/dataProcessing/jobs/{job_id}");
        let response = self.signed(Method::GET, &path, "").await?;
        Self::expect_json(response).await
    }

    async fn get_log(
        &mut self,
        project_id: &str,
        job_id: &str,
        from: Option<DateTime<Utc>>,
    ) -> Result<JobLogBatch, ApiError> {
        let mut path = format!("/cloud/project/{project_id}/dataProcessing/jobs/{job_id}/logs");
        if let Some(from) = from {
            path.push_str(&format!("?from={}", from.format(LOG_FROM_FORMAT)));
        }
        let response = self.signed(Method::GET, &path, "").await?;
        let batch: JobLogBatch = Self::expect_json(response).await?;

        let newest = batch
            .logs
            .iter()
            .filter_map(|entry| DateTime::parse_from_rfc3339(&entry.timestamp).ok())
            .map(|t| t.with_timezone(&Utc))
            .max();
        if let Some(newest) = newest {
            self.last_log_seen = Some(newest);
        }
        Ok(batch)
    }

    async fn get_log_last(
        &mut self,
        project_id: &str,
        job_id: &str,
    ) -> Result<JobLogBatch, ApiError> {
        let from = self.last_log_seen;
        self.get_log(project_id, job_id, from).await
    }

    async fn kill(&mut self, project_id: &str, job_id: &str) -> Result<(), ApiError> {
        let path = format!("/cloud/project/{project_id}/dataProcessing/jobs/{job_id}");
        let response = self.signed(Method::DELETE, &path, "").await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}
