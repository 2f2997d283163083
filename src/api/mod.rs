pub mod client;
pub mod types;

pub use client::DataProcessingClient;
pub use types::{
    EngineParameter, JobDetails, JobLogBatch, JobState, JobSubmission, LogEntry, StatusClass,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ApiError;

/// The four remote operations of the Data Processing job API.
///
/// The supervisor only talks to the remote through this trait, which keeps
/// the whole lifecycle testable against a scripted implementation.
#[async_trait]
pub trait JobService: Send {
    async fn submit(
        &mut self,
        project_id: &str,
        job: &JobSubmission,
    ) -> Result<JobDetails, ApiError>;

    async fn get_status(&mut self, project_id: &str, job_id: &str)
        -> Result<JobDetails, ApiError>;

    /// Fetch log entries. `from`, when present, is an inclusive lower bound
    /// serialized with millisecond precision; `None` requests the full log.
    async fn get_log(
        &mut self,
        project_id: &str,
        job_id: &str,
        from: Option<DateTime<Utc>>,
    ) -> Result<JobLogBatch, ApiError>;

    /// `get_log` from the last entry timestamp this service has seen.
    async fn get_log_last(
        &mut self,
        project_id: &str,
        job_id: &str,
    ) -> Result<JobLogBatch, ApiError>;

    /// Request cancellation. Returns once the request is accepted; the job
    /// reaches a terminal status on its own time.
    async fn kill(&mut self, project_id: &str, job_id: &str) -> Result<(), ApiError>;
}
