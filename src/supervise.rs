//! Job lifecycle supervision.
//!
//! Submitting is the caller's job; this module takes over from the returned
//! job handle and runs the poll loop until a terminal status or an operator
//! interrupt, then drains whatever log output is left.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::api::{JobDetails, JobService, JobState, LogEntry, StatusClass};
use crate::logs;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Asks the operator whether an interrupted job should be killed.
///
/// A seam rather than a direct stdin read so the cancellation path is
/// testable without a terminal.
#[async_trait]
pub trait KillPrompt: Send {
    async fn confirm(&mut self) -> bool;
}

/// Interactive y/N prompt on the controlling terminal. Anything that is not
/// "y" or "yes" (trimmed, case-insensitive), including a read failure,
/// declines the kill.
pub struct StdinPrompt;

#[async_trait]
impl KillPrompt for StdinPrompt {
    async fn confirm(&mut self) -> bool {
        print!("Do you want to kill the job (y/N): ");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        if reader.read_line(&mut answer).await.is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Supervises one submitted job until completion.
///
/// Owns the only mutable supervision state: the latest job snapshot lives in
/// the loop itself and the log watermark lives here. The cancellation token
/// merely signals; it never touches this state.
pub struct Supervisor {
    client: Box<dyn JobService>,
    project_id: String,
    interval: Duration,
    cancel: CancellationToken,
    prompt: Box<dyn KillPrompt>,
    watermark: u64,
}

impl Supervisor {
    pub fn new(client: Box<dyn JobService>, project_id: String, cancel: CancellationToken) -> Self {
        Self {
            client,
            project_id,
            interval: DEFAULT_POLL_INTERVAL,
            cancel,
            prompt: Box::new(StdinPrompt),
            watermark: 0,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_prompt(mut self, prompt: Box<dyn KillPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Highest log identifier delivered to the operator so far.
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// Poll `job` until it reaches a terminal status or the operator
    /// interrupts, then drain the remaining logs. Returns the last known
    /// snapshot, from which [`exit_code`] derives the process exit code.
    ///
    /// Status and log polls share one tick. A failed status fetch is
    /// transient: it is logged and the loop waits for the next tick.
    pub async fn run(&mut self, mut job: JobDetails) -> JobDetails {
        'polling: loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.handle_interrupt(&job.id).await;
                    break 'polling;
                }
                _ = tokio::time::sleep(self.interval) => {
                    let latest = match self.client.get_status(&self.project_id, &job.id).await {
                        Ok(latest) => latest,
                        Err(e) => {
                            tracing::warn!("Unable to retrieve status for job: {}", e);
                            continue;
                        }
                    };
                    job = latest;
                    match job.state().class() {
                        StatusClass::PreRun => {
                            tracing::info!("Job is {}", job.status);
                        }
                        StatusClass::Active => {
                            self.stream_logs(&job.id).await;
                        }
                        StatusClass::Terminal => break 'polling,
                        StatusClass::Unrecognized => {
                            tracing::warn!("Status {} not implemented yet", job.status);
                        }
                    }
                }
            }
        }

        self.drain_remaining(&job.id).await;
        job
    }

    /// Operator interrupt: ask for confirmation, kill on yes, and proceed to
    /// draining either way. Declining only skips the kill request; the
    /// interrupt still ends supervision.
    async fn handle_interrupt(&mut self, job_id: &str) {
        if self.prompt.confirm().await {
            match self.client.kill(&self.project_id, job_id).await {
                Ok(()) => tracing::info!("Job killed"),
                Err(e) => tracing::warn!("Job not killed: {}", e),
            }
        } else {
            tracing::info!("Job not killed");
        }
    }

    async fn stream_logs(&mut self, job_id: &str) {
        match self.client.get_log_last(&self.project_id, job_id).await {
            Ok(batch) => {
                self.print_new(&batch.logs);
            }
            Err(e) => tracing::warn!("Unable to fetch job log: {}", e),
        }
    }

    /// Print the not-yet-seen entries of a batch and advance the watermark.
    fn print_new(&mut self, entries: &[LogEntry]) -> usize {
        let (printed, watermark) = logs::drain(entries, self.watermark);
        for entry in &printed {
            println!("{}", entry.content);
        }
        self.watermark = watermark;
        printed.len()
    }

    /// After the poll loop: keep fetching until the remote reports a bulk
    /// log address, a batch brings nothing new, or a fetch fails. A failure
    /// here means "nothing more to show", not an error worth retrying.
    async fn drain_remaining(&mut self, job_id: &str) {
        loop {
            let batch = match self.client.get_log_last(&self.project_id, job_id).await {
                Ok(batch) => batch,
                Err(_) => return,
            };

            if !batch.logs_address.is_empty() {
                tracing::info!("You can download your logs at {}", batch.logs_address);
                return;
            }
            if self.print_new(&batch.logs) == 0 {
                return;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Map the final job snapshot to a process exit code.
///
/// COMPLETED propagates the job's own return code. TERMINATED and FAILED use
/// the configured fallback regardless of what the job reported. Anything
/// else that slips through (for instance CANCELLING after an interrupt) also
/// falls back rather than failing.
pub fn exit_code(job: &JobDetails, not_completed_exit_code: i32) -> i32 {
    tracing::info!("Job status is: {}", job.status);
    match job.state() {
        JobState::Completed => {
            tracing::info!("Job exit code: {}", job.return_code);
            job.return_code as i32
        }
        JobState::Terminated | JobState::Failed => {
            tracing::info!(
                "Job is finished, but not completely, fixed exit code: {}",
                not_completed_exit_code
            );
            not_completed_exit_code
        }
        other => {
            tracing::warn!("Status {} not implemented yet", other);
            not_completed_exit_code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: &str, return_code: i64) -> JobDetails {
        JobDetails {
            status: status.to_string(),
            return_code,
            ..JobDetails::default()
        }
    }

    #[test]
    fn completed_propagates_the_job_return_code() {
        assert_eq!(exit_code(&job("COMPLETED", 0), 3), 0);
        assert_eq!(exit_code(&job("COMPLETED", 7), 3), 7);
    }

    #[test]
    fn terminated_and_failed_use_the_fallback() {
        assert_eq!(exit_code(&job("TERMINATED", 7), 3), 3);
        assert_eq!(exit_code(&job("FAILED", 0), 3), 3);
        assert_eq!(exit_code(&job("FAILED", 0), 0), 0);
    }

    #[test]
    fn unrecognized_statuses_still_return_the_fallback() {
        assert_eq!(exit_code(&job("REBALANCING", 9), 3), 3);
        assert_eq!(exit_code(&job("CANCELLING", 9), 3), 3);
    }
}
