use serde::{Deserialize, Serialize};

pub const ENGINE_SPARK: &str = "spark";

pub const JOB_TYPE_JAVA: &str = "java";
pub const JOB_TYPE_PYTHON: &str = "python";

/// Engine parameter names understood by the Data Processing API.
pub mod params {
    pub const JOB_TYPE: &str = "job_type";
    pub const MAIN_CLASS_NAME: &str = "main_class_name";
    pub const MAIN_APPLICATION_CODE: &str = "main_application_code";

    pub const DRIVER_CORES: &str = "driver_cores";
    pub const DRIVER_MEMORY: &str = "driver_memory";
    pub const DRIVER_MEMORY_OVERHEAD: &str = "driver_memory_overhead";

    pub const EXECUTOR_CORES: &str = "executor_cores";
    pub const EXECUTOR_MEMORY: &str = "executor_memory";
    pub const EXECUTOR_MEMORY_OVERHEAD: &str = "executor_memory_overhead";
    pub const EXECUTOR_NUMBER: &str = "executor_num";

    pub const ARGUMENTS: &str = "arguments";
    pub const PACKAGES: &str = "packages";
    pub const REPOSITORIES: &str = "repositories";
    pub const PROPERTIES_FILE: &str = "properties_file";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParameter {
    pub name: String,
    pub value: String,
}

impl EngineParameter {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Request body for job submission. Built once from validated CLI input and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    pub container_name: String,
    pub engine: String,
    pub name: String,
    pub region: String,
    pub engine_version: String,
    pub engine_parameters: Vec<EngineParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

/// Remote-owned job snapshot. Replaced wholesale on every status poll, never
/// reconciled field by field. Every field defaults so a garbled or partial
/// response degrades to empty values instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobDetails {
    pub id: String,
    pub name: String,
    pub region: String,
    pub engine: String,
    pub container_name: String,
    pub creation_date: String,
    pub start_date: String,
    pub end_date: String,
    pub engine_version: String,
    pub engine_parameters: Vec<EngineParameter>,
    pub status: String,
    pub return_code: i64,
}

impl JobDetails {
    pub fn state(&self) -> JobState {
        JobState::parse(&self.status)
    }
}

/// One log line streamed back by the API. Identifiers increase monotonically
/// but batches may overlap entries already seen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    pub content: String,
    pub id: u64,
    pub timestamp: String,
}

/// Response of a log query. A non-empty `logs_address` means the remote has
/// moved logs to bulk storage and nothing more will be streamed inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobLogBatch {
    pub logs: Vec<LogEntry>,
    pub logs_address: String,
    pub start_date: String,
}

/// Remote job status. `Other` captures any string this client does not know
/// about so a newer API never crashes an older client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Unknown,
    Pending,
    Submitted,
    Running,
    Cancelling,
    Failed,
    Terminated,
    Completed,
    Other(String),
}

/// Partition of [`JobState`] driving the supervision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Not started yet; keep polling.
    PreRun,
    /// Running; poll status and stream logs.
    Active,
    /// No further transitions; stop polling and drain.
    Terminal,
    /// Unknown to this client; report and keep polling.
    Unrecognized,
}

impl JobState {
    pub fn parse(status: &str) -> JobState {
        match status {
            "UNKNOWN" => JobState::Unknown,
            "PENDING" => JobState::Pending,
            "SUBMITTED" => JobState::Submitted,
            "RUNNING" => JobState::Running,
            "CANCELLING" => JobState::Cancelling,
            "FAILED" => JobState::Failed,
            "TERMINATED" => JobState::Terminated,
            "COMPLETED" => JobState::Completed,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            JobState::Unknown | JobState::Pending | JobState::Submitted => StatusClass::PreRun,
            JobState::Running => StatusClass::Active,
            JobState::Cancelling
            | JobState::Failed
            | JobState::Terminated
            | JobState::Completed => StatusClass::Terminal,
            JobState::Other(_) => StatusClass::Unrecognized,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Unknown => write!(f, "UNKNOWN"),
            JobState::Pending => write!(f, "PENDING"),
            JobState::Submitted => write!(f, "SUBMITTED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Cancelling => write!(f, "CANCELLING"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Terminated => write!(f, "TERMINATED"),
            JobState::Completed => write!(f, "COMPLETED"),
            JobState::Other(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_status_maps_to_exactly_one_class() {
        assert_eq!(JobState::parse("UNKNOWN").class(), StatusClass::PreRun);
        assert_eq!(JobState::parse("PENDING").class(), StatusClass::PreRun);
        assert_eq!(JobState::parse("SUBMITTED").class(), StatusClass::PreRun);
        assert_eq!(JobState::parse("RUNNING").class(), StatusClass::Active);
        assert_eq!(JobState::parse("CANCELLING").class(), StatusClass::Terminal);
        assert_eq!(JobState::parse("FAILED").class(), StatusClass::Terminal);
        assert_eq!(JobState::parse("TERMINATED").class(), StatusClass::Terminal);
        assert_eq!(JobState::parse("COMPLETED").class(), StatusClass::Terminal);
    }

    #[test]
    fn unknown_strings_classify_without_failing() {
        let state = JobState::parse("REBALANCING");
        assert_eq!(state, JobState::Other("REBALANCING".to_string()));
        assert_eq!(state.class(), StatusClass::Unrecognized);
        assert_eq!(state.to_string(), "REBALANCING");
    }

    #[test]
    fn partial_response_deserializes_with_defaults() {
        let details: JobDetails = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(details.id, "abc");
        assert_eq!(details.status, "");
        assert_eq!(details.return_code, 0);
        assert!(details.engine_parameters.is_empty());
    }
}
