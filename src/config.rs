use std::path::Path;

use ini::{Ini, Properties};
use serde::Deserialize;

use crate::error::SubmitError;

pub const DEFAULT_CONFIG_PATH: &str = "configuration.ini";

const OVH_SECTION: &str = "ovh";
const SWIFT_SECTION: &str = "swift";
const SPARK_SECTION: &str = "spark";

/// Object-storage protocols this build knows how to stage uploads through.
pub const SUPPORTED_PROTOCOLS: &[&str] = &["swift"];

/// `[ovh]` section: API endpoint (alias or full URL) and signing credentials.
#[derive(Debug, Clone, Default)]
pub struct OvhConf {
    pub endpoint: String,
    pub application_key: String,
    pub application_secret: String,
    pub consumer_key: String,
}

/// `[swift]` section: Keystone credentials for upload staging.
#[derive(Debug, Clone, Default)]
pub struct SwiftConf {
    pub user_name: String,
    pub password: String,
    pub auth_url: String,
    pub domain: String,
    pub region: String,
}

/// Job arguments coming from a file instead of the command line: either the
/// `[spark]` ini section or a `--job-conf` JSON/HJSON overlay. Field names
/// follow the file key spelling, which predates this tool.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileArgs {
    #[serde(rename = "jobname")]
    pub job_name: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "projectid")]
    pub project_id: Option<String>,
    #[serde(rename = "spark-version")]
    pub spark_version: Option<String>,
    pub upload: Option<String>,
    pub class: Option<String>,
    #[serde(rename = "driver-cores")]
    pub driver_cores: Option<String>,
    #[serde(rename = "driver-memory")]
    pub driver_memory: Option<String>,
    #[serde(rename = "driver-memoryOverhead")]
    pub driver_memory_overhead: Option<String>,
    #[serde(rename = "executor-cores")]
    pub executor_cores: Option<String>,
    #[serde(rename = "num-executors")]
    pub executor_num: Option<String>,
    #[serde(rename = "executor-memory")]
    pub executor_memory: Option<String>,
    #[serde(rename = "executor-memoryOverhead")]
    pub executor_memory_overhead: Option<String>,
    pub packages: Option<String>,
    pub repositories: Option<String>,
    #[serde(rename = "properties-file")]
    pub properties_file: Option<String>,
    pub ttl: Option<String>,
    /// Comma-delimited job arguments.
    pub parameters: Option<String>,
    pub file: Option<String>,
}

/// Everything read from configuration.ini.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub ovh: OvhConf,
    pub swift: Option<SwiftConf>,
    /// Defaults from the `[spark]` section, applied below CLI flags and the
    /// job-conf overlay.
    pub spark: FileArgs,
    /// Upload protocols with a configured section.
    pub protocols: Vec<String>,
}

fn get(section: &Properties, key: &str) -> String {
    section.get(key).unwrap_or_default().to_string()
}

fn get_opt(section: &Properties, key: &str) -> Option<String> {
    section
        .get(key)
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty())
}

/// Load configuration.ini. A missing `[ovh]` section is fatal; `[swift]` and
/// `[spark]` are optional.
pub fn load(path: &str) -> Result<Settings, SubmitError> {
    let ini = Ini::load_from_file(path)
        .map_err(|e| SubmitError::Config(format!("unable to load {path}: {e}")))?;

    let ovh_section = ini
        .section(Some(OVH_SECTION))
        .ok_or_else(|| SubmitError::Config(format!("missing [ovh] configurations in {path}")))?;
    let ovh = OvhConf {
        endpoint: get(ovh_section, "endpoint"),
        application_key: get(ovh_section, "application_key"),
        application_secret: get(ovh_section, "application_secret"),
        consumer_key: get(ovh_section, "consumer_key"),
    };

    let swift = ini.section(Some(SWIFT_SECTION)).map(|section| SwiftConf {
        user_name: get(section, "user_name"),
        password: get(section, "password"),
        auth_url: get(section, "auth_url"),
        domain: get(section, "domain"),
        region: get(section, "region"),
    });

    let spark = ini
        .section(Some(SPARK_SECTION))
        .map(spark_section_args)
        .unwrap_or_default();

    let protocols = ini
        .sections()
        .flatten()
        .filter(|name| SUPPORTED_PROTOCOLS.contains(name))
        .map(|name| name.to_string())
        .collect();

    Ok(Settings {
        ovh,
        swift,
        spark,
        protocols,
    })
}

fn spark_section_args(section: &Properties) -> FileArgs {
    FileArgs {
        job_name: get_opt(section, "jobname"),
        region: get_opt(section, "region"),
        project_id: get_opt(section, "projectid"),
        spark_version: get_opt(section, "spark-version"),
        upload: get_opt(section, "upload"),
        class: get_opt(section, "class"),
        driver_cores: get_opt(section, "driver-cores"),
        driver_memory: get_opt(section, "driver-memory"),
        driver_memory_overhead: get_opt(section, "driver-memoryOverhead"),
        executor_cores: get_opt(section, "executor-cores"),
        executor_num: get_opt(section, "num-executors"),
        executor_memory: get_opt(section, "executor-memory"),
        executor_memory_overhead: get_opt(section, "executor-memoryOverhead"),
        packages: get_opt(section, "packages"),
        repositories: get_opt(section, "repositories"),
        properties_file: get_opt(section, "properties-file"),
        ttl: get_opt(section, "ttl"),
        parameters: get_opt(section, "parameters"),
        file: get_opt(section, "file"),
    }
}

/// Load a `--job-conf` overlay. The format follows the extension: `.json`
/// or `.hjson`, anything else is rejected.
pub fn load_job_conf(path: &str) -> Result<FileArgs, SubmitError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SubmitError::Config(format!("unable to load job conf {path}: {e}")))?;

    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .map_err(|e| SubmitError::Config(format!("unable to load job conf {path}: {e}"))),
        Some("hjson") => deser_hjson::from_str(&content)
            .map_err(|e| SubmitError::Config(format!("unable to load job conf {path}: {e}"))),
        _ => Err(SubmitError::Config(format!(
            "job configuration must be a json or hjson file and is currently: {path}"
        ))),
    }
}
