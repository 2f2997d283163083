use clap::Parser;
use rand::Rng;

use crate::api::types::{self, EngineParameter, JobSubmission};
use crate::config::FileArgs;
use crate::error::SubmitError;
use crate::units;

/// Command-line arguments. Most fields are optional here because they may
/// also come from the `[spark]` ini section or a `--job-conf` overlay;
/// required-ness is enforced by [`build_submission`] after merging.
#[derive(Parser, Debug, Default)]
#[command(
    name = "ovh-spark-submit",
    version,
    about = "Submit Apache Spark jobs to OVHcloud Data Processing"
)]
pub struct Args {
    /// Job name (random when omitted)
    #[arg(long = "jobname", env = "JOB_NAME")]
    pub job_name: Option<String>,

    /// Openstack region of the job
    #[arg(long, env = "OS_REGION")]
    pub region: Option<String>,

    /// Openstack project id
    #[arg(long = "projectid", env = "OS_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Version of Spark
    #[arg(long = "spark-version", env = "SPARK_VERSION")]
    pub spark_version: Option<String>,

    /// Comma-delimited list of file/dir paths to upload before running the job
    #[arg(long, env = "UPLOAD")]
    pub upload: Option<String>,

    /// Main class (required for jar files)
    #[arg(long)]
    pub class: Option<String>,

    #[arg(long = "driver-cores")]
    pub driver_cores: Option<String>,

    /// Driver memory in (gibi/mebi)bytes (eg. "10G")
    #[arg(long = "driver-memory")]
    pub driver_memory: Option<String>,

    /// Driver memory overhead in (gibi/mebi)bytes (derived when omitted)
    #[arg(long = "driver-memory-overhead", alias = "driver-memoryOverhead")]
    pub driver_memory_overhead: Option<String>,

    #[arg(long = "executor-cores")]
    pub executor_cores: Option<String>,

    #[arg(long = "num-executors")]
    pub executor_num: Option<String>,

    /// Executor memory in (gibi/mebi)bytes (eg. "10G")
    #[arg(long = "executor-memory")]
    pub executor_memory: Option<String>,

    /// Executor memory overhead in (gibi/mebi)bytes (derived when omitted)
    #[arg(long = "executor-memory-overhead", alias = "executor-memoryOverhead")]
    pub executor_memory_overhead: Option<String>,

    /// Comma-delimited list of Maven coordinates
    #[arg(long)]
    pub packages: Option<String>,

    /// Comma-delimited list of additional repositories (or resolvers in SBT)
    #[arg(long)]
    pub repositories: Option<String>,

    /// Read properties from the given file
    #[arg(long = "properties-file")]
    pub properties_file: Option<String>,

    /// Maximum time to live of the job, as an ISO-8601 duration (eg. "PT30H"),
    /// after which it is automatically terminated
    #[arg(long)]
    pub ttl: Option<String>,

    /// Path to the configuration file
    #[arg(long = "conf")]
    pub config_path: Option<String>,

    /// Path to a JSON or HJSON job configuration overlay
    #[arg(long = "job-conf")]
    pub job_config: Option<String>,

    /// Exit code used when the job ends TERMINATED or FAILED
    #[arg(long = "not-completed-exit-code", default_value_t = 0)]
    pub not_completed_exit_code: i32,

    /// Application file (eg. "swift://container/path/to/app.jar")
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    /// Arguments passed to the job
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub parameters: Vec<String>,
}

impl Args {
    /// Fill unset fields from file-based defaults. Called once per source,
    /// highest precedence first, so the command line always wins.
    pub fn overlay(&mut self, defaults: &FileArgs) {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.is_none() {
                *slot = value.clone();
            }
        }

        fill(&mut self.job_name, &defaults.job_name);
        fill(&mut self.region, &defaults.region);
        fill(&mut self.project_id, &defaults.project_id);
        fill(&mut self.spark_version, &defaults.spark_version);
        fill(&mut self.upload, &defaults.upload);
        fill(&mut self.class, &defaults.class);
        fill(&mut self.driver_cores, &defaults.driver_cores);
        fill(&mut self.driver_memory, &defaults.driver_memory);
        fill(
            &mut self.driver_memory_overhead,
            &defaults.driver_memory_overhead,
        );
        fill(&mut self.executor_cores, &defaults.executor_cores);
        fill(&mut self.executor_num, &defaults.executor_num);
        fill(&mut self.executor_memory, &defaults.executor_memory);
        fill(
            &mut self.executor_memory_overhead,
            &defaults.executor_memory_overhead,
        );
        fill(&mut self.packages, &defaults.packages);
        fill(&mut self.repositories, &defaults.repositories);
        fill(&mut self.properties_file, &defaults.properties_file);
        fill(&mut self.ttl, &defaults.ttl);
        fill(&mut self.file, &defaults.file);

        if self.parameters.is_empty() {
            if let Some(parameters) = &defaults.parameters {
                self.parameters = parameters
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
            }
        }
    }
}

/// Split "protocol://container/path/to/file" into its three pieces.
pub fn split_remote_path(file: &str) -> Result<(String, String, String), SubmitError> {
    let invalid = || {
        SubmitError::Config(format!(
            "invalid application path {file}, expected protocol://container/path"
        ))
    };
    let (protocol, rest) = file.split_once("://").ok_or_else(invalid)?;
    let (container, object) = rest.split_once('/').ok_or_else(invalid)?;
    if protocol.is_empty() || container.is_empty() || object.is_empty() {
        return Err(invalid());
    }
    Ok((
        protocol.to_ascii_lowercase(),
        container.to_string(),
        object.to_string(),
    ))
}

fn random_job_name() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect();
    format!("job-{}", suffix.to_lowercase())
}

fn required(value: &Option<String>, flag: &str) -> Result<String, SubmitError> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SubmitError::Config(format!("{flag} is required")))
}

/// Validate the merged arguments and derive the submission body: engine
/// parameters, canonical memory sizes in MiB, derived overheads, the job
/// type from the application file extension, and the container/application
/// split of the remote path.
pub fn build_submission(args: &Args) -> Result<JobSubmission, SubmitError> {
    required(&args.project_id, "--projectid")?;
    let driver_cores = required(&args.driver_cores, "--driver-cores")?;
    let driver_memory = required(&args.driver_memory, "--driver-memory")?;
    let executor_cores = required(&args.executor_cores, "--executor-cores")?;
    let executor_memory = required(&args.executor_memory, "--executor-memory")?;
    let executor_num = required(&args.executor_num, "--num-executors")?;
    let file = required(&args.file, "file")?;

    let (_, container_name, application_code) = split_remote_path(&file)?;

    let mut parameters = Vec::new();

    let is_jar = application_code
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("jar"));
    if is_jar {
        let class = args.class.clone().filter(|c| !c.is_empty()).ok_or_else(|| {
            SubmitError::Config("you must provide --class when using a jar file".to_string())
        })?;
        parameters.push(EngineParameter::new(
            types::params::JOB_TYPE,
            types::JOB_TYPE_JAVA,
        ));
        parameters.push(EngineParameter::new(types::params::MAIN_CLASS_NAME, class));
    } else {
        parameters.push(EngineParameter::new(
            types::params::JOB_TYPE,
            types::JOB_TYPE_PYTHON,
        ));
    }

    parameters.push(EngineParameter::new(
        types::params::MAIN_APPLICATION_CODE,
        application_code,
    ));

    let driver_memory_mib = units::parse_size(&driver_memory)
        .map_err(|_| SubmitError::Config("invalid value for --driver-memory".to_string()))?;
    parameters.push(EngineParameter::new(
        types::params::DRIVER_MEMORY,
        driver_memory_mib.to_string(),
    ));

    let driver_overhead = match &args.driver_memory_overhead {
        Some(overhead) => units::parse_size(overhead).map_err(|_| {
            SubmitError::Config("invalid value for --driver-memory-overhead".to_string())
        })?,
        None => units::deduct_memory_overhead(&driver_memory),
    };
    parameters.push(EngineParameter::new(
        types::params::DRIVER_MEMORY_OVERHEAD,
        driver_overhead.to_string(),
    ));

    let executor_memory_mib = units::parse_size(&executor_memory)
        .map_err(|_| SubmitError::Config("invalid value for --executor-memory".to_string()))?;
    parameters.push(EngineParameter::new(
        types::params::EXECUTOR_MEMORY,
        executor_memory_mib.to_string(),
    ));

    let executor_overhead = match &args.executor_memory_overhead {
        Some(overhead) => units::parse_size(overhead).map_err(|_| {
            SubmitError::Config("invalid value for --executor-memory-overhead".to_string())
        })?,
        None => units::deduct_memory_overhead(&executor_memory),
    };
    parameters.push(EngineParameter::new(
        types::params::EXECUTOR_MEMORY_OVERHEAD,
        executor_overhead.to_string(),
    ));

    if let Some(packages) = args.packages.clone().filter(|p| !p.is_empty()) {
        parameters.push(EngineParameter::new(types::params::PACKAGES, packages));
    }
    if let Some(repositories) = args.repositories.clone().filter(|r| !r.is_empty()) {
        parameters.push(EngineParameter::new(
            types::params::REPOSITORIES,
            repositories,
        ));
    }

    if let Some(ttl) = &args.ttl {
        if iso8601_duration::Duration::parse(ttl).is_err() {
            return Err(SubmitError::Config(
                "invalid value for --ttl, it must be an ISO-8601 duration (eg. PT30H for 30 hours)"
                    .to_string(),
            ));
        }
    }

    parameters.push(EngineParameter::new(
        types::params::EXECUTOR_NUMBER,
        executor_num,
    ));
    parameters.push(EngineParameter::new(
        types::params::EXECUTOR_CORES,
        executor_cores,
    ));
    parameters.push(EngineParameter::new(
        types::params::DRIVER_CORES,
        driver_cores,
    ));
    parameters.push(EngineParameter::new(
        types::params::ARGUMENTS,
        args.parameters.join(", "),
    ));

    if let Some(properties_file) = args.properties_file.clone().filter(|p| !p.is_empty()) {
        parameters.push(EngineParameter::new(
            types::params::PROPERTIES_FILE,
            properties_file,
        ));
    }

    Ok(JobSubmission {
        container_name,
        engine: types::ENGINE_SPARK.to_string(),
        name: args
            .job_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(random_job_name),
        region: args.region.clone().unwrap_or_else(|| "GRA".to_string()),
        engine_version: args
            .spark_version
            .clone()
            .unwrap_or_else(|| "2.4.3".to_string()),
        engine_parameters: parameters,
        ttl: args.ttl.clone().filter(|t| !t.is_empty()),
    })
}
