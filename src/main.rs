use std::path::Path;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ovh_spark_submit::api::{DataProcessingClient, JobService};
use ovh_spark_submit::cli::{self, Args};
use ovh_spark_submit::config;
use ovh_spark_submit::error::{ApiError, SubmitError};
use ovh_spark_submit::shutdown::install_shutdown_handler;
use ovh_spark_submit::supervise::{self, Supervisor};
use ovh_spark_submit::upload;

// =============================================================================
// Fatal-path helpers
// =============================================================================

fn fatal(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}

/// Submission failures are the one fatal remote error. An unprocessable
/// request gets an actionable hint about the service's capability limits;
/// anything else gets the generic message.
fn report_submit_failure(err: &ApiError) -> ! {
    if let ApiError::Api {
        class, query_id, ..
    } = err
    {
        if err.is_unprocessable() {
            eprintln!(
                "Error: Unable to submit job: {err} :: {class} :: {query_id}. \
                 Please check that your requested job complies with the OVHcloud Data \
                 Processing capabilities \
                 (https://docs.ovh.com/gb/en/data-processing/capabilities/)"
            );
        } else {
            eprintln!("Error: Unable to submit job: {err} :: {class} :: {query_id}");
        }
    } else {
        eprintln!("Error: Unable to submit job: {err}");
    }
    process::exit(1);
}

// =============================================================================
// Upload staging
// =============================================================================

async fn stage_uploads(
    args: &Args,
    settings: &config::Settings,
    config_path: &str,
) -> Result<(), SubmitError> {
    let Some(uploads) = args.upload.as_deref().filter(|u| !u.is_empty()) else {
        return Ok(());
    };

    let file = args.file.as_deref().unwrap_or_default();
    let (protocol, container, _) = cli::split_remote_path(file)?;
    if !settings.protocols.iter().any(|p| *p == protocol) {
        return Err(SubmitError::Config(format!(
            "protocol {protocol} isn't configured in {config_path} or isn't supported"
        )));
    }

    let mut storage = upload::for_protocol(&protocol, settings.swift.as_ref())?;
    for source in uploads.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        storage.upload(Path::new(source), &container).await?;
    }
    Ok(())
}

// =============================================================================
// Entry point
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = Args::parse();

    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let settings = match config::load(&config_path) {
        Ok(settings) => settings,
        Err(e) => fatal(&format!("Unable to load conf: {e}")),
    };

    // Merge file-based defaults below the command line: job-conf overlay
    // first, then the [spark] ini section.
    if let Some(job_conf_path) = args.job_config.clone() {
        match config::load_job_conf(&job_conf_path) {
            Ok(overlay) => args.overlay(&overlay),
            Err(e) => fatal(&format!("Unable to load job conf: {e}")),
        }
    }
    args.overlay(&settings.spark);

    let submission = match cli::build_submission(&args) {
        Ok(submission) => submission,
        Err(e) => fatal(&e.to_string()),
    };

    if let Err(e) = stage_uploads(&args, &settings, &config_path).await {
        fatal(&format!("Error while uploading file(s): {e}"));
    }

    let project_id = args.project_id.clone().unwrap_or_default();
    let mut client: Box<dyn JobService> = Box::new(DataProcessingClient::new(&settings.ovh));

    let job = match client.submit(&project_id, &submission).await {
        Ok(job) => job,
        Err(e) => report_submit_failure(&e),
    };
    tracing::info!("Job '{}' submitted with id {}", job.name, job.id);

    let cancel = install_shutdown_handler();
    let mut supervisor = Supervisor::new(client, project_id, cancel);
    let job = supervisor.run(job).await;

    process::exit(supervise::exit_code(&job, args.not_completed_exit_code));
}
