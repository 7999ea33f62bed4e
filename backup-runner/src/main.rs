//! Backup Runner - Main entry point
//!
//! Runs one backup job and exits. Scheduling is left to cron or a systemd timer.

use anyhow::Result;
use backup_runner::archiver::ProcessArchiver;
use backup_runner::store::LocalStore;
use backup_runner::{utils, BackupOrchestrator, Config};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const EXIT_CONFIG_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", env = "BACKUP_CONFIG")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the run result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", args.config.display(), e);
            return Ok(ExitCode::from(EXIT_CONFIG_ERROR));
        }
    };

    if args.check {
        println!("{}: ok", args.config.display());
        return Ok(ExitCode::SUCCESS);
    }

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting backup-runner v{} (job: {})",
        env!("CARGO_PKG_VERSION"),
        config.job.name
    );

    let orchestrator = BackupOrchestrator::new(
        Arc::new(LocalStore),
        Arc::new(ProcessArchiver::new(config.archiver.clone())),
        config.notify.backend.build(),
    );

    let result = orchestrator.run(&config.backup_job()).await;

    if let Some(e) = &result.log_error {
        eprintln!(
            "warning: could not write {}: {}",
            config.backup_job().log_path().display(),
            e
        );
    }

    if !result.outcome.is_success() {
        tracing::error!(outcome = ?result.outcome, duration = %result.duration_hms(), "Backup run failed");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(ExitCode::from(result.outcome.exit_code()))
}
