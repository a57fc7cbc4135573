//! mkvbatch - Batch Audio Merge Workflow
//!
//! Entry point: parses the command line, sets up logging, loads the
//! configuration and dispatches to the merge workflow.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};

use mkvbatch::cli::{Args, Commands};
use mkvbatch::config::Config;
use mkvbatch::error::MuxError;
use mkvbatch::workflow::{PlanEntry, Workflow};

const DEFAULT_CONFIG_FILE: &str = "mkvbatch.toml";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file; the guard flushes the file log
    let _guard = match setup_logging(args.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The workflow already logged an unusable merge tool
            if !matches!(e.downcast_ref::<MuxError>(), Some(MuxError::ToolUnavailable(_))) {
                error!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting mkvbatch - Batch Audio Merge Workflow");

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load mkvbatch.toml from current directory first
            if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Merge { dirs, jobs, tool } => {
            dirs.apply(&mut config);
            if let Some(jobs) = jobs {
                config.mux.max_concurrency = jobs;
            }
            if let Some(tool) = tool {
                config.mux.binary_path = tool;
            }

            info!(
                "Merging {} + {} -> {} ({} at a time)",
                config.paths.video_dir.display(),
                config.paths.audio_dir.display(),
                config.paths.output_dir.display(),
                config.mux.max_concurrency
            );

            let workflow = Workflow::new(config)?;
            let summary = workflow.run().await?;

            println!(
                "\nMerged {} of {} videos ({} failed, {} skipped)",
                summary.succeeded(),
                summary.total(),
                summary.failed(),
                summary.skipped()
            );
        }
        Commands::Plan { dirs } => {
            dirs.apply(&mut config);

            let workflow = Workflow::new(config)?;
            let plan = workflow.plan()?;

            if plan.is_empty() {
                println!("No video files found.");
            }
            for entry in plan {
                match entry {
                    PlanEntry::Ready(task) => {
                        println!("{}", task.video.name);
                        println!("  {}", task.command.display_line());
                    }
                    PlanEntry::Skipped { label, reason, .. } => {
                        println!("{}", label);
                        println!("  skip: {}", reason);
                    }
                }
            }
        }
        Commands::Check { tool } => {
            if let Some(tool) = tool {
                config.mux.binary_path = tool;
            }

            let binary = config.mux.binary_path.clone();
            let workflow = Workflow::new(config)?;
            workflow.ensure_tool().await?;
            println!("{} is available", binary);
        }
        Commands::InitConfig { output } => {
            if output.exists() {
                return Err(MuxError::Config(format!(
                    "{} already exists, refusing to overwrite",
                    output.display()
                ))
                .into());
            }
            config.save_to_file(&output)?;
            println!("Wrote configuration to {}", output.display());
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".mkvbatch").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "mkvbatch.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(verbose)
        .with_file(verbose)
        .with_line_number(verbose);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("mkvbatch.log").display());

    Ok(guard)
}
