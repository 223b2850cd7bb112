// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! snapsolve: answers the questions in your screenshots
//!
//! Watches the screenshot directory, sends each new screenshot to an AI
//! provider and keeps the answers in a markdown log with a live web viewer.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use snapsolve::answer_log::AnswerLog;
use snapsolve::config::AppConfig;
use snapsolve::provider::build_provider;
use snapsolve::queue::{ProcessingJob, ScreenshotEvent};
use snapsolve::status::{read_status, Phase};
use snapsolve::watcher::ScreenshotWatcher;
use snapsolve::web::{start_server, AppState};
use snapsolve::worker::Processor;
use snapsolve::{Result, SnapsolveError};

/// snapsolve CLI - screenshot question answerer
#[derive(Parser, Debug)]
#[command(name = "snapsolve")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Answers the questions in new screenshots with a multimodal AI model", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the screenshot directory and answer new screenshots
    Watch {
        /// Directory to watch (overrides config)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Also answer screenshots already in the directory
        #[arg(long)]
        process_existing: bool,

        /// Serve the viewer alongside the watcher
        #[arg(long)]
        web: bool,
    },

    /// Answer a single screenshot now
    Process {
        /// Screenshot to process
        path: PathBuf,
    },

    /// Serve the answer viewer only
    Serve {
        /// Host to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the current processing status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(Commands::Config {
        action: ConfigCommands::Generate { output },
    }) = &cli.command
    {
        AppConfig::default().save(output)?;
        println!("Generated config at {:?}", output);
        return Ok(());
    }

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Watch {
            dir,
            process_existing,
            web,
        }) => run_watch(config, dir, process_existing, web).await,
        Some(Commands::Process { path }) => run_process(config, path).await,
        Some(Commands::Serve { host, port }) => run_serve(config, host, port).await,
        Some(Commands::Status) => run_status(&config),
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        None => run_watch(config, None, false, false).await,
    }
}

/// Run the watch mode (main loop)
async fn run_watch(
    mut config: AppConfig,
    dir_override: Option<PathBuf>,
    process_existing: bool,
    web: bool,
) -> Result<()> {
    if let Some(dir) = dir_override {
        config.screenshots_dir = dir.to_string_lossy().into_owned();
    }
    config.validate()?;

    let provider = build_provider(&config)?;
    let processor = Arc::new(Processor::from_config(&config, provider));
    let screenshots_dir = config.screenshots_dir();

    if processor.answers().ensure_exists()? {
        info!("Created {:?}", processor.answers().path());
    }
    processor.status().publish(
        "",
        Phase::Idle,
        &format!("Watching {}", screenshots_dir.display()),
    );

    info!("Screenshot directory: {:?}", screenshots_dir);
    info!("Answers file: {:?}", processor.answers().path());
    info!("Processed files: {:?}", config.processed_dir());
    info!(
        "Provider: {} ({})",
        processor.provider().name(),
        processor.provider().model()
    );

    let watcher = ScreenshotWatcher::start(&screenshots_dir, processor)?;

    if process_existing {
        info!("Processing existing screenshots...");
        let submitted = watcher.submit_existing(&screenshots_dir).await?;
        info!("Queued {} existing screenshots", submitted);
    }

    if web {
        let state = AppState::from_config(&config)?;
        let host = config.web.host.clone();
        let port = config.web.port;
        tokio::spawn(async move {
            if let Err(e) = start_server(state, &host, port).await {
                error!("Viewer stopped: {}", e);
            }
        });
    }

    // Setup graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = terminate => info!("Received SIGTERM, shutting down..."),
        }

        let _ = shutdown_tx.send(true);
    });

    info!("Press Ctrl+C to stop.");
    let summary = watcher.run(shutdown_rx).await?;

    info!(
        "Shutdown complete. {} answered, {} failed.",
        summary.completed, summary.failed
    );
    Ok(())
}

/// Run one screenshot through the full pipeline
async fn run_process(config: AppConfig, path: PathBuf) -> Result<()> {
    config.validate()?;

    if !path.is_file() {
        return Err(SnapsolveError::Config(format!("{:?} is not a file", path)));
    }

    let provider = build_provider(&config)?;
    let processor = Processor::from_config(&config, provider);
    processor.answers().ensure_exists()?;

    let job = ProcessingJob::new(ScreenshotEvent::new(path));
    let archived = processor.process(&job).await?;

    println!("Answer added to {:?}", processor.answers().path());
    println!("Screenshot moved to {:?}", archived);
    Ok(())
}

/// Serve the viewer until interrupted
async fn run_serve(config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let answers = AnswerLog::new(config.answers_path());
    if answers.ensure_exists()? {
        info!("Created {:?}", answers.path());
    }

    let state = AppState::new(answers, config.status_path())?;
    let host = host.unwrap_or_else(|| config.web.host.clone());
    let port = port.unwrap_or(config.web.port);

    start_server(state, &host, port).await
}

/// Print the last published status record
fn run_status(config: &AppConfig) -> Result<()> {
    let path = config.status_path();

    match read_status(&path) {
        Some(record) => {
            println!("snapsolve status ({:?})", path);
            println!("  State:   {}", record.status);
            if !record.filename.is_empty() {
                println!("  File:    {}", record.filename);
            }
            println!("  Details: {}", record.details);
            println!("  Time:    {}", record.time);
        }
        None => {
            warn!("No status record at {:?}", path);
            println!("No status published yet");
        }
    }

    let answers = AnswerLog::new(config.answers_path());
    match answers.load() {
        Ok(document) => println!("\n{} answers in {:?}", document.len(), answers.path()),
        Err(e) => println!("\nAnswers file unreadable: {}", e),
    }

    Ok(())
}

/// Run configuration commands
fn run_config_command(
    config: AppConfig,
    action: ConfigCommands,
    config_path: &std::path::Path,
) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let mut shown = config;
            if !shown.api_key.is_empty() {
                shown.api_key = "********".to_string();
            }
            let json = serde_json::to_string_pretty(&shown)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Provider: {} ({})", config.provider, config.model);
            println!("  Screenshots: {:?}", config.screenshots_dir());
            println!("  Answers: {:?}", config.answers_path());
        }
    }

    Ok(())
}
