// finwatch - terminal client for a ledger service
//
// Uploads bank statements, follows the background import jobs the service
// spawns for them, and browses the imported transactions with server-side
// filtering, sorting, and pagination.
//
// Architecture:
// - Transport (reqwest): typed HTTP client behind the Transport trait
// - Poll supervisor: one timer task per active import job
// - Controller: query/selection state machine with last-request-wins reloads
// - TUI (ratatui): transactions and jobs views
// - Event system: one mpsc channel connects background tasks to the UI loop

mod api;
mod cli;
mod config;
mod controller;
mod events;
mod logging;
mod poll;
mod query;
mod selection;
mod tui;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{HttpApi, Transport};
use cli::CliAction;
use config::{Config, LogRotation};
use events::{AppEvent, JobOutcome};
use logging::{CaptureLayer, LogBuffer};
use poll::JobPollSupervisor;

#[tokio::main]
async fn main() -> Result<()> {
    // Config subcommands are handled before anything else starts
    let action = cli::handle_cli();
    if matches!(action, CliAction::Done) {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = Config::from_env();

    // Upload runs headless even when the TUI is enabled
    let tui_mode = config.enable_tui && matches!(action, CliAction::RunTui);

    let log_buffer = LogBuffer::new();
    let _file_guard = init_tracing(&config, tui_mode, log_buffer.clone());

    let api: Arc<dyn Transport> = Arc::new(HttpApi::new(
        config.api_url.clone(),
        config.token.clone(),
    ));

    match action {
        CliAction::Upload(file) => run_upload(api, &file).await,
        CliAction::RunTui if tui_mode => {
            let (events_tx, events_rx) = mpsc::channel(1000);
            tui::run_tui(api, events_tx, events_rx, log_buffer, &config).await
        }
        _ => {
            // FINWATCH_NO_TUI with no subcommand: nothing to do
            bail!("TUI disabled and no subcommand given; try `finwatch upload <file>`")
        }
    }
}

/// Initialize tracing
///
/// TUI mode captures logs into the in-memory buffer so they never garble the
/// display; headless mode logs to stdout. File logging is additive and uses
/// a non-blocking rotating appender; the returned guard must stay alive so
/// buffered lines flush on exit.
///
/// Precedence: RUST_LOG env var > config file > default "info".
fn init_tracing(
    config: &Config,
    tui_mode: bool,
    log_buffer: LogBuffer,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = format!("finwatch={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let file_writer = if config.logging.file_enabled {
        match std::fs::create_dir_all(&config.logging.file_dir) {
            Ok(()) => {
                let appender = match config.logging.file_rotation {
                    LogRotation::Hourly => tracing_appender::rolling::hourly(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                    LogRotation::Daily => tracing_appender::rolling::daily(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                    LogRotation::Never => tracing_appender::rolling::never(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                };
                Some(tracing_appender::non_blocking(appender))
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    config.logging.file_dir, e
                );
                None
            }
        }
    } else {
        None
    };

    // The layer combinations differ in type, so each arm calls init() itself
    match (tui_mode, file_writer) {
        (true, Some((writer, guard))) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(CaptureLayer::new(log_buffer))
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        (true, None) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(CaptureLayer::new(log_buffer))
                .init();
            None
        }
        (false, Some((writer, guard))) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        (false, None) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

/// Headless upload: send the statement, watch the job, report the outcome.
///
/// The extension check happens client-side before any request goes out, so a
/// wrong file type costs nothing.
async fn run_upload(api: Arc<dyn Transport>, file: &Path) -> Result<()> {
    let is_pdf = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        bail!("Only PDF statements are supported: {}", file.display());
    }

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid file name")?
        .to_string();
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Cannot read {}", file.display()))?;

    let accepted = api
        .upload_statement(&file_name, bytes)
        .await
        .context("Upload failed")?;
    println!(
        "Uploaded {} (job {}, status {})",
        accepted.filename, accepted.job_id, accepted.status
    );

    // Watch the one job until it reaches a terminal status
    let (events_tx, mut events_rx) = mpsc::channel(16);
    let mut supervisor = JobPollSupervisor::new(api, events_tx);
    supervisor.watch(accepted.job_id);

    while let Some(event) = events_rx.recv().await {
        if let AppEvent::JobFinished { outcome, .. } = event {
            supervisor.shutdown();
            match outcome {
                JobOutcome::Completed { transaction_count } => {
                    println!("Import complete - {transaction_count} transactions added");
                    return Ok(());
                }
                JobOutcome::Failed { message } => {
                    bail!("Import failed: {message}");
                }
            }
        }
    }
    bail!("Polling stopped before the job finished")
}
