//! # Throttle-Relay Server
//!
//! Main entry point for the throttle-relay server.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use throttle_relay_core::{wait_for_interrupt, Acceptor, LoggingConfig};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let (config, config_path) = cli.load_config()?;

    // Initialize logging
    let _log_guard = init_logging(&config.logging)?;

    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No config file found, using flags only"),
    }

    config.relay.validate()?;

    info!("Starting throttle-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Chunk size: {} bytes", config.relay.chunk_size);
    info!("  Delay:      {}ms", config.relay.delay_ms);
    info!("  Listen:     {}", config.relay.listen);
    info!("  Upstream:   {}", config.relay.upstream);
    info!("  Throttle:   {}", config.relay.direction);

    let drain_timeout = config.relay.drain_timeout();
    let acceptor = Acceptor::bind(config.relay).await?;

    tokio::spawn(wait_for_interrupt(acceptor.shutdown_handle()));

    let sessions = acceptor.serve().await;

    if !drain_timeout.is_zero() && sessions.active() > 0 {
        info!(
            "Waiting up to {}s for {} sessions",
            drain_timeout.as_secs(),
            sessions.active()
        );
        if !sessions.drain(drain_timeout).await {
            warn!("{} sessions still running, exiting anyway", sessions.active());
        }
    }

    info!("Bye");
    Ok(())
}

/// Initialize logging with the configured level, to stdout or a file.
///
/// The returned guard must live until exit so buffered file output is flushed.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let Some(file) = &config.file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .init();
        return Ok(None);
    };

    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", file))?;

    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();

    Ok(Some(guard))
}
