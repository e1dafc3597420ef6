//! Showcase CLI - terminal front end for the showcase content portal.
//!
//! Logs in against the portal API, keeps the session in the configured
//! store, and exposes the catalogue operations as subcommands.

mod app;
mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use commands::Commands;
use showcase_core::Config;

// ============================================================================
// Constants
// ============================================================================

/// File name prefix for the rolling log in `log_dir`
const LOG_FILE_NAME: &str = "showcase.log";

#[derive(Parser)]
#[command(name = "showcase")]
#[command(about = "Browse and manage showcase introduce cards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let loaded = Config::load();
    let log_dir = loaded.as_ref().ok().and_then(|c| c.log_dir.clone());
    let _guard = init_tracing(log_dir.as_deref());

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    info!(api_url = %config.api_url, storage = ?config.storage, "Showcase starting");

    let mut app = App::new(config)?;
    cli.command.execute(&mut app).await
}
