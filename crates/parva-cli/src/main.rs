//! Parva CLI - query the Parva calendar API and drive the offline cache
//! from a terminal.

mod cli;
mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use parva_core::Config;

use crate::cli::{Cli, Command};

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "parva.log");
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
    let _guard = init_tracing(cli.log_dir.as_deref());

    let mut config = Config::load()?;
    if let Some(api_base) = cli.api_base {
        config.api_base = api_base;
    }
    if let Some(origin) = cli.origin {
        config.origin = origin;
    }
    info!(api_base = %config.api_base, origin = %config.origin, "Parva CLI starting");

    let result = match cli.command {
        Command::Offline(args) => commands::offline(&config, args.action).await,
        Command::Config(args) => commands::config(&config, args.action),
        command => commands::api(&config, command).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
