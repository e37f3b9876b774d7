//! Tidemark daemon entry point
//!
//! Starts the retention scanner and the metrics listener, and stops both on
//! Ctrl+C.

use clap::Parser;
use std::process;
use std::sync::Arc;
use tidemark_daemon::{cli::Cli, config::DaemonConfig, init_tracing, run, DaemonError};
use tidemark_retention::Shutdown;

#[tokio::main]
async fn main() {
    if let Err(e) = start().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn start() -> Result<(), DaemonError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DaemonConfig::from_file(path)?,
        None => {
            eprintln!("Warning: No config file specified, using defaults");
            eprintln!("Usage: tidemark --config <path-to-config.toml>");
            eprintln!();
            DaemonConfig::default()
        }
    };

    if cli.check_config {
        println!("{:#?}", config);
        return Ok(());
    }

    init_tracing();

    let shutdown = Arc::new(Shutdown::new());
    let ctrl_c = Arc::clone(&shutdown);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                ctrl_c.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    run(config, shutdown).await
}
