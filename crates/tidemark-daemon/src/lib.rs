//! Tidemark Daemon
//!
//! Hosts the retention scanner over a directory-backed message store and
//! exposes its metrics over HTTP.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod handlers;

use config::DaemonConfig;
use handlers::{create_router, AppState};
use std::sync::Arc;
use tidemark_retention::{RetentionError, RetentionMetrics, RetentionScanner, Shutdown};
use tidemark_store::{DirectoryStore, StoreError};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Daemon error
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Store could not be opened
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Scanner could not be started
    #[error("Retention error: {0}")]
    Retention(#[from] RetentionError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Install the global tracing subscriber
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Run the daemon until `shutdown` is triggered
///
/// Opens the store, starts the retention scanner and serves metrics. Once
/// shutdown is requested the HTTP server drains, then this waits for the
/// scanner to stop before returning.
pub async fn run(config: DaemonConfig, shutdown: Arc<Shutdown>) -> Result<(), DaemonError> {
    let listener = TcpListener::bind(config.http.bind_addr()).await?;
    serve(config, listener, shutdown).await
}

/// [`run`] on an already bound listener
pub async fn serve(
    config: DaemonConfig,
    listener: TcpListener,
    shutdown: Arc<Shutdown>,
) -> Result<(), DaemonError> {
    info!("Starting Tidemark");
    info!("Store path: {}", config.store.path.display());

    let store = Arc::new(DirectoryStore::open(&config.store.path)?);
    let metrics = Arc::new(RetentionMetrics::new());
    let scanner = RetentionScanner::new(config.retention.clone(), Arc::clone(&metrics));
    scanner.start(store, shutdown.signal())?;

    let state = AppState {
        metrics,
        scanner: scanner.stop_waiter(),
    };
    let app = create_router(state);

    info!("Metrics listening on {}", listener.local_addr()?);

    let mut signal = shutdown.signal();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.requested().await })
        .await
        .map_err(|e| DaemonError::Server(e.to_string()));

    // Server may have exited on an error without a stop request
    shutdown.trigger();
    scanner.join().await;
    info!("Tidemark stopped");

    served
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaemonError::from(RetentionError::AlreadyStarted);
        assert_eq!(err.to_string(), "Retention error: Retention scanner already started");

        let err = DaemonError::Server("boom".to_string());
        assert_eq!(err.to_string(), "Server error: boom");
    }
}
