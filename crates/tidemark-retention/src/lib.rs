//! Tidemark Retention
//!
//! Background sweeper that deletes messages older than a configured age from
//! every mailbox in a message store.
//!
//! # Overview
//!
//! - **Scan engine** ([`scan_mailboxes`]): one pass over all mailboxes with a
//!   fixed cutoff. Per-message delete failures are logged and skipped.
//! - **Scheduler** ([`RetentionScanner`]): perpetual loop, at most one pass
//!   start per [`MIN_SCAN_INTERVAL`]
//! - **Shutdown** ([`Shutdown`], [`ShutdownSignal`], [`StopWaiter`]): stop
//!   requests in, "fully stopped" out
//! - **Metrics** ([`RetentionMetrics`]): live counters and per-pass
//!   histories, read as [`RetentionSnapshot`]s
//!
//! # Usage
//!
//! ## One-time Pass
//!
//! ```
//! use std::time::{Duration, SystemTime};
//! use tidemark_retention::{scan_mailboxes, RetentionMetrics, Shutdown};
//! use tidemark_store::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! store.deliver("alice", "old", SystemTime::now() - Duration::from_secs(7200));
//!
//! let metrics = RetentionMetrics::new();
//! let shutdown = Shutdown::new();
//! let report = scan_mailboxes(
//!     &store,
//!     Duration::from_secs(3600),
//!     Duration::ZERO,
//!     &mut shutdown.signal(),
//!     &metrics,
//! )
//! .await?;
//!
//! assert_eq!(report.deleted, 1);
//! assert_eq!(metrics.deletes_total(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Scanner
//!
//! ```no_run
//! use std::sync::Arc;
//! use tidemark_retention::{RetentionConfig, RetentionMetrics, RetentionScanner, Shutdown};
//! use tidemark_store::DirectoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(DirectoryStore::open("/var/spool/tidemark")?);
//!     let metrics = Arc::new(RetentionMetrics::new());
//!     let shutdown = Shutdown::new();
//!
//!     let scanner = RetentionScanner::new(RetentionConfig::default(), Arc::clone(&metrics));
//!     scanner.start(store, shutdown.signal())?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     shutdown.trigger();
//!     scanner.join().await;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [retention]
//! retention_minutes = 240       # 0 disables the scanner
//! retention_sleep_millis = 100  # pause between mailboxes
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod scan;
mod scanner;
mod shutdown;

pub use config::{RetentionConfig, MIN_SCAN_INTERVAL};
pub use error::RetentionError;
pub use metrics::{RetentionMetrics, RetentionSnapshot, HISTORY_LEN};
pub use scan::{scan_mailboxes, ScanOutcome, ScanReport};
pub use scanner::RetentionScanner;
pub use shutdown::{ScannerState, Shutdown, ShutdownSignal, StopWaiter};
