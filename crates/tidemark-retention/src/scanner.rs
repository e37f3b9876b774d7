//! Background scheduler for continuous retention scanning

use crate::scan::{scan_mailboxes, ScanOutcome};
use crate::shutdown::{StateCell, StopGuard};
use crate::{
    RetentionConfig, RetentionError, RetentionMetrics, ScannerState, ShutdownSignal, StopWaiter,
    MIN_SCAN_INTERVAL,
};
use std::sync::Arc;
use tidemark_domain::MessageStore;
use tokio::time::Instant;

/// Background scanner that purges expired messages on a schedule
///
/// Passes run one at a time, and two pass starts are never closer than
/// [`MIN_SCAN_INTERVAL`] unless a shutdown cuts the wait short.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tidemark_retention::{RetentionConfig, RetentionMetrics, RetentionScanner, Shutdown};
/// use tidemark_store::MemoryStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let shutdown = Shutdown::new();
///     let metrics = Arc::new(RetentionMetrics::new());
///     let scanner = RetentionScanner::new(RetentionConfig::default(), metrics);
///
///     scanner.start(Arc::new(MemoryStore::new()), shutdown.signal())?;
///
///     // Stop on Ctrl+C and wait for the loop to exit
///     tokio::signal::ctrl_c().await?;
///     shutdown.trigger();
///     scanner.join().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct RetentionScanner {
    config: RetentionConfig,
    metrics: Arc<RetentionMetrics>,
    state: Arc<StateCell>,
}

impl RetentionScanner {
    /// Create a scanner with the given configuration and metrics sink
    pub fn new(config: RetentionConfig, metrics: Arc<RetentionMetrics>) -> Self {
        Self {
            config,
            metrics,
            state: Arc::new(StateCell::new()),
        }
    }

    /// The scanner's configuration
    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Shared metrics updated by this scanner
    pub fn metrics(&self) -> &Arc<RetentionMetrics> {
        &self.metrics
    }

    /// Current lifecycle state
    pub fn state(&self) -> ScannerState {
        self.state.get()
    }

    /// A handle that can wait for this scanner to stop
    pub fn stop_waiter(&self) -> StopWaiter {
        self.state.waiter()
    }

    /// Wait until the background loop has exited
    ///
    /// Returns immediately when the scanner was never started or is
    /// disabled.
    pub async fn join(&self) {
        self.stop_waiter().wait().await;
    }

    /// Launch the background loop on the current tokio runtime
    ///
    /// Publishes the retention period, then either spawns the loop or, when
    /// scanning is disabled, moves straight to [`ScannerState::Stopped`].
    ///
    /// # Errors
    ///
    /// Returns [`RetentionError::AlreadyStarted`] on a second call.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime with scanning enabled.
    pub fn start<S>(&self, store: Arc<S>, shutdown: ShutdownSignal) -> Result<(), RetentionError>
    where
        S: MessageStore + 'static,
    {
        self.metrics.set_period_secs(self.config.period_secs());

        if !self.config.is_enabled() {
            if !self.state.finish() {
                return Err(RetentionError::AlreadyStarted);
            }
            tracing::info!("Retention scanner disabled");
            return Ok(());
        }

        if !self.state.begin() {
            return Err(RetentionError::AlreadyStarted);
        }

        tracing::info!(
            retention_minutes = self.config.retention_minutes,
            "Retention configured for {} minutes",
            self.config.retention_minutes
        );

        let guard = StopGuard::new(Arc::clone(&self.state));
        tokio::spawn(run_scheduler(
            store,
            self.config.clone(),
            Arc::clone(&self.metrics),
            shutdown,
            Arc::clone(&self.state),
            guard,
        ));

        Ok(())
    }
}

/// Scheduler loop; `guard` marks the scanner stopped when this returns
async fn run_scheduler<S>(
    store: Arc<S>,
    config: RetentionConfig,
    metrics: Arc<RetentionMetrics>,
    mut shutdown: ShutdownSignal,
    state: Arc<StateCell>,
    guard: StopGuard,
) where
    S: MessageStore + 'static,
{
    let max_age = config.max_age();
    let mailbox_delay = config.mailbox_delay();
    let mut pass_start = Instant::now();

    loop {
        // Never start passes more than once per interval
        let since = pass_start.elapsed();
        if since < MIN_SCAN_INTERVAL {
            let remaining = MIN_SCAN_INTERVAL - since;
            tracing::trace!(?remaining, "Retention scanner sleeping");
            tokio::select! {
                _ = shutdown.requested() => break,
                _ = tokio::time::sleep(remaining) => {}
            }
        }

        pass_start = Instant::now();
        tracing::debug!("Starting retention scan");
        match scan_mailboxes(store.as_ref(), max_age, mailbox_delay, &mut shutdown, &metrics).await {
            Ok(report) if report.outcome == ScanOutcome::Completed => {
                tracing::debug!(
                    deleted = report.deleted,
                    retained = report.retained,
                    failed = report.failed,
                    mailboxes = report.mailboxes_scanned,
                    elapsed = ?pass_start.elapsed(),
                    "Retention scan completed"
                );
            }
            Ok(report) => {
                tracing::debug!(
                    deleted = report.deleted,
                    mailboxes = report.mailboxes_scanned,
                    "Retention scan interrupted"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Error during retention scan");
            }
        }

        if shutdown.is_requested() {
            break;
        }
    }

    state.stopping();
    tracing::info!("Retention scanner stopping. Final metrics:\n{}", metrics.snapshot().summary());
    drop(guard);
}
