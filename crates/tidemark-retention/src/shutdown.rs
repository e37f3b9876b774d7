//! Shutdown coordination
//!
//! Two independent signals:
//!
//! - **stop requested**: [`Shutdown`] fans a single flag out to any number of
//!   [`ShutdownSignal`]s held by background tasks
//! - **fully stopped**: the scanner's [`ScannerState`], observed through
//!   [`StopWaiter`]s, reaches [`ScannerState::Stopped`] exactly once

use tokio::sync::watch;

/// Owner of the process-wide stop flag
///
/// Dropping the `Shutdown` counts as a stop request for every signal
/// handed out from it.
///
/// # Examples
///
/// ```
/// use tidemark_retention::Shutdown;
///
/// let shutdown = Shutdown::new();
/// let signal = shutdown.signal();
/// assert!(!signal.is_requested());
///
/// shutdown.trigger();
/// assert!(signal.is_requested());
/// ```
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create a flag in the "running" position
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Hand out a new observer of the flag
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request a stop; repeated calls are no-ops
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("Shutdown requested");
        }
    }

    /// Whether a stop has been requested
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observer of a [`Shutdown`] flag
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Non-blocking check
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once a stop is requested (immediately if it already was)
    ///
    /// Cancel-safe, suitable for `tokio::select!`.
    pub async fn requested(&mut self) {
        // An Err means the Shutdown was dropped, which also counts as a stop
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Lifecycle of a retention scanner
///
/// `Idle -> Stopped` when scanning is disabled,
/// `Idle -> Running -> Stopping -> Stopped` otherwise. `Stopped` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerState {
    /// Constructed, not started
    Idle,
    /// Background loop active
    Running,
    /// Stop observed, loop unwinding
    Stopping,
    /// Loop exited (or never started because scanning is disabled)
    Stopped,
}

impl ScannerState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerState::Idle => "idle",
            ScannerState::Running => "running",
            ScannerState::Stopping => "stopping",
            ScannerState::Stopped => "stopped",
        }
    }

    /// True when no background loop is active
    pub fn is_quiescent(&self) -> bool {
        matches!(self, ScannerState::Idle | ScannerState::Stopped)
    }
}

/// Shared cell holding a scanner's state
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<ScannerState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(ScannerState::Idle);
        Self { tx }
    }

    pub(crate) fn get(&self) -> ScannerState {
        *self.tx.borrow()
    }

    /// `Idle -> Running`; false if the scanner was already started
    pub(crate) fn begin(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == ScannerState::Idle {
                *state = ScannerState::Running;
                true
            } else {
                false
            }
        })
    }

    /// `Running -> Stopping`
    pub(crate) fn stopping(&self) {
        self.tx.send_if_modified(|state| {
            if *state == ScannerState::Running {
                *state = ScannerState::Stopping;
                true
            } else {
                false
            }
        });
    }

    /// Move to `Stopped`; true only for the call that made the transition
    pub(crate) fn finish(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == ScannerState::Stopped {
                false
            } else {
                *state = ScannerState::Stopped;
                true
            }
        })
    }

    pub(crate) fn waiter(&self) -> StopWaiter {
        StopWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

/// Handle for waiting until a scanner is quiescent
///
/// Clone freely; every clone observes the same scanner.
#[derive(Debug, Clone)]
pub struct StopWaiter {
    rx: watch::Receiver<ScannerState>,
}

impl StopWaiter {
    /// Current scanner state
    pub fn state(&self) -> ScannerState {
        *self.rx.borrow()
    }

    /// Resolve once the scanner is not running
    ///
    /// Returns at once for a scanner that was never started or is disabled.
    pub async fn wait(&mut self) {
        // Err means the scanner and its task are gone: nothing left to wait for
        let _ = self.rx.wait_for(ScannerState::is_quiescent).await;
    }

    /// Blocking form of [`wait`](Self::wait) for threads outside the runtime
    ///
    /// # Panics
    ///
    /// Panics when called from within an async context.
    pub fn wait_blocking(&mut self) -> std::io::Result<()> {
        tokio::runtime::Builder::new_current_thread()
            .build()?
            .block_on(self.wait());
        Ok(())
    }
}

/// Moves the cell to `Stopped` when dropped, even on panic
pub(crate) struct StopGuard {
    cell: std::sync::Arc<StateCell>,
}

impl StopGuard {
    pub(crate) fn new(cell: std::sync::Arc<StateCell>) -> Self {
        Self { cell }
    }
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        if self.cell.finish() {
            tracing::trace!("Retention scanner shut down");
        }
    }
}
