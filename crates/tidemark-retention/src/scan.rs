//! Scan engine: one retention pass over every mailbox

use crate::{RetentionError, RetentionMetrics, ShutdownSignal};
use std::time::{Duration, SystemTime};
use tidemark_domain::{Cutoff, Mailbox, MessageStore, StoredMessage};

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every mailbox was visited
    Completed,
    /// A shutdown request cut the pass short
    Interrupted,
}

/// Tallies from a single pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Expired messages deleted
    pub deleted: u64,
    /// Messages younger than the cutoff
    pub retained: u64,
    /// Expired messages whose deletion failed
    pub failed: u64,
    /// Mailboxes fully processed
    pub mailboxes_scanned: usize,
    /// Whether the pass ran to the end
    pub outcome: ScanOutcome,
}

/// Running state of a pass, discarded when the pass ends
struct ScanPass<'a> {
    cutoff: Cutoff,
    metrics: &'a RetentionMetrics,
    deleted: u64,
    retained: u64,
    failed: u64,
    mailboxes_scanned: usize,
}

impl<'a> ScanPass<'a> {
    fn new(cutoff: Cutoff, metrics: &'a RetentionMetrics) -> Self {
        Self {
            cutoff,
            metrics,
            deleted: 0,
            retained: 0,
            failed: 0,
            mailboxes_scanned: 0,
        }
    }

    /// Purge expired messages from one mailbox
    ///
    /// A failed listing aborts the whole pass. A failed delete is logged
    /// and skipped.
    fn sweep_mailbox<M: Mailbox>(&mut self, mailbox: &M) -> Result<(), RetentionError> {
        let messages = mailbox.messages().map_err(|e| {
            RetentionError::Store(format!("listing mailbox {}: {}", mailbox.name(), e))
        })?;

        for message in messages {
            if !self.cutoff.is_expired(message.date()) {
                self.retained += 1;
                continue;
            }

            tracing::trace!(mailbox = mailbox.name(), id = message.id(), "Purging expired message");
            match message.delete() {
                Ok(()) => {
                    self.deleted += 1;
                    self.metrics.record_delete();
                }
                Err(e) => {
                    self.failed += 1;
                    tracing::error!(
                        mailbox = mailbox.name(),
                        id = message.id(),
                        error = %e,
                        "Failed to purge message"
                    );
                }
            }
        }

        self.mailboxes_scanned += 1;
        Ok(())
    }

    fn into_report(self, outcome: ScanOutcome) -> ScanReport {
        ScanReport {
            deleted: self.deleted,
            retained: self.retained,
            failed: self.failed,
            mailboxes_scanned: self.mailboxes_scanned,
            outcome,
        }
    }
}

/// Run one pass over every mailbox in `store`
///
/// Messages dated strictly before `now - max_age` are deleted. The cutoff is
/// fixed when the pass starts.
///
/// Shutdown is checked after each mailbox; when set, the pass stops there
/// and reports [`ScanOutcome::Interrupted`]. Between mailboxes the pass
/// pauses for `mailbox_delay`, and that pause also ends early on shutdown.
///
/// Only a completed pass advances the completion timestamp, sets the
/// retained count and appends to the histories. Deletions are counted as
/// they happen either way.
///
/// # Errors
///
/// Returns [`RetentionError::Store`] when the mailbox list or any mailbox's
/// message list cannot be read. Deletions made before the failure stand.
pub async fn scan_mailboxes<S: MessageStore>(
    store: &S,
    max_age: Duration,
    mailbox_delay: Duration,
    shutdown: &mut ShutdownSignal,
    metrics: &RetentionMetrics,
) -> Result<ScanReport, RetentionError> {
    let cutoff = Cutoff::from_now(max_age);
    tracing::trace!(cutoff = ?cutoff.instant(), "Starting retention scan");

    let mailboxes = store
        .mailboxes()
        .map_err(|e| RetentionError::Store(format!("listing mailboxes: {}", e)))?;
    let total = mailboxes.len();

    let mut pass = ScanPass::new(cutoff, metrics);
    for (index, mailbox) in mailboxes.into_iter().enumerate() {
        pass.sweep_mailbox(&mailbox)?;

        if shutdown.is_requested() {
            tracing::trace!("Retention scan aborted due to shutdown");
            return Ok(pass.into_report(ScanOutcome::Interrupted));
        }

        if index + 1 < total && !mailbox_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(mailbox_delay) => {}
                _ = shutdown.requested() => {
                    tracing::trace!("Retention scan aborted due to shutdown");
                    return Ok(pass.into_report(ScanOutcome::Interrupted));
                }
            }
        }
    }

    metrics.record_pass(SystemTime::now(), pass.deleted, pass.retained);
    Ok(pass.into_report(ScanOutcome::Completed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shutdown;
    use tidemark_store::{MemoryMailbox, MemoryStore, StoreError};

    const DAY: Duration = Duration::from_secs(86_400);

    fn days_ago(days: u32) -> SystemTime {
        SystemTime::now() - DAY * days
    }

    /// Two mailboxes: A holds 40d and 1d messages, B holds a 100d message
    fn scenario_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.deliver("a", "a-40d", days_ago(40));
        store.deliver("a", "a-1d", days_ago(1));
        store.deliver("b", "b-100d", days_ago(100));
        store
    }

    /// Wraps a store and triggers shutdown while listing a chosen mailbox
    struct ShutdownOnList {
        inner: MemoryStore,
        mailbox: &'static str,
        shutdown: std::sync::Arc<Shutdown>,
    }

    struct TriggeringMailbox {
        inner: MemoryMailbox,
        trigger: Option<std::sync::Arc<Shutdown>>,
    }

    impl MessageStore for ShutdownOnList {
        type Error = StoreError;
        type Mailbox = TriggeringMailbox;

        fn mailboxes(&self) -> Result<Vec<TriggeringMailbox>, StoreError> {
            Ok(self
                .inner
                .mailboxes()?
                .into_iter()
                .map(|inner| {
                    let trigger = (inner.name() == self.mailbox)
                        .then(|| std::sync::Arc::clone(&self.shutdown));
                    TriggeringMailbox { inner, trigger }
                })
                .collect())
        }
    }

    impl Mailbox for TriggeringMailbox {
        type Error = StoreError;
        type Message = tidemark_store::MemoryMessage;

        fn name(&self) -> &str {
            self.inner.name()
        }

        fn messages(&self) -> Result<Vec<Self::Message>, StoreError> {
            if let Some(shutdown) = &self.trigger {
                shutdown.trigger();
            }
            self.inner.messages()
        }
    }

    #[tokio::test]
    async fn test_scenario_pass() {
        let store = scenario_store();
        let metrics = RetentionMetrics::new();
        let shutdown = Shutdown::new();
        let before = metrics.scan_completed();

        let report = scan_mailboxes(&store, 30 * DAY, Duration::ZERO, &mut shutdown.signal(), &metrics)
            .await
            .unwrap();

        assert_eq!(report.outcome, ScanOutcome::Completed);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.retained, 1);
        assert_eq!(report.mailboxes_scanned, 2);
        assert_eq!(metrics.deletes_total(), 2);
        assert_eq!(metrics.retained_current(), 1);
        assert!(metrics.scan_completed() >= before);
        assert_eq!(metrics.deletes_history(), "2");
        assert_eq!(metrics.retained_history(), "1");

        assert!(store.contains("a", "a-1d"));
        assert!(!store.contains("a", "a-40d"));
        assert!(!store.contains("b", "b-100d"));
    }

    #[tokio::test]
    async fn test_second_pass_finds_nothing_new() {
        let store = scenario_store();
        let metrics = RetentionMetrics::new();
        let shutdown = Shutdown::new();

        for _ in 0..2 {
            scan_mailboxes(&store, 30 * DAY, Duration::ZERO, &mut shutdown.signal(), &metrics)
                .await
                .unwrap();
        }

        // Each expired message deleted exactly once
        assert_eq!(store.deleted_ids().len(), 2);
        assert_eq!(metrics.deletes_total(), 2);
        assert_eq!(metrics.deletes_history(), "2,0");
        assert_eq!(metrics.retained_history(), "1,1");
    }

    #[tokio::test]
    async fn test_delete_failure_does_not_abort() {
        let store = MemoryStore::new();
        store.deliver("a", "a-stuck", days_ago(50));
        store.deliver("a", "a-old", days_ago(45));
        store.deliver("b", "b-old", days_ago(60));
        store.fail_delete("a-stuck");

        let metrics = RetentionMetrics::new();
        let shutdown = Shutdown::new();
        let report = scan_mailboxes(&store, 30 * DAY, Duration::ZERO, &mut shutdown.signal(), &metrics)
            .await
            .unwrap();

        assert_eq!(report.outcome, ScanOutcome::Completed);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.retained, 0);
        assert_eq!(metrics.deletes_total(), 2);
        assert!(store.contains("a", "a-stuck"));
        assert!(!store.contains("a", "a-old"));
        assert!(!store.contains("b", "b-old"));
    }

    #[tokio::test]
    async fn test_mailbox_listing_failure_aborts_pass() {
        let store = scenario_store();
        store.fail_mailbox_listing(true);

        let metrics = RetentionMetrics::new();
        let shutdown = Shutdown::new();
        let before = metrics.scan_completed();

        let result = scan_mailboxes(&store, 30 * DAY, Duration::ZERO, &mut shutdown.signal(), &metrics).await;

        assert!(matches!(result, Err(RetentionError::Store(_))));
        assert_eq!(metrics.scan_completed(), before);
        assert_eq!(metrics.deletes_history(), "");
        assert_eq!(store.message_count(), 3);
    }

    #[tokio::test]
    async fn test_message_listing_failure_aborts_whole_pass() {
        let store = scenario_store();
        store.fail_message_listing("b");

        let metrics = RetentionMetrics::new();
        metrics.record_pass(SystemTime::now(), 0, 42);
        let before = metrics.scan_completed();
        let shutdown = Shutdown::new();

        let result = scan_mailboxes(&store, 30 * DAY, Duration::ZERO, &mut shutdown.signal(), &metrics).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("listing mailbox b"));
        // Mailbox A was already processed; its deletion stands
        assert!(!store.contains("a", "a-40d"));
        assert_eq!(metrics.deletes_total(), 1);
        // No completion bookkeeping for the failed pass
        assert_eq!(metrics.scan_completed(), before);
        assert_eq!(metrics.retained_current(), 42);
        assert_eq!(metrics.retained_history(), "42");
    }

    #[tokio::test]
    async fn test_shutdown_between_mailboxes() {
        let shutdown = std::sync::Arc::new(Shutdown::new());
        let store = ShutdownOnList {
            inner: scenario_store(),
            mailbox: "a",
            shutdown: std::sync::Arc::clone(&shutdown),
        };

        let metrics = RetentionMetrics::new();
        let before = metrics.scan_completed();
        let report = scan_mailboxes(&store, 30 * DAY, Duration::ZERO, &mut shutdown.signal(), &metrics)
            .await
            .unwrap();

        assert_eq!(report.outcome, ScanOutcome::Interrupted);
        assert_eq!(report.mailboxes_scanned, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.retained, 1);

        // Mailbox A's effects applied, B untouched
        assert!(!store.inner.contains("a", "a-40d"));
        assert!(store.inner.contains("b", "b-100d"));
        assert_eq!(metrics.deletes_total(), 1);

        // Interrupted passes leave pass-level metrics alone
        assert_eq!(metrics.scan_completed(), before);
        assert_eq!(metrics.retained_current(), 0);
        assert_eq!(metrics.retained_history(), "");
    }

    #[tokio::test]
    async fn test_shutdown_in_last_mailbox_still_interrupts() {
        let shutdown = std::sync::Arc::new(Shutdown::new());
        let store = ShutdownOnList {
            inner: scenario_store(),
            mailbox: "b",
            shutdown: std::sync::Arc::clone(&shutdown),
        };

        let metrics = RetentionMetrics::new();
        let report = scan_mailboxes(&store, 30 * DAY, Duration::ZERO, &mut shutdown.signal(), &metrics)
            .await
            .unwrap();

        assert_eq!(report.outcome, ScanOutcome::Interrupted);
        assert_eq!(report.mailboxes_scanned, 2);
        assert_eq!(store.inner.message_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_between_mailboxes() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            store.create_mailbox(name);
        }

        let metrics = RetentionMetrics::new();
        let shutdown = Shutdown::new();
        let start = tokio::time::Instant::now();

        scan_mailboxes(&store, 30 * DAY, Duration::from_secs(1), &mut shutdown.signal(), &metrics)
            .await
            .unwrap();

        // One pause between each pair of mailboxes, none after the last
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_is_interruptible() {
        let store = MemoryStore::new();
        store.create_mailbox("a");
        store.create_mailbox("b");

        let metrics = RetentionMetrics::new();
        let shutdown = std::sync::Arc::new(Shutdown::new());
        let mut signal = shutdown.signal();
        let start = tokio::time::Instant::now();

        let trigger = {
            let shutdown = std::sync::Arc::clone(&shutdown);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                shutdown.trigger();
            })
        };

        let report = scan_mailboxes(&store, 30 * DAY, Duration::from_secs(3600), &mut signal, &metrics)
            .await
            .unwrap();
        trigger.await.unwrap();

        assert_eq!(report.outcome, ScanOutcome::Interrupted);
        assert_eq!(report.mailboxes_scanned, 1);
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_empty_store_completes() {
        let store = MemoryStore::new();
        let metrics = RetentionMetrics::new();
        let shutdown = Shutdown::new();

        let report = scan_mailboxes(&store, DAY, Duration::from_secs(10), &mut shutdown.signal(), &metrics)
            .await
            .unwrap();

        assert_eq!(report.outcome, ScanOutcome::Completed);
        assert_eq!(report.mailboxes_scanned, 0);
        assert_eq!(metrics.retained_history(), "0");
    }
}
