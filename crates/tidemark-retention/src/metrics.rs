//! Metrics collection for retention scanning
//!
//! One [`RetentionMetrics`] is shared between the scanner task, which writes,
//! and the metrics transport, which reads [`RetentionSnapshot`]s on demand.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::SystemTime;

/// Number of per-pass samples kept in each history
pub const HISTORY_LEN: usize = 61;

/// Bounded, append-only sample history
#[derive(Debug, Default)]
struct History {
    samples: VecDeque<u64>,
}

impl History {
    fn push(&mut self, value: u64) {
        self.samples.push_back(value);
        while self.samples.len() > HISTORY_LEN {
            self.samples.pop_front();
        }
    }

    fn render(&self) -> String {
        self.samples
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Live retention counters and histories
///
/// Counters are atomics. The last-completed-scan timestamp sits behind a
/// read/write lock so readers never observe a torn value. Histories have a
/// single writer (the scanner) and are rendered on read.
#[derive(Debug)]
pub struct RetentionMetrics {
    scan_completed: RwLock<SystemTime>,
    deletes_total: AtomicU64,
    period_secs: AtomicU64,
    retained_current: AtomicU64,
    deletes_hist: Mutex<History>,
    retained_hist: Mutex<History>,
}

impl Default for RetentionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RetentionMetrics {
    /// Create new metrics; the completion timestamp starts at "now"
    pub fn new() -> Self {
        Self {
            scan_completed: RwLock::new(SystemTime::now()),
            deletes_total: AtomicU64::new(0),
            period_secs: AtomicU64::new(0),
            retained_current: AtomicU64::new(0),
            deletes_hist: Mutex::new(History::default()),
            retained_hist: Mutex::new(History::default()),
        }
    }

    /// Publish the configured retention period
    pub fn set_period_secs(&self, secs: u64) {
        self.period_secs.store(secs, Ordering::Relaxed);
    }

    /// Configured retention period in seconds
    pub fn period_secs(&self) -> u64 {
        self.period_secs.load(Ordering::Relaxed)
    }

    /// Count one successful message deletion
    pub fn record_delete(&self) {
        self.deletes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Total messages deleted since startup
    pub fn deletes_total(&self) -> u64 {
        self.deletes_total.load(Ordering::Relaxed)
    }

    /// Retained message count from the last completed pass
    pub fn retained_current(&self) -> u64 {
        self.retained_current.load(Ordering::Relaxed)
    }

    /// Record the completion of a full pass
    ///
    /// Advances the completion timestamp, replaces the retained count and
    /// appends one sample to each history.
    pub fn record_pass(&self, completed_at: SystemTime, deleted: u64, retained: u64) {
        self.mark_scan_completed(completed_at);
        self.retained_current.store(retained, Ordering::Relaxed);
        self.deletes_hist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(deleted);
        self.retained_hist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(retained);
    }

    /// Move the completion timestamp forward; earlier values are ignored
    pub fn mark_scan_completed(&self, at: SystemTime) {
        let mut completed = self
            .scan_completed
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if at > *completed {
            *completed = at;
        }
    }

    /// When the last full pass finished
    pub fn scan_completed(&self) -> SystemTime {
        *self
            .scan_completed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whole seconds elapsed since the last full pass finished
    pub fn seconds_since_scan_completed(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.scan_completed())
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }

    /// Per-pass deletion counts, oldest first, comma-joined
    pub fn deletes_history(&self) -> String {
        self.deletes_hist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render()
    }

    /// Per-pass retained counts, oldest first, comma-joined
    pub fn retained_history(&self) -> String {
        self.retained_hist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render()
    }

    /// Read every field into a point-in-time snapshot
    pub fn snapshot(&self) -> RetentionSnapshot {
        RetentionSnapshot {
            seconds_since_scan_completed: self.seconds_since_scan_completed(),
            deletes_total: self.deletes_total(),
            period: self.period_secs(),
            retained_current: self.retained_current(),
            deletes_hist: self.deletes_history(),
            retained_hist: self.retained_history(),
        }
    }
}

/// Point-in-time view of [`RetentionMetrics`] for external consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetentionSnapshot {
    /// Seconds since the last full pass completed
    pub seconds_since_scan_completed: u64,
    /// Messages deleted since startup
    pub deletes_total: u64,
    /// Configured retention period in seconds
    pub period: u64,
    /// Messages retained by the last full pass
    pub retained_current: u64,
    /// Deletions per pass, comma-joined
    pub deletes_hist: String,
    /// Retained messages per pass, comma-joined
    pub retained_hist: String,
}

impl RetentionSnapshot {
    /// Generate a human-readable summary
    pub fn summary(&self) -> String {
        let lines = [
            "Retention Metrics Summary".to_string(),
            "=========================".to_string(),
            format!("Period: {}s", self.period),
            format!("Deletes total: {}", self.deletes_total),
            format!("Retained current: {}", self.retained_current),
            format!("Seconds since scan completed: {}", self.seconds_since_scan_completed),
        ];
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metrics_creation() {
        let metrics = RetentionMetrics::new();
        assert_eq!(metrics.deletes_total(), 0);
        assert_eq!(metrics.retained_current(), 0);
        assert_eq!(metrics.period_secs(), 0);
        assert_eq!(metrics.deletes_history(), "");
        assert!(metrics.seconds_since_scan_completed() < 2);
    }

    #[test]
    fn test_record_delete() {
        let metrics = RetentionMetrics::new();
        metrics.record_delete();
        metrics.record_delete();
        metrics.record_delete();

        assert_eq!(metrics.deletes_total(), 3);
    }

    #[test]
    fn test_record_pass() {
        let metrics = RetentionMetrics::new();
        let later = SystemTime::now() + Duration::from_secs(5);

        metrics.record_pass(later, 2, 7);
        metrics.record_pass(later, 0, 5);

        assert_eq!(metrics.retained_current(), 5);
        assert_eq!(metrics.scan_completed(), later);
        assert_eq!(metrics.deletes_history(), "2,0");
        assert_eq!(metrics.retained_history(), "7,5");
    }

    #[test]
    fn test_scan_completed_only_moves_forward() {
        let metrics = RetentionMetrics::new();
        let start = metrics.scan_completed();

        metrics.mark_scan_completed(start - Duration::from_secs(3600));
        assert_eq!(metrics.scan_completed(), start);

        let later = start + Duration::from_secs(10);
        metrics.mark_scan_completed(later);
        assert_eq!(metrics.scan_completed(), later);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_see_forward_timestamps() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let metrics = Arc::new(RetentionMetrics::new());
        let done = Arc::new(AtomicBool::new(false));
        let base = metrics.scan_completed();

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                let done = Arc::clone(&done);
                tokio::spawn(async move {
                    let mut last = metrics.scan_completed();
                    while !done.load(Ordering::Acquire) {
                        let snapshot = metrics.snapshot();
                        let completed = metrics.scan_completed();
                        assert!(completed >= last, "completion timestamp went backwards");
                        assert!(snapshot.retained_current <= 1_000);
                        last = completed;
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        let writer = {
            let metrics = Arc::clone(&metrics);
            tokio::spawn(async move {
                for i in 1..=1_000u64 {
                    metrics.record_delete();
                    metrics.record_pass(base + Duration::from_millis(i), 1, i);
                    // Stale completion from a slow writer
                    metrics.mark_scan_completed(base);
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        done.store(true, Ordering::Release);
        for reader in readers {
            reader.await.unwrap();
        }

        assert_eq!(metrics.scan_completed(), base + Duration::from_millis(1_000));
        assert_eq!(metrics.retained_current(), 1_000);
        assert_eq!(metrics.deletes_total(), 1_000);
    }

    #[test]
    fn test_history_is_bounded() {
        let metrics = RetentionMetrics::new();
        let now = SystemTime::now();
        for i in 0..(HISTORY_LEN as u64 + 10) {
            metrics.record_pass(now, i, i);
        }

        let history = metrics.deletes_history();
        let samples: Vec<&str> = history.split(',').collect();
        assert_eq!(samples.len(), HISTORY_LEN);
        assert_eq!(samples[0], "10");
        assert_eq!(samples[HISTORY_LEN - 1], (HISTORY_LEN as u64 + 9).to_string());
    }

    #[test]
    fn test_snapshot_field_names() {
        let metrics = RetentionMetrics::new();
        metrics.set_period_secs(3600);
        metrics.record_delete();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["Period"], 3600);
        assert_eq!(json["DeletesTotal"], 1);
        assert_eq!(json["RetainedCurrent"], 0);
        assert_eq!(json["DeletesHist"], "");
        assert_eq!(json["RetainedHist"], "");
        assert!(json["SecondsSinceScanCompleted"].is_u64());
    }

    #[test]
    fn test_summary() {
        let metrics = RetentionMetrics::new();
        metrics.set_period_secs(120);
        metrics.record_delete();

        let summary = metrics.snapshot().summary();
        assert!(summary.contains("Period: 120s"));
        assert!(summary.contains("Deletes total: 1"));
        assert!(summary.contains("Retained current: 0"));
    }
}
