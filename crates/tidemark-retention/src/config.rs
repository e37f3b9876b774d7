//! Configuration for retention scanning
//!
//! Defines the maximum message age and the per-mailbox throttle.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum time between the starts of two consecutive scan passes
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the retention scanner
///
/// Immutable for the lifetime of a scanner. A `retention_minutes` of zero
/// disables scanning entirely.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tidemark_retention::RetentionConfig;
///
/// let config = RetentionConfig::default();
/// assert!(config.is_enabled());
/// assert_eq!(config.max_age(), Duration::from_secs(240 * 60));
///
/// let disabled = RetentionConfig::disabled();
/// assert!(!disabled.is_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Maximum message age in minutes, 0 disables the scanner
    /// Default: 240 (4 hours)
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u64,

    /// Pause after each mailbox, in milliseconds
    /// Default: 100
    #[serde(default = "default_retention_sleep_millis")]
    pub retention_sleep_millis: u64,
}

fn default_retention_minutes() -> u64 {
    240
}

fn default_retention_sleep_millis() -> u64 {
    100
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_minutes: default_retention_minutes(),
            retention_sleep_millis: default_retention_sleep_millis(),
        }
    }
}

impl RetentionConfig {
    /// Configuration with scanning turned off
    pub fn disabled() -> Self {
        Self {
            retention_minutes: 0,
            ..Self::default()
        }
    }

    /// Whether the scanner should run at all
    pub fn is_enabled(&self) -> bool {
        self.retention_minutes > 0
    }

    /// Get maximum message age as Duration
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.retention_minutes.saturating_mul(60))
    }

    /// Get per-mailbox throttle as Duration
    pub fn mailbox_delay(&self) -> Duration {
        Duration::from_millis(self.retention_sleep_millis)
    }

    /// Retention period in seconds, as published in metrics
    pub fn period_secs(&self) -> u64 {
        self.retention_minutes.saturating_mul(60)
    }
}
