//! Cutoff module - the expiry boundary for a single retention pass

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The instant below which a message is considered expired
///
/// A cutoff is computed once at the start of a pass and every age
/// comparison in that pass uses the same value. A message that ages past
/// the boundary while the pass is running is kept until the next pass.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
/// use tidemark_domain::Cutoff;
///
/// let now = SystemTime::now();
/// let cutoff = Cutoff::before(now, Duration::from_secs(3600));
///
/// assert!(cutoff.is_expired(now - Duration::from_secs(7200)));
/// assert!(!cutoff.is_expired(now - Duration::from_secs(60)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cutoff(SystemTime);

impl Cutoff {
    /// Cutoff lying `max_age` before `now`
    ///
    /// Saturates at the Unix epoch when `max_age` reaches further back.
    pub fn before(now: SystemTime, max_age: Duration) -> Self {
        Self(now.checked_sub(max_age).unwrap_or(UNIX_EPOCH))
    }

    /// Cutoff lying `max_age` before the current wall-clock time
    pub fn from_now(max_age: Duration) -> Self {
        Self::before(SystemTime::now(), max_age)
    }

    /// The boundary instant
    pub fn instant(&self) -> SystemTime {
        self.0
    }

    /// True when `date` is strictly before the cutoff
    pub fn is_expired(&self, date: SystemTime) -> bool {
        date < self.0
    }
}
