//! Retention and size budget for the cache directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest period between two background sweeps.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How long entries live and how many bytes the directory may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Entries whose last write is older than this are expired
    pub ttl: Duration,
    /// Soft budget for the summed size of all entries
    pub max_size_bytes: u64,
}

impl RetentionPolicy {
    /// Create a policy with a one hour TTL and a 1000 MB budget.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_size_bytes: 1000 * 1024 * 1024,
        }
    }

    /// Set the time-to-live.
    #[must_use]
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the size budget in bytes.
    #[must_use]
    pub const fn max_size_bytes(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Period for the background sweep: a quarter of the TTL, never below one minute.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        (self.ttl / 4).max(MIN_SWEEP_INTERVAL)
    }

    /// Whether an entry last written at `modified` is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, modified: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(modified) > ttl
    }

    /// Whether an entry last written at `modified` is expired now.
    #[must_use]
    pub fn is_expired(&self, modified: DateTime<Utc>) -> bool {
        self.is_expired_at(modified, Utc::now())
    }

    /// Whether adding `incoming` bytes to `current` stays within budget.
    #[must_use]
    pub const fn fits(&self, current: u64, incoming: u64) -> bool {
        current.saturating_add(incoming) <= self.max_size_bytes
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_interval_is_quarter_ttl_with_floor() {
        let hourly = RetentionPolicy::new().ttl(Duration::from_secs(3600));
        assert_eq!(hourly.sweep_interval(), Duration::from_secs(900));

        let short = RetentionPolicy::new().ttl(Duration::from_secs(120));
        assert_eq!(short.sweep_interval(), MIN_SWEEP_INTERVAL);
    }

    #[test]
    fn test_expiry_boundary() {
        let policy = RetentionPolicy::new().ttl(Duration::from_secs(60));
        let now = Utc::now();

        assert!(!policy.is_expired_at(now - chrono::Duration::seconds(59), now));
        assert!(!policy.is_expired_at(now - chrono::Duration::seconds(60), now));
        assert!(policy.is_expired_at(now - chrono::Duration::seconds(61), now));
        // Timestamps in the future are never expired
        assert!(!policy.is_expired_at(now + chrono::Duration::seconds(600), now));
    }

    #[test]
    fn test_fits_budget() {
        let policy = RetentionPolicy::new().max_size_bytes(100);
        assert!(policy.fits(60, 40));
        assert!(!policy.fits(60, 41));
        assert!(!policy.fits(u64::MAX, 1));
    }
}
