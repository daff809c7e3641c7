//! Refresh interval timing
//!
//! Pure functions so the refresh loop can be tested without sleeping.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Whether a new sync is due.
///
/// # Arguments
/// * `last_sync_at` - When the last successful sync completed (None if never synced)
/// * `interval_secs` - Minimum seconds between syncs
pub fn refresh_due(last_sync_at: Option<DateTime<Utc>>, interval_secs: u64) -> bool {
    time_until_refresh(last_sync_at, interval_secs).is_zero()
}

/// How long to wait before the next sync is due (zero if it already is)
pub fn time_until_refresh(last_sync_at: Option<DateTime<Utc>>, interval_secs: u64) -> Duration {
    let Some(last) = last_sync_at else {
        return Duration::ZERO;
    };
    let elapsed = (Utc::now() - last).num_seconds().max(0) as u64;
    Duration::from_secs(interval_secs.saturating_sub(elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_never_synced_is_due() {
        assert!(refresh_due(None, 900));
        assert!(refresh_due(None, 0));
        assert_eq!(time_until_refresh(None, 900), Duration::ZERO);
    }

    #[test]
    fn test_recent_sync_not_due() {
        let last = Utc::now() - ChronoDuration::seconds(10);
        assert!(!refresh_due(Some(last), 30));

        let wait = time_until_refresh(Some(last), 30);
        assert!(wait <= Duration::from_secs(20));
        assert!(wait >= Duration::from_secs(19));
    }

    #[test]
    fn test_old_sync_due() {
        let last = Utc::now() - ChronoDuration::seconds(60);
        assert!(refresh_due(Some(last), 30));

        let last = Utc::now() - ChronoDuration::hours(24);
        assert!(refresh_due(Some(last), 900));
    }

    #[test]
    fn test_zero_interval_always_due() {
        assert!(refresh_due(Some(Utc::now()), 0));
    }

    #[test]
    fn test_future_timestamp_waits_full_interval() {
        let last = Utc::now() + ChronoDuration::seconds(120);
        assert_eq!(time_until_refresh(Some(last), 30), Duration::from_secs(30));
    }
}
