//! Bookkeeping for the last successful sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of the most recent successful sync for an account
///
/// Persisted next to the note set so display surfaces can show freshness
/// and the refresh loop can tell when the next run is due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Account email the notes belong to
    pub account_id: String,
    /// When the last run finished
    pub last_sync_at: DateTime<Utc>,
    /// Number of display notes written by that run
    pub note_count: usize,
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub sync_version: u32,
}

fn default_version() -> u32 {
    1
}

impl SyncState {
    /// State for a run that just completed
    pub fn completed(account_id: impl Into<String>, note_count: usize) -> Self {
        Self {
            account_id: account_id.into(),
            last_sync_at: Utc::now(),
            note_count,
            sync_version: default_version(),
        }
    }

    /// Whether this state belongs to `account`
    pub fn is_for(&self, account: &str) -> bool {
        self.account_id.eq_ignore_ascii_case(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_state() {
        let state = SyncState::completed("user@gmail.com", 4);
        assert_eq!(state.account_id, "user@gmail.com");
        assert_eq!(state.note_count, 4);
        assert_eq!(state.sync_version, 1);
        assert!(state.is_for("User@Gmail.com"));
    }

    #[test]
    fn test_missing_version_defaults() {
        let json = r#"{"account_id":"a@b.c","last_sync_at":"2024-05-01T10:00:00Z","note_count":2}"#;
        let state: SyncState = serde_json::from_str(json).unwrap();
        assert_eq!(state.sync_version, 1);
        assert_eq!(state.note_count, 2);
    }
}
