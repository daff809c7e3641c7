//! Session token cache
//!
//! Keeps the most recent session token and its expiry in the artifact
//! store. The cache applies no clock-skew buffer of its own; callers pass
//! the instant a token must still be valid at (typically now + skew).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::KeyValueStore;
use super::keys;
use crate::models::SessionToken;

/// Token cache over a key-value store
pub struct TokenCache<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> TokenCache<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Cached token, if any is still valid at `as_of`
    ///
    /// A missing expiry means the token is trusted until invalidated. An
    /// expiry entry that cannot be parsed is treated as a miss.
    pub fn load(&self, as_of: DateTime<Utc>) -> Result<Option<SessionToken>> {
        let Some(value) = self.store.get(keys::AUTH_TOKEN)? else {
            debug!("No cached session token");
            return Ok(None);
        };

        let expiry = match self.store.get(keys::AUTH_TOKEN_EXPIRY)? {
            None => None,
            Some(raw) => match parse_expiry(&raw) {
                Some(expiry) => Some(expiry),
                None => {
                    warn!("Ignoring cached token with unreadable expiry {:?}", raw);
                    return Ok(None);
                }
            },
        };

        let token = SessionToken::new(value, expiry);
        if !token.is_valid_at(as_of) {
            debug!("Cached session token expired at {:?}", token.expiry);
            return Ok(None);
        }
        Ok(Some(token))
    }

    /// Persist a token; clears any stale expiry when the token has none
    pub fn store(&self, token: &SessionToken) -> Result<()> {
        self.store
            .set(keys::AUTH_TOKEN, &token.value)
            .context("Failed to cache session token")?;
        match token.expiry {
            Some(expiry) => self
                .store
                .set(keys::AUTH_TOKEN_EXPIRY, &expiry.timestamp().to_string())?,
            None => self.store.delete(keys::AUTH_TOKEN_EXPIRY)?,
        }
        Ok(())
    }

    /// Forget the cached token. Safe to call when nothing is cached.
    pub fn invalidate(&self) -> Result<()> {
        self.store.delete(keys::AUTH_TOKEN)?;
        self.store.delete(keys::AUTH_TOKEN_EXPIRY)?;
        debug!("Session token cache invalidated");
        Ok(())
    }
}

/// Epoch seconds, integral or fractional
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let seconds = raw.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp(seconds as i64, 0)
}
