//! Account credential and session token

use chrono::{DateTime, Utc};
use std::fmt;

/// Long-lived login material for one account
///
/// Supplied by whoever owns credential storage; immutable for the duration
/// of a sync run.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Account email address
    pub account: String,
    /// Long-lived master token (`aas_et/...`)
    pub secret: String,
    /// 16-character hex device identifier, stable per installation
    pub device_id: String,
}

impl Credential {
    pub fn new(
        account: impl Into<String>,
        secret: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            secret: secret.into(),
            device_id: device_id.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("account", &self.account)
            .field("secret", &"[REDACTED]")
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Short-lived bearer token returned by the credential exchange
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub value: String,
    /// `None` means the service did not say; the token is then trusted until
    /// it is explicitly invalidated.
    pub expiry: Option<DateTime<Utc>>,
}

impl SessionToken {
    pub fn new(value: impl Into<String>, expiry: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expiry,
        }
    }

    /// Whether the token is still usable at `as_of`
    pub fn is_valid_at(&self, as_of: DateTime<Utc>) -> bool {
        self.expiry.is_none_or(|expiry| expiry >= as_of)
    }

    /// Token prefix that is safe to put in logs
    pub fn log_prefix(&self) -> &str {
        match self.value.char_indices().nth(12) {
            Some((idx, _)) => &self.value[..idx],
            None => "",
        }
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}
