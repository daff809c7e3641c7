//! Typed schema over the shared key-value store
//!
//! The app, the sync coordinator and any display surface agree on the keys
//! below and on the JSON shape of the values. The coordinator is the single
//! writer for notes and sync state.

use anyhow::{Context, Result};
use log::info;

use super::{KeyValueStore, TokenCache};
use crate::models::{DisplayNote, SyncState};
use crate::util::random_u64;

/// Well-known keys
pub mod keys {
    /// Account email address
    pub const EMAIL: &str = "email";
    /// Long-lived master token
    pub const CREDENTIAL: &str = "credential";
    /// Per-installation device identifier
    pub const DEVICE_ID: &str = "deviceId";
    /// Cached session token
    pub const AUTH_TOKEN: &str = "authToken";
    /// Cached session token expiry, epoch seconds
    pub const AUTH_TOKEN_EXPIRY: &str = "authTokenExpiry";
    /// JSON array of DisplayNote
    pub const NOTES: &str = "notes";
    /// JSON SyncState of the last successful run
    pub const SYNC_STATE: &str = "syncState";
}

/// Typed access to the persisted artifacts
pub struct ArtifactStore<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> ArtifactStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Token cache sharing the same backing store
    pub fn token_cache(&self) -> TokenCache<'a> {
        TokenCache::new(self.store)
    }

    // === Account ===

    pub fn email(&self) -> Result<Option<String>> {
        self.store.get(keys::EMAIL)
    }

    pub fn set_email(&self, email: &str) -> Result<()> {
        self.store.set(keys::EMAIL, email.trim())
    }

    pub fn credential_secret(&self) -> Result<Option<String>> {
        self.store.get(keys::CREDENTIAL)
    }

    pub fn set_credential_secret(&self, secret: &str) -> Result<()> {
        self.store.set(keys::CREDENTIAL, secret.trim())
    }

    pub fn device_id(&self) -> Result<Option<String>> {
        self.store.get(keys::DEVICE_ID)
    }

    /// Device id for this installation, generated on first use
    ///
    /// Reusing the same id across logins keeps the service from flagging
    /// every run as a new device.
    pub fn ensure_device_id(&self) -> Result<String> {
        if let Some(id) = self.device_id()?.filter(|id| is_device_id(id)) {
            return Ok(id);
        }
        let id = format!("{:016x}", random_u64());
        self.store
            .set(keys::DEVICE_ID, &id)
            .context("Failed to save device id")?;
        info!("Generated new device id {}", id);
        Ok(id)
    }

    // === Sync artifacts ===

    /// Replace the persisted note set
    pub fn save_notes(&self, notes: &[DisplayNote]) -> Result<()> {
        let json = serde_json::to_string(notes)?;
        self.store
            .set(keys::NOTES, &json)
            .context("Failed to save notes")
    }

    /// Persisted note set; empty if nothing has been synced yet
    pub fn load_notes(&self) -> Result<Vec<DisplayNote>> {
        match self.store.get(keys::NOTES)? {
            Some(json) => serde_json::from_str(&json).context("Failed to parse stored notes"),
            None => Ok(Vec::new()),
        }
    }

    pub fn save_sync_state(&self, state: &SyncState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.store
            .set(keys::SYNC_STATE, &json)
            .context("Failed to save sync state")
    }

    pub fn sync_state(&self) -> Result<Option<SyncState>> {
        self.store
            .get(keys::SYNC_STATE)?
            .map(|json| serde_json::from_str(&json).context("Failed to parse stored sync state"))
            .transpose()
    }

    /// Remove everything tied to the signed-in account.
    ///
    /// The device id survives so the next login reuses it.
    pub fn clear_account(&self) -> Result<()> {
        for key in [
            keys::EMAIL,
            keys::CREDENTIAL,
            keys::AUTH_TOKEN,
            keys::AUTH_TOKEN_EXPIRY,
            keys::NOTES,
            keys::SYNC_STATE,
        ] {
            self.store.delete(key)?;
        }
        Ok(())
    }
}

fn is_device_id(id: &str) -> bool {
    id.len() == 16 && id.chars().all(|c| c.is_ascii_hexdigit())
}
