//! Configuration loading for keepsync
//!
//! Settings come from (later wins):
//! 1. Built-in defaults
//! 2. JSON file (~/.config/keepsync/settings.json)
//! 3. `KEEPSYNC_*` environment variables
//!
//! The account credential is stored in the artifact database by `login`;
//! `KEEPSYNC_EMAIL` / `KEEPSYNC_MASTER_TOKEN` fill in whatever is missing.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Credential;
use crate::remote::AuthClient;
use crate::storage::ArtifactStore;
use crate::sync::{DEFAULT_MAX_PAGES, DEFAULT_TOKEN_SKEW_SECS, SyncEngine};

/// Settings filename in the keepsync config directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Database filename used when `database_path` is not set
const DATABASE_FILE: &str = "keepsync.sqlite";

const ENV_EMAIL: &str = "KEEPSYNC_EMAIL";
const ENV_MASTER_TOKEN: &str = "KEEPSYNC_MASTER_TOKEN";

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepConfig {
    /// Device-login endpoint
    pub auth_url: String,
    /// Notes changes endpoint
    pub notes_url: String,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
    /// Cached tokens expiring within this window are treated as expired
    pub token_skew_secs: i64,
    /// Cap on pages fetched in one sync
    pub max_pages: usize,
    /// Interval between syncs in `watch` mode
    pub refresh_interval_secs: u64,
    /// SQLite artifact database; defaults to the config directory
    pub database_path: Option<PathBuf>,
}

impl Default for KeepConfig {
    fn default() -> Self {
        Self {
            auth_url: AuthClient::DEFAULT_URL.to_string(),
            notes_url: SyncEngine::DEFAULT_URL.to_string(),
            timeout_secs: 30,
            token_skew_secs: DEFAULT_TOKEN_SKEW_SECS,
            max_pages: DEFAULT_MAX_PAGES,
            refresh_interval_secs: 900,
            database_path: None,
        }
    }
}

impl KeepConfig {
    /// Load settings from the config file (if present) and the environment
    pub fn load() -> Result<Self> {
        let mut config = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `KEEPSYNC_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("KEEPSYNC_AUTH_URL") {
            self.auth_url = url;
        }
        if let Some(url) = lookup("KEEPSYNC_NOTES_URL") {
            self.notes_url = url;
        }
        if let Some(value) = lookup("KEEPSYNC_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("KEEPSYNC_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("KEEPSYNC_TOKEN_SKEW_SECS") {
            self.token_skew_secs = parse_number("KEEPSYNC_TOKEN_SKEW_SECS", &value)?;
        }
        if let Some(value) = lookup("KEEPSYNC_MAX_PAGES") {
            self.max_pages = parse_number("KEEPSYNC_MAX_PAGES", &value)?;
        }
        if let Some(value) = lookup("KEEPSYNC_REFRESH_INTERVAL_SECS") {
            self.refresh_interval_secs = parse_number("KEEPSYNC_REFRESH_INTERVAL_SECS", &value)?;
        }
        if let Some(path) = lookup("KEEPSYNC_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Check that endpoints are absolute URLs and limits are usable
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("auth_url", &self.auth_url), ("notes_url", &self.notes_url)] {
            let url = url::Url::parse(value)
                .with_context(|| format!("Invalid {}: {}", name, value))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("Invalid {}: unsupported scheme '{}'", name, url.scheme());
            }
        }
        if self.max_pages == 0 {
            bail!("max_pages must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Where the artifact database lives
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => config::config_path(DATABASE_FILE).context("Could not determine config directory"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} is not a valid number: {}", name, value))
}

impl Credential {
    /// Load the account credential: the artifact store first, then
    /// `KEEPSYNC_EMAIL` / `KEEPSYNC_MASTER_TOKEN`.
    ///
    /// A device id is generated and persisted if the store has none.
    pub fn load(artifacts: &ArtifactStore<'_>) -> Result<Self> {
        Self::load_with(artifacts, |key| std::env::var(key).ok())
    }

    /// Same as [`Credential::load`] with an explicit variable lookup
    pub fn load_with<F>(artifacts: &ArtifactStore<'_>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let account = non_empty(artifacts.email()?)
            .or_else(|| non_empty(lookup(ENV_EMAIL)))
            .with_context(|| format!("No account configured; run `keepsync login` or set {}", ENV_EMAIL))?;
        let secret = non_empty(artifacts.credential_secret()?)
            .or_else(|| non_empty(lookup(ENV_MASTER_TOKEN)))
            .with_context(|| {
                format!("No master token configured; run `keepsync login` or set {}", ENV_MASTER_TOKEN)
            })?;
        let device_id = artifacts.ensure_device_id()?;

        Ok(Self::new(account, secret, device_id))
    }
}
