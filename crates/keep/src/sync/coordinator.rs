//! End-to-end sync: token, feed, tree, persist
//!
//! One call to [`SyncCoordinator::run`] walks a fixed sequence of phases and
//! hands each stage's result to the next by value. Nothing survives between
//! runs except what is in the store. Callers must not run two coordinators
//! for the same account at once.

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

use super::engine::{SyncEngine, SyncError};
use super::tree::build_notes;
use crate::config::KeepConfig;
use crate::models::{Credential, SessionToken, SyncState};
use crate::remote::{AuthClient, AuthError, HttpTransport};
use crate::storage::{ArtifactStore, KeyValueStore, TokenCache};

/// Default allowance for clock skew when checking a cached token
pub const DEFAULT_TOKEN_SKEW_SECS: i64 = 60;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    AcquiringToken,
    Syncing,
    Building,
    Done,
    Failed,
}

/// Why a run failed
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl From<anyhow::Error> for CoordinatorError {
    fn from(e: anyhow::Error) -> Self {
        CoordinatorError::Storage {
            message: format!("{:#}", e),
        }
    }
}

/// Statistics from a successful run
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    /// Display notes written to the store
    pub note_count: usize,
    /// Raw records received across all pages
    pub nodes_fetched: usize,
    /// Pages fetched by the final, successful pass
    pub pages: usize,
    /// Whether the cached or fresh token was refused and replaced mid-run
    pub reauthenticated: bool,
    /// Duration of the whole run
    pub duration_ms: u64,
}

/// Runs one complete synchronization for an account
pub struct SyncCoordinator<'a> {
    store: &'a dyn KeyValueStore,
    auth: AuthClient,
    engine: SyncEngine,
    token_skew: Duration,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(store: &'a dyn KeyValueStore, auth: AuthClient, engine: SyncEngine) -> Self {
        Self {
            store,
            auth,
            engine,
            token_skew: Duration::seconds(DEFAULT_TOKEN_SKEW_SECS),
        }
    }

    /// Wire up clients for the endpoints and limits in `config`
    pub fn from_config(
        store: &'a dyn KeyValueStore,
        transport: Arc<dyn HttpTransport>,
        config: &KeepConfig,
    ) -> Self {
        let auth = AuthClient::new(transport.clone(), &config.auth_url);
        let engine = SyncEngine::new(transport, &config.notes_url).with_max_pages(config.max_pages);
        Self::new(store, auth, engine).with_token_skew(Duration::seconds(config.token_skew_secs))
    }

    /// A cached token must stay valid for at least this long to be reused
    pub fn with_token_skew(mut self, skew: Duration) -> Self {
        self.token_skew = skew;
        self
    }

    /// Run a full sync and persist the resulting notes
    pub fn run(&self, credential: &Credential) -> Result<SyncReport, CoordinatorError> {
        let mut phase = SyncPhase::Idle;
        let result = self.run_phases(credential, &mut phase);
        if let Err(e) = &result {
            transition(&mut phase, SyncPhase::Failed);
            warn!("Sync for {} failed: {}", credential.account, e);
        }
        result
    }

    fn run_phases(
        &self,
        credential: &Credential,
        phase: &mut SyncPhase,
    ) -> Result<SyncReport, CoordinatorError> {
        let start = Instant::now();
        let artifacts = ArtifactStore::new(self.store);
        let cache = artifacts.token_cache();

        transition(phase, SyncPhase::AcquiringToken);
        let mut token = match cache.load(Utc::now() + self.token_skew)? {
            Some(token) => {
                debug!("Using cached session token {}...", token.log_prefix());
                token
            }
            None => self.acquire_token(&cache, credential)?,
        };

        transition(phase, SyncPhase::Syncing);
        let mut reauthenticated = false;
        let batch = loop {
            match self.engine.run(&token) {
                Ok(batch) => break batch,
                Err(e) if e.is_auth_failure() && !reauthenticated => {
                    warn!("Session token refused ({}), re-authenticating", e);
                    cache.invalidate()?;
                    transition(phase, SyncPhase::AcquiringToken);
                    token = self.acquire_token(&cache, credential)?;
                    reauthenticated = true;
                    transition(phase, SyncPhase::Syncing);
                }
                Err(e) => {
                    if e.is_auth_failure() {
                        cache.invalidate()?;
                    }
                    return Err(e.into());
                }
            }
        };

        transition(phase, SyncPhase::Building);
        let nodes_fetched = batch.nodes.len();
        let pages = batch.pages;
        let notes = build_notes(&batch);
        drop(batch);

        artifacts.save_notes(&notes)?;
        artifacts.save_sync_state(&SyncState::completed(&credential.account, notes.len()))?;

        transition(phase, SyncPhase::Done);
        let report = SyncReport {
            note_count: notes.len(),
            nodes_fetched,
            pages,
            reauthenticated,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Synced {} notes ({} nodes, {} pages) in {}ms",
            report.note_count, report.nodes_fetched, report.pages, report.duration_ms
        );
        Ok(report)
    }

    /// Exchange the credential and cache the result; on failure make sure
    /// no stale token is left behind.
    fn acquire_token(
        &self,
        cache: &TokenCache<'_>,
        credential: &Credential,
    ) -> Result<SessionToken, CoordinatorError> {
        match self.auth.exchange(credential) {
            Ok(token) => {
                cache.store(&token)?;
                Ok(token)
            }
            Err(e) => {
                if let Err(cache_err) = cache.invalidate() {
                    warn!("Failed to clear token cache: {:#}", cache_err);
                }
                Err(e.into())
            }
        }
    }
}

fn transition(phase: &mut SyncPhase, next: SyncPhase) {
    debug!("Sync phase {:?} -> {:?}", phase, next);
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{HttpResponse, ScriptedTransport};
    use crate::storage::{InMemoryStore, keys};

    const AUTH_URL: &str = "https://auth.test/auth";
    const NOTES_URL: &str = "https://notes.test/changes";

    fn coordinator<'a>(
        store: &'a InMemoryStore,
        transport: &Arc<ScriptedTransport>,
    ) -> SyncCoordinator<'a> {
        SyncCoordinator::new(
            store,
            AuthClient::new(transport.clone(), AUTH_URL),
            SyncEngine::new(transport.clone(), NOTES_URL),
        )
    }

    fn credential() -> Credential {
        Credential::new("user@example.com", "aas_et/master", "0123456789abcdef")
    }

    fn notes_page() -> HttpResponse {
        HttpResponse::ok(
            r#"{"nodes":[
                {"id":"n1","type":"NOTE","parentId":"root","title":"Todo"},
                {"id":"c1","type":"LIST_ITEM","parentId":"n1","text":"milk"}
            ]}"#,
        )
    }

    #[test]
    fn test_cached_token_skips_exchange() {
        let store = InMemoryStore::new();
        let transport = Arc::new(ScriptedTransport::new());
        TokenCache::new(&store)
            .store(&SessionToken::new("cached", Some(Utc::now() + Duration::hours(1))))
            .unwrap();
        transport.respond(NOTES_URL, notes_page());

        let report = coordinator(&store, &transport).run(&credential()).unwrap();

        assert_eq!(report.note_count, 1);
        assert!(!report.reauthenticated);
        assert!(transport.requests_to(AUTH_URL).is_empty());
        assert_eq!(
            transport.requests_to(NOTES_URL)[0].header_value("Authorization"),
            Some("OAuth cached")
        );
    }

    #[test]
    fn test_token_inside_skew_window_is_refreshed() {
        let store = InMemoryStore::new();
        let transport = Arc::new(ScriptedTransport::new());
        TokenCache::new(&store)
            .store(&SessionToken::new("nearly-expired", Some(Utc::now() + Duration::seconds(30))))
            .unwrap();
        transport
            .respond(AUTH_URL, HttpResponse::ok("Auth=fresh\nExpiresInDurationSec=3600\n"))
            .respond(NOTES_URL, notes_page());

        coordinator(&store, &transport).run(&credential()).unwrap();

        assert_eq!(transport.requests_to(AUTH_URL).len(), 1);
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_exchange_failure_clears_cache() {
        let store = InMemoryStore::new();
        let transport = Arc::new(ScriptedTransport::new());
        store.set(keys::AUTH_TOKEN, "stale").unwrap();
        store.set(keys::AUTH_TOKEN_EXPIRY, "1").unwrap();
        transport.respond(AUTH_URL, HttpResponse::new(403, "Error=BadAuthentication\n"));

        let err = coordinator(&store, &transport).run(&credential()).unwrap_err();

        assert!(matches!(err, CoordinatorError::Auth(AuthError::Rejected(_))));
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::AUTH_TOKEN_EXPIRY).unwrap(), None);
        assert!(transport.requests_to(NOTES_URL).is_empty());
    }

    #[test]
    fn test_server_error_is_not_retried() {
        let store = InMemoryStore::new();
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond(AUTH_URL, HttpResponse::ok("Auth=t1\n"))
            .respond(NOTES_URL, HttpResponse::new(503, "unavailable"));

        let err = coordinator(&store, &transport).run(&credential()).unwrap_err();

        assert!(matches!(
            err,
            CoordinatorError::Sync(SyncError::HttpStatus { status: 503, .. })
        ));
        assert_eq!(transport.requests_to(AUTH_URL).len(), 1);
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("t1"));
    }

    #[test]
    fn test_storage_error_message() {
        let err = CoordinatorError::from(anyhow::anyhow!("disk full").context("Failed to save notes"));
        assert_eq!(err.to_string(), "Storage error: Failed to save notes: disk full");
    }
}
