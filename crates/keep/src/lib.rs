//! Keep crate - notes sync for a Google Keep account
//!
//! This crate provides:
//! - The device-login credential exchange and session token cache
//! - A paginated sync engine for the notes changes feed
//! - Note tree building from the raw node graph
//! - A sync coordinator that persists display notes
//! - Storage trait abstractions (in-memory and SQLite)
//! - Query API for display surfaces
//!
//! All network access goes through [`remote::HttpTransport`], so the whole
//! pipeline runs against scripted responses in tests.

pub mod config;
pub mod models;
pub mod query;
pub mod remote;
pub mod storage;
pub mod sync;
mod util;

pub use self::config::KeepConfig;
pub use models::{Credential, DisplayNote, SessionToken, SyncState};
pub use query::{NoteSummary, Selection, get_note, list_notes, list_summaries, select_note};
pub use remote::{
    AuthClient, AuthError, HttpTransport, ScriptedTransport, TransportError, UreqTransport,
    api::RawNode,
};
pub use storage::{ArtifactStore, InMemoryStore, KeyValueStore, SqliteStore, TokenCache};
pub use sync::{
    // Sync execution
    CoordinatorError, SyncBatch, SyncCoordinator, SyncEngine, SyncError, SyncReport,
    build_notes,
    // Refresh timing
    refresh_due, time_until_refresh,
};
