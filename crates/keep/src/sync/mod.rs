//! Notes synchronization
//!
//! This module provides:
//! - The paginated changes-feed engine
//! - Note tree building from the raw node graph
//! - The coordinator that ties token, feed and storage together
//! - Refresh interval timing

mod coordinator;
mod engine;
mod timing;
mod tree;

pub use coordinator::{
    CoordinatorError, DEFAULT_TOKEN_SKEW_SECS, SyncCoordinator, SyncPhase, SyncReport,
};
pub use engine::{DEFAULT_MAX_PAGES, INITIAL_CURSOR, SyncBatch, SyncEngine, SyncError};
pub use timing::{refresh_due, time_until_refresh};
pub use tree::{NOTE_KIND, ROOT_PARENT, build_notes, build_notes_from, is_visible_top_level};
