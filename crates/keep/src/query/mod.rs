//! Query API for display surfaces
//!
//! Read-only views over the persisted note set, plus the remembered
//! selection.

mod notes;
mod selection;

pub use notes::{NoteSummary, get_note, list_notes, list_summaries, select_note};
pub use selection::{SELECTION_FILE, Selection};
