//! The note a display surface last showed
//!
//! Kept as a small JSON file in the config directory rather than in the
//! artifact database, so a logout or a full resync does not reset it.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::notes::select_note;
use crate::models::DisplayNote;

/// Selection filename in the keepsync config directory
pub const SELECTION_FILE: &str = "selection.json";

/// Last selected note
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub note_id: Option<String>,
}

impl Selection {
    pub fn new(note_id: impl Into<String>) -> Self {
        Self {
            note_id: Some(note_id.into()),
        }
    }

    /// Selection from the config directory; empty if missing or unreadable
    pub fn load() -> Self {
        config::config_path(SELECTION_FILE)
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Selection from `path`; empty if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        config::load_json_file(path).unwrap_or_else(|e| {
            debug!("Ignoring unreadable selection: {:#}", e);
            Self::default()
        })
    }

    /// Write the selection into the config directory
    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(SELECTION_FILE, self).context("Failed to save selection")
    }

    /// Write the selection to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        config::save_json_file(path, self).context("Failed to save selection")
    }

    /// The selected note if it still exists, else the first one
    pub fn pick<'n>(&self, notes: &'n [DisplayNote]) -> Option<&'n DisplayNote> {
        select_note(notes, self.note_id.as_deref())
    }
}
