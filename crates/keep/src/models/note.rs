//! Flattened note as shown by display surfaces

use serde::{Deserialize, Serialize};

/// A top-level note with its child items folded into `text`
///
/// This is the record persisted for the presentation layer; everything
/// else from a sync run is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayNote {
    pub id: String,
    pub title: Option<String>,
    pub text: Option<String>,
}

impl DisplayNote {
    pub fn new(id: impl Into<String>, title: Option<String>, text: Option<String>) -> Self {
        Self {
            id: id.into(),
            title,
            text,
        }
    }

    /// Title to show in lists: the note title, else the first line of its
    /// text, else "Untitled".
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.text
                    .as_deref()
                    .and_then(|t| t.lines().map(str::trim).find(|l| !l.is_empty()))
            })
            .unwrap_or("Untitled")
    }

    /// Body text, empty when missing
    pub fn body(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}
