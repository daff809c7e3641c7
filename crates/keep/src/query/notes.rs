//! Note query functions

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::DisplayNote;
use crate::storage::ArtifactStore;
use crate::util::excerpt;

/// Length of the body preview in summaries
const PREVIEW_CHARS: usize = 80;

/// One line of a note listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    /// Note ID
    pub id: String,
    /// Title to show (see [`DisplayNote::display_title`])
    pub title: String,
    /// First line of the body, shortened
    pub preview: String,
}

impl From<&DisplayNote> for NoteSummary {
    fn from(note: &DisplayNote) -> Self {
        let first_line = note.body().lines().next().unwrap_or_default();
        Self {
            id: note.id.clone(),
            title: note.display_title().to_string(),
            preview: excerpt(first_line.trim(), PREVIEW_CHARS),
        }
    }
}

/// All persisted notes, in sync order
pub fn list_notes(artifacts: &ArtifactStore<'_>) -> Result<Vec<DisplayNote>> {
    artifacts.load_notes()
}

/// Summaries of all persisted notes, in sync order
pub fn list_summaries(artifacts: &ArtifactStore<'_>) -> Result<Vec<NoteSummary>> {
    Ok(list_notes(artifacts)?.iter().map(NoteSummary::from).collect())
}

/// A single persisted note by ID
pub fn get_note(artifacts: &ArtifactStore<'_>, id: &str) -> Result<Option<DisplayNote>> {
    Ok(list_notes(artifacts)?.into_iter().find(|note| note.id == id))
}

/// The note a display surface should show: the selected one if it still
/// exists, otherwise the first.
pub fn select_note<'n>(notes: &'n [DisplayNote], selected_id: Option<&str>) -> Option<&'n DisplayNote> {
    selected_id
        .and_then(|id| notes.iter().find(|note| note.id == id))
        .or_else(|| notes.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn sample() -> Vec<DisplayNote> {
        vec![
            DisplayNote::new("a", Some("Groceries".into()), Some("milk\neggs".into())),
            DisplayNote::new("b", None, Some("call mom\nafter work".into())),
            DisplayNote::new("c", None, Some(String::new())),
        ]
    }

    #[test]
    fn test_list_and_get() {
        let store = InMemoryStore::new();
        let artifacts = ArtifactStore::new(&store);
        assert!(list_notes(&artifacts).unwrap().is_empty());

        artifacts.save_notes(&sample()).unwrap();
        assert_eq!(list_notes(&artifacts).unwrap(), sample());
        assert_eq!(get_note(&artifacts, "b").unwrap().unwrap().body(), "call mom\nafter work");
        assert_eq!(get_note(&artifacts, "missing").unwrap(), None);
    }

    #[test]
    fn test_summaries() {
        let store = InMemoryStore::new();
        let artifacts = ArtifactStore::new(&store);
        artifacts.save_notes(&sample()).unwrap();

        let summaries = list_summaries(&artifacts).unwrap();
        let titles: Vec<&str> = summaries.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Groceries", "call mom", "Untitled"]);
        assert_eq!(summaries[0].preview, "milk");
        assert_eq!(summaries[2].preview, "");
    }

    #[test]
    fn test_select_note() {
        let notes = sample();
        assert_eq!(select_note(&notes, Some("b")).map(|n| n.id.as_str()), Some("b"));
        assert_eq!(select_note(&notes, Some("gone")).map(|n| n.id.as_str()), Some("a"));
        assert_eq!(select_note(&notes, None).map(|n| n.id.as_str()), Some("a"));
        assert_eq!(select_note(&[], Some("a")), None);
    }
}
