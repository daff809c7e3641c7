//! Flatten the raw node graph into display notes
//!
//! The feed is a flat list of records linked by `parentId`. A note's
//! visible content usually lives in its children (list items), so each
//! top-level note gets its children's text folded into its own.

use std::collections::HashMap;

use super::SyncBatch;
use crate::models::DisplayNote;
use crate::remote::api::RawNode;

/// `parentId` of top-level notes
pub const ROOT_PARENT: &str = "root";

/// `type` of a plain note
pub const NOTE_KIND: &str = "NOTE";

/// Build the display notes for a finished batch.
///
/// Top-level notes keep their relative order from the batch; child texts
/// are trimmed, empties dropped, and the rest joined with newlines.
pub fn build_notes(batch: &SyncBatch) -> Vec<DisplayNote> {
    build_notes_from(&batch.nodes)
}

/// Same as [`build_notes`] over a bare node slice
pub fn build_notes_from(nodes: &[RawNode]) -> Vec<DisplayNote> {
    let mut child_texts: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent_id.as_deref()
            && let Some(text) = node.text.as_deref().map(str::trim)
            && !text.is_empty()
        {
            child_texts.entry(parent).or_default().push(text);
        }
    }

    nodes
        .iter()
        .filter(|node| is_visible_top_level(node))
        .map(|node| {
            let text = child_texts
                .get(node.id.as_str())
                .map(|texts| texts.join("\n"))
                .unwrap_or_default();
            DisplayNote::new(node.id.clone(), node.title.clone(), Some(text))
        })
        .collect()
}

/// Whether a node is a note the user should see in lists
pub fn is_visible_top_level(node: &RawNode) -> bool {
    let is_note = node.kind.as_deref().is_none_or(|kind| kind == NOTE_KIND);
    let is_top_level = node
        .parent_id
        .as_deref()
        .is_none_or(|parent| parent == ROOT_PARENT);
    let is_archived = node.is_archived == Some(true);

    is_note && is_top_level && !is_archived && !is_trashed(node)
}

/// A trashed node carries a trash date; the service writes the epoch
/// (`1970-01-01T00:00:00.000Z`) for nodes that were never trashed.
fn is_trashed(node: &RawNode) -> bool {
    node.timestamps
        .as_ref()
        .and_then(|ts| ts.trashed.as_deref())
        .and_then(leading_year)
        .is_some_and(|year| year > 1970)
}

fn leading_year(timestamp: &str) -> Option<u32> {
    let year = timestamp.trim().get(..4)?;
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::api::NodeTimestamps;

    fn note(id: &str) -> RawNode {
        RawNode {
            id: id.to_string(),
            kind: Some(NOTE_KIND.to_string()),
            parent_id: Some(ROOT_PARENT.to_string()),
            ..Default::default()
        }
    }

    fn child(id: &str, parent: &str, text: &str) -> RawNode {
        RawNode {
            id: id.to_string(),
            kind: Some("LIST_ITEM".to_string()),
            parent_id: Some(parent.to_string()),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn trashed_at(mut node: RawNode, trashed: &str) -> RawNode {
        node.timestamps = Some(NodeTimestamps {
            trashed: Some(trashed.to_string()),
            ..Default::default()
        });
        node
    }

    #[test]
    fn test_children_folded_into_text() {
        let mut top = note("n1");
        top.title = Some("Shopping".into());
        let nodes = vec![top, child("c1", "n1", "milk"), child("c2", "n1", "")];

        let notes = build_notes_from(&nodes);
        assert_eq!(
            notes,
            vec![DisplayNote::new("n1", Some("Shopping".into()), Some("milk".into()))]
        );
    }

    #[test]
    fn test_child_order_and_trimming() {
        let nodes = vec![
            child("c1", "n1", "  eggs \n"),
            note("n1"),
            child("c2", "n1", "   "),
            child("c3", "n1", "bread"),
        ];
        let notes = build_notes_from(&nodes);
        assert_eq!(notes[0].text.as_deref(), Some("eggs\nbread"));
    }

    #[test]
    fn test_no_children_gives_empty_text() {
        let notes = build_notes_from(&[note("n1")]);
        assert_eq!(notes[0].text.as_deref(), Some(""));
    }

    #[test]
    fn test_own_text_is_replaced_by_children() {
        let mut top = note("n1");
        top.text = Some("stale".into());
        let notes = build_notes_from(&[top]);
        assert_eq!(notes[0].text.as_deref(), Some(""));
    }

    #[test]
    fn test_archived_and_trashed_excluded() {
        let mut archived = note("archived");
        archived.is_archived = Some(true);
        let trashed = trashed_at(note("trashed"), "2024-01-01T10:00:00.000Z");
        let never_trashed = trashed_at(note("kept"), "1970-01-01T00:00:00.000Z");

        let notes = build_notes_from(&[archived, trashed, never_trashed]);
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["kept"]);
    }

    #[test]
    fn test_type_and_parent_filters() {
        let mut untyped = note("untyped");
        untyped.kind = None;
        let mut orphan = note("no-parent");
        orphan.parent_id = None;
        let mut list = note("list");
        list.kind = Some("LIST".into());
        let nested = child("nested", "untyped", "item");

        let notes = build_notes_from(&[untyped, orphan, list, nested]);
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["untyped", "no-parent"]);
        assert_eq!(notes[0].text.as_deref(), Some("item"));
    }

    #[test]
    fn test_order_preserved() {
        let nodes = vec![note("b"), note("a"), note("c")];
        let ids: Vec<String> = build_notes_from(&nodes).into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_leading_year() {
        assert_eq!(leading_year("2024-01-01T00:00:00Z"), Some(2024));
        assert_eq!(leading_year("1970-01-01T00:00:00.000Z"), Some(1970));
        assert_eq!(leading_year(""), None);
        assert_eq!(leading_year("soon"), None);
    }
}
