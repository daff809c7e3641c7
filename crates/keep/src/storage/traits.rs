//! Storage trait definitions

use anyhow::Result;

/// Raw string key-value storage shared by the app and its display surfaces
///
/// Implementations must be safe to share across threads; the sync
/// coordinator is the only writer of the note artifacts.
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    fn delete(&self, key: &str) -> Result<()>;

    /// All keys currently present, sorted
    fn keys(&self) -> Result<Vec<String>>;
}
