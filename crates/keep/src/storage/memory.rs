//! In-memory storage implementation
//!
//! Used by tests and for dry runs that should not touch the database.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

use super::KeyValueStore;

/// In-memory implementation of KeyValueStore
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().unwrap();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("email").unwrap(), None);

        store.set("email", "a@b.c").unwrap();
        store.set("email", "d@e.f").unwrap();
        assert_eq!(store.get("email").unwrap().as_deref(), Some("d@e.f"));

        store.delete("email").unwrap();
        store.delete("email").unwrap();
        assert_eq!(store.get("email").unwrap(), None);
    }

    #[test]
    fn test_keys_sorted() {
        let store = InMemoryStore::new();
        store.set("notes", "[]").unwrap();
        store.set("authToken", "t").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["authToken", "notes"]);
    }
}
