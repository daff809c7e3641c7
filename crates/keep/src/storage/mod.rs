//! Storage traits and implementations
//!
//! Everything keepsync persists is a string under a well-known key. The
//! [`KeyValueStore`] trait is that raw get/set/delete surface; the typed
//! layers ([`ArtifactStore`], [`TokenCache`]) fix the schema on top of it.

mod artifacts;
mod memory;
mod sqlite;
mod token_cache;
mod traits;

pub use artifacts::{ArtifactStore, keys};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use token_cache::TokenCache;
pub use traits::KeyValueStore;
