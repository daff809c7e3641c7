//! Domain models shared by the sync pipeline and display surfaces

mod credential;
mod note;
mod sync_state;

pub use credential::{Credential, SessionToken};
pub use note::DisplayNote;
pub use sync_state::SyncState;
