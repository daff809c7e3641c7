//! Small helpers shared across modules

use rand::RngCore;
use rand::rngs::OsRng;

/// A random 64-bit value from the operating system's generator, for session
/// and device identifiers.
pub(crate) fn random_u64() -> u64 {
    OsRng.next_u64()
}

/// First `max` characters of a string, for log and error excerpts.
pub(crate) fn excerpt(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
