//! Content hashing for workflow documents

use xxhash_rust::xxh3::xxh3_64;

/// Hash the full text of a workflow document.
///
/// Uses xxh3 (fast, non-cryptographic). Used to detect edits between a
/// checkpoint and a resume, never for security.
/// Format: `xxh3:XXXXXXXXXXXXXXXX` (16 hex chars)
pub fn content_hash(text: &str) -> String {
    let hash = xxh3_64(text.as_bytes());
    format!("xxh3:{:016x}", hash)
}
