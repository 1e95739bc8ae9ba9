//! Content-hash cache keys

use sha2::{Digest, Sha256};

/// Build a cache key for `text` under an analysis kind and schema version.
///
/// The text is trimmed before hashing so that inputs differing only in
/// surrounding whitespace share an entry. Bump `schema_version` whenever the
/// stored value shape changes.
pub fn content_key(kind: &str, schema_version: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    format!("{}:v{}:{:x}", kind, schema_version, hasher.finalize())
}
