//! Content fingerprints for cached bundles.

use sha2::{Digest, Sha256};

/// Length of a [`hash`] result in hex characters.
pub const HASH_HEX_LEN: usize = 64;

/// SHA-256 of `content` as lowercase hex.
///
/// Operates on raw bytes, so the result never depends on how the caller
/// would have decoded the content as text.
pub fn hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
