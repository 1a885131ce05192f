//! Deterministic cache keys for (url, width, quality) triples.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of `"{url}|{width}|{quality}"`, as 64 lowercase hex characters.
///
/// The integers never contain `|`, so reading the encoding from the right
/// recovers each field and distinct triples cannot collide on the same input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(url: &str, width: u32, quality: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update(format!("|{width}|{quality}").as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
