use std::fmt;

use sha2::{Digest, Sha256};

/// Composite cache key for a `(text, voice)` pair.
///
/// The text length is written in front of the text, so neither component can
/// contain a sequence that makes two different pairs render to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    composite: String,
    id: String,
}

impl CacheKey {
    pub fn new(text: &str, voice_id: &str) -> Self {
        let text = normalize_text(text);
        let voice_id = voice_id.trim();
        let composite = format!("{}:{}|{}", text.len(), text, voice_id);
        let id = hex::encode(Sha256::digest(composite.as_bytes()));
        Self { composite, id }
    }

    pub fn as_str(&self) -> &str {
        &self.composite
    }

    /// Hex SHA-256 of the composite key; used as the handle's URL segment.
    pub fn content_id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Log-friendly: the composite can be several kilobytes of script text.
        f.write_str(&self.id[..12])
    }
}

/// Text normalization applied before keying and generation.
pub fn normalize_text(text: &str) -> &str {
    text.trim()
}
