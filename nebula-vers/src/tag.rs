use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, high-entropy unique identifier. Equality is structural: two tags name
/// the same entity iff their canonical strings are equal.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Tag(String);

impl Tag {
    /// Generates a fresh tag with at least 128 bits of entropy (20 random bytes,
    /// base64url-encoded without padding: 160 bits).
    pub fn generate() -> Tag {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        Tag(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps an already-canonical tag string, e.g. a well-known queue tag.
    pub fn from_canonical(s: impl Into<String>) -> Tag {
        Tag(s.into())
    }

    pub fn canonical(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_tags_are_unique_and_long_enough() {
        let a = Tag::generate();
        let b = Tag::generate();
        assert_ne!(a, b);
        assert!(a.canonical().len() >= 22); // 160 bits base64url, no padding
    }

    #[test]
    fn equality_is_structural() {
        let a = Tag::from_canonical("ABC");
        let b = Tag::from_canonical("ABC");
        assert_eq!(a, b);
    }
}
