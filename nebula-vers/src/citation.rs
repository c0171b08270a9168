use serde::{Deserialize, Serialize};

use crate::{Digest, Tag, Version};

/// An immutable record citing a specific piece of content: `{protocol, tag, version,
/// digest, timestamp?}`. Two citations cite the same document iff they agree on
/// `(tag, version, digest)`. `tag`/`version` are optional at the type level because a
/// bootstrap self-signed certificate's own `certificate` slot, and a fresh remote
/// credential, both cite without a resolvable identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub protocol: String,
    pub tag: Option<Tag>,
    pub version: Option<Version>,
    pub digest: Digest,
    pub timestamp: Option<i64>,
}

impl Citation {
    pub fn new(protocol: impl Into<String>, tag: Tag, version: Version, digest: Digest) -> Citation {
        Citation {
            protocol: protocol.into(),
            tag: Some(tag),
            version: Some(version),
            digest,
            timestamp: None,
        }
    }

    /// A name-only citation: a tag and version with no integrity binding yet.
    pub fn name_only(protocol: impl Into<String>, tag: Tag, version: Version) -> Citation {
        Citation {
            protocol: protocol.into(),
            tag: Some(tag),
            version: Some(version),
            digest: Digest::None,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Citation {
        self.timestamp = Some(timestamp);
        self
    }

    /// Two citations cite the same document iff they agree on `(tag, version,
    /// digest)`. `protocol`/`timestamp` are not part of identity.
    pub fn cites_same_document(&self, other: &Citation) -> bool {
        self.tag == other.tag && self.version == other.version && self.digest == other.digest
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_ignores_protocol_and_timestamp() {
        let tag = Tag::from_canonical("T1");
        let version = Version::parse("v1").unwrap();
        let a = Citation::new("v1.0", tag.clone(), version.clone(), Digest::from_bytes([1; 32]))
            .with_timestamp(100);
        let b = Citation::new("v2.0", tag, version, Digest::from_bytes([1; 32])).with_timestamp(200);
        assert!(a.cites_same_document(&b));
    }

    #[test]
    fn differing_digest_is_a_different_document() {
        let tag = Tag::from_canonical("T1");
        let version = Version::parse("v1").unwrap();
        let a = Citation::new("v1.0", tag.clone(), version.clone(), Digest::from_bytes([1; 32]));
        let b = Citation::new("v1.0", tag, version, Digest::from_bytes([2; 32]));
        assert!(!a.cites_same_document(&b));
    }
}
