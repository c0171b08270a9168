use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

/// The cryptographic hash of cited content, or the `NONE` sentinel marking a
/// citation used only as a name (no integrity binding yet).
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Digest {
    None,
    Sha256([u8; 32]),
}

impl Digest {
    pub fn is_none(&self) -> bool {
        matches!(self, Digest::None)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Digest {
        Digest::Sha256(bytes)
    }

    /// Hashes content bytes into a fresh digest. This is the one place the notary
    /// interface's `cite` operation (spec.md §4.2) and the repository's tamper
    /// check (§4.4 step 4, §8 P7) compute a digest from raw bytes.
    pub fn hash(bytes: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Digest::Sha256(hasher.finalize().into())
    }

    pub fn canonical(&self) -> String {
        match self {
            Digest::None => "none".to_string(),
            Digest::Sha256(bytes) => format!("sha256:{}", hex::encode(bytes)),
        }
    }

    /// Constant-time comparison, as `citationMatches` requires (spec.md §4.2).
    pub fn matches(&self, other: &Digest) -> bool {
        match (self, other) {
            (Digest::None, Digest::None) => true,
            (Digest::Sha256(a), Digest::Sha256(b)) => a.ct_eq(b).into(),
            _ => false,
        }
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
