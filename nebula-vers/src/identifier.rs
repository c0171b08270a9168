use serde::{Deserialize, Serialize};
use std::fmt;

use nebula_base::{Context, ErrorKind, Result};

use crate::Citation;

/// The flat key under which all namespace-specific stores address blobs: the
/// concatenation of canonical `tag` and canonical `version` (no separator).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reconstructs an identifier from its canonical `tag||version` string, e.g. a
    /// path segment the HTTP service has already received. Callers that have a
    /// `Citation` should use `extract_id` instead; this exists for the service side
    /// of spec.md §4.8, which only ever sees the already-concatenated string.
    pub fn from_raw(s: impl Into<String>) -> Identifier {
        Identifier(s.into())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct MissingSlot(&'static str);
impl fmt::Display for MissingSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "citation is missing its {} slot", self.0)
    }
}
impl std::error::Error for MissingSlot {}

/// Returns `canonical(tag) || canonical(version)`. Fails with `InvalidCitation` when
/// either slot is missing.
pub fn extract_id(citation: &Citation) -> Result<Identifier> {
    let tag = citation
        .tag
        .as_ref()
        .ok_or(MissingSlot("tag"))
        .context(ErrorKind::InvalidCitation, "extractId")?;
    let version = citation
        .version
        .as_ref()
        .ok_or(MissingSlot("version"))
        .context(ErrorKind::InvalidCitation, "extractId")?;
    Ok(Identifier(format!("{}{}", tag.canonical(), version.canonical())))
}
