//! Identifiers, versions, and the citations that name specific content by digest.
//!
//! This is component 1 of the design: compute canonical IDs from `(tag, version)`
//! and compute next-version strings at a given level. Everything here is CPU-only;
//! nothing in this crate suspends.

mod citation;
mod digest;
mod identifier;
mod tag;
mod version;

pub use citation::Citation;
pub use digest::Digest;
pub use identifier::{extract_id, Identifier};
pub use tag::Tag;
pub use version::{is_valid_next_version, next_version, Version};

/// Well-known queue tags, named in the design's Client API component.
pub const SEND_QUEUE: &str = "JXT095QY01HBLHPAW04ZR5WSH41MWG4H";
pub const EVENT_QUEUE: &str = "3RMGDVN7D6HLAPFXQNPF7DV71V3MAL43";
