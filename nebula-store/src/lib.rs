//! The Repository Interface (spec.md §4.3) and the Bounded Caches (§4.5).
//!
//! This crate has no opinion on where the bytes actually live — `nebula-local` and
//! `nebula-remote` each implement `Repository` — and no opinion on what's inside a
//! blob; `nebula-valid`/`nebula-client` parse and validate what comes back.

mod cache;
mod repository;

pub use cache::FifoCache;
pub use repository::Repository;

/// The fixed cache caps from spec.md §4.5/§6: implementations may expose these as
/// configuration but must default to these values.
pub const CERTIFICATE_CACHE_CAP: usize = 64;
pub const DOCUMENT_CACHE_CAP: usize = 128;
pub const TYPE_CACHE_CAP: usize = 256;
