//! The document-language component tree.
//!
//! spec.md treats the bytes-level syntax of the document language as an external
//! collaborator's concern: "a parseable string whose parser returns a component tree
//! with `getValue(name)` / `getParameters()`". This crate supplies that component
//! tree (an opaque tagged-variant parse tree, per the redesign note in spec.md §9)
//! and the one canonical serializer every caller shares, plus the fixed-shape
//! notarized-document envelope that wraps a component.

mod catalog;
mod component;
mod document;

pub use catalog::Catalog;
pub use component::Component;
pub use document::NotarizedDocument;

/// A certificate is a notarized document whose component carries
/// `{account, publicKey, protocol}` parameters; a self-signed certificate is its own
/// certificate (`certificate` slot is `None`).
pub type Certificate = NotarizedDocument;

/// Parameters are just a catalog read off a component's top level, per spec.md §3:
/// "a mapping that at minimum may carry `{tag, version, permissions, previous}`".
pub type Parameters = Catalog;
