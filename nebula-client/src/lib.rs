//! The Client API (spec.md §4.6): the public surface orchestrating
//! notarize → validate → cache → store. This is component 6 of the design; it is
//! the only thing most embedders ever call directly.

mod client;
mod messaging;

pub use client::Client;
