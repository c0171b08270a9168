//! The local filesystem binding of the `Repository` interface (spec.md §4.7):
//! a directory tree rooted at `<root>/repository/{citations,certificates,drafts,
//! documents,types,queues}/`, POSIX permission bits standing in for the
//! immutable/mutable distinction the wire protocol otherwise has to enforce in
//! software, and exclusive-create as the race-free primitive behind every
//! `AlreadyExists` check.

mod fsutil;
mod queue;
mod repository;

pub use repository::LocalRepository;
