//! The notary interface: the shape the core depends on, treated as an external
//! collaborator per spec.md §1/§4.2. The actual signing algorithm and key material
//! are someone else's concern; this crate only fixes the five operations the rest of
//! the system calls, plus one concrete, testable notary used to bootstrap and drive
//! the scenarios in spec.md §8.

mod local;
mod notary;

pub use local::LocalNotary;
pub use notary::Notary;
