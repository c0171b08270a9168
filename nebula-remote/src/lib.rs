//! The HTTP binding of `Repository` (spec.md §4.8): `http_client` issues
//! credentialed requests to a peer; `service` mounts the matching router atop a
//! `nebula_local::LocalRepository` (or any other `Repository`).

mod credentials;
mod http_client;
mod service;

pub use http_client::RemoteRepository;
pub use service::{build_router, AppState};
