//! Shared wiring behind the `nebula` binary: loading or minting a notary key, and
//! picking a local-filesystem or remote-HTTP `Repository` depending on what the CLI
//! was given. The binary itself (`src/bin.rs`) only parses flags and dispatches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ed25519_dalek::SigningKey;
use nebula_auth::LocalNotary;
use nebula_client::Client;
use nebula_local::LocalRepository;
use nebula_remote::RemoteRepository;
use nebula_store::Repository;
use nebula_vers::Tag;
use rand::rngs::OsRng;

/// Loads the 32-byte seed at `path`, or generates and persists a fresh one if it
/// doesn't exist yet. The account tag is derived fresh on first run and stored
/// alongside the key so restarts keep the same identity.
pub fn load_or_generate_notary(key_path: &Path) -> Result<LocalNotary> {
    if key_path.exists() {
        let bytes = std::fs::read(key_path).with_context(|| format!("read notary key {}", key_path.display()))?;
        let (seed, account) = split_key_file(&bytes)?;
        let signing_key = SigningKey::from_bytes(&seed);
        Ok(LocalNotary::from_signing_key(signing_key, account))
    } else {
        let signing_key = SigningKey::generate(&mut OsRng);
        let account = Tag::generate();
        if let Some(parent) = key_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        std::fs::write(key_path, key_file_bytes(&signing_key, &account)).with_context(|| format!("write notary key {}", key_path.display()))?;
        Ok(LocalNotary::from_signing_key(signing_key, account))
    }
}

fn key_file_bytes(signing_key: &SigningKey, account: &Tag) -> Vec<u8> {
    let mut out = signing_key.to_bytes().to_vec();
    out.extend_from_slice(account.canonical().as_bytes());
    out
}

fn split_key_file(bytes: &[u8]) -> Result<([u8; 32], Tag)> {
    anyhow::ensure!(bytes.len() > 32, "notary key file is truncated");
    let seed: [u8; 32] = bytes[..32].try_into().expect("checked length");
    let account = Tag::from_canonical(String::from_utf8_lossy(&bytes[32..]).into_owned());
    Ok((seed, account))
}

/// Builds a `Client` atop either a `LocalRepository` rooted at `root` (no `remote`
/// given) or a `RemoteRepository` pointed at `remote`.
pub fn build_client(notary: Arc<LocalNotary>, root: &Path, remote: Option<&str>) -> Client {
    let repository: Arc<dyn Repository> = match remote {
        Some(base_url) => Arc::new(RemoteRepository::new(base_url.to_string(), notary.clone())),
        None => Arc::new(LocalRepository::new(root.to_path_buf())),
    };
    Client::new(notary, repository)
}

pub fn default_repository_root() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => Path::new(&home).join(".bali"),
        Err(_) => PathBuf::from(".bali"),
    }
}

pub fn default_key_path(root: &Path) -> PathBuf {
    root.join("notary.key")
}
