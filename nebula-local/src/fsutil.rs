use std::fs;
use std::io;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use nebula_base::{Error, ErrorKind, Result};

/// Directories are `0700`; immutable-namespace files are `0400`; drafts and queued
/// messages are `0600` (spec.md §4.7).
pub const DIR_MODE: u32 = 0o700;
pub const IMMUTABLE_FILE_MODE: u32 = 0o400;
pub const MUTABLE_FILE_MODE: u32 = 0o600;

/// `/` → `_`, the one sanitization rule spec.md §4.7 requires for citation names
/// (identifiers never contain `/`, so this only matters for that namespace).
pub fn sanitize_name(name: &str) -> String {
    name.replace('/', "_")
}

/// `create_dir_all` is already idempotent and safe under concurrent callers
/// (spec.md §4.7: "implementations MUST tolerate races where multiple processes
/// try to create the same directory") — it succeeds whether or not the directory
/// already existed, and only errors if a path component exists as a non-directory.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)?;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(DIR_MODE);
    fs::set_permissions(path, perms)
}

pub fn read_blob(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(mut bytes) => {
            // Every stored file ends with a single POSIX newline (spec.md §4.7);
            // strip it back off so callers see exactly the bytes they wrote.
            if bytes.last() == Some(&b'\n') {
                bytes.pop();
            }
            Ok(Some(bytes))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn path_exists(path: &Path) -> bool {
    path.exists()
}

/// Exclusive-create semantics: fails with `AlreadyExists` iff the file already
/// existed at the instant of the write, per spec.md §4.7's preference for an
/// exclusive-create primitive over probe-then-write.
pub fn create_immutable(path: &Path, content: &[u8], operation: &'static str) -> Result<()> {
    write_exclusive(path, content, IMMUTABLE_FILE_MODE, operation)
}

pub fn save_mutable(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut bytes = content.to_vec();
    bytes.push(b'\n');
    fs::write(path, &bytes)?;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(MUTABLE_FILE_MODE);
    fs::set_permissions(path, perms)
}

fn write_exclusive(path: &Path, content: &[u8], mode: u32, operation: &'static str) -> Result<()> {
    let mut bytes = content.to_vec();
    bytes.push(b'\n');
    let result = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path);
    match result {
        Ok(mut file) => {
            use std::io::Write;
            file.write_all(&bytes).map_err(|e| Error::new(ErrorKind::ServerError, operation).with_cause(e))?;
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(Error::new(ErrorKind::AlreadyExists, operation).with_identifier(path.display().to_string()))
        }
        Err(e) => Err(Error::new(ErrorKind::ServerError, operation).with_cause(e)),
    }
}

/// Idempotent: absent is success (spec.md §7).
pub fn delete_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

pub fn list_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        out.push(entry?.path());
    }
    Ok(out)
}
