use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nebula_base::{Error, ErrorKind, Result};
use rand::Rng;

use crate::fsutil;

/// Enqueues `content` as a freshly-named file under `dir/`. The filename itself
/// carries no meaning (queues are unordered multisets, spec.md §4.3); a random
/// 128-bit suffix just keeps concurrent enqueuers from colliding.
pub fn enqueue(dir: &Path, content: &[u8]) -> Result<()> {
    fsutil::ensure_dir(dir).map_err(|e| Error::new(ErrorKind::ServerError, "enqueue").with_cause(e))?;
    let name = random_file_name();
    fsutil::create_immutable(&dir.join(name), content, "enqueue")
}

/// Picks a queued message uniformly at random and removes it, returning its
/// content. At-most-once delivery (spec.md I5) rests entirely on `remove_file`
/// being atomic: whichever racing dequeuer's unlink actually removes the
/// directory entry is the only one that gets the message. A competitor that loses
/// the race sees `NotFound` and simply retries against the rest of the listing.
pub fn dequeue(dir: &Path) -> Result<Option<Vec<u8>>> {
    loop {
        let mut entries = fsutil::list_entries(dir).map_err(|e| Error::new(ErrorKind::ServerError, "dequeue").with_cause(e))?;
        if entries.is_empty() {
            return Ok(None);
        }
        let index = rand::thread_rng().gen_range(0..entries.len());
        let path = entries.swap_remove(index);
        match claim(&path) {
            Ok(Some(content)) => return Ok(Some(content)),
            Ok(None) => continue, // another dequeuer won the race; try the rest of the listing
            Err(e) => return Err(Error::new(ErrorKind::ServerError, "dequeue").with_cause(e)),
        }
    }
}

/// Reads then unlinks a single queued file. If either step loses a race against a
/// concurrent dequeuer (file vanished under us), returns `Ok(None)` rather than an
/// error — that's the expected outcome of losing the random pick, not a failure.
fn claim(path: &PathBuf) -> io::Result<Option<Vec<u8>>> {
    let bytes = match fs::read(path) {
        Ok(mut bytes) => {
            if bytes.last() == Some(&b'\n') {
                bytes.pop();
            }
            bytes
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    match fs::remove_file(path) {
        Ok(()) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound || e.kind() == io::ErrorKind::PermissionDenied => Ok(None),
        Err(e) => Err(e),
    }
}

fn random_file_name() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill(&mut bytes);
    format!("{}.bali", URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dequeue_on_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let queue_dir = dir.path().join("queues").join("nonexistent");
        assert_eq!(dequeue(&queue_dir).unwrap(), None);
    }

    #[test]
    fn enqueue_then_dequeue_round_trips_and_then_empties() {
        let dir = tempfile::tempdir().unwrap();
        let queue_dir = dir.path().join("Q");
        enqueue(&queue_dir, b"payload").unwrap();
        assert_eq!(dequeue(&queue_dir).unwrap(), Some(b"payload".to_vec()));
        assert_eq!(dequeue(&queue_dir).unwrap(), None);
    }

    #[test]
    fn every_enqueued_message_is_eventually_delivered_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let queue_dir = dir.path().join("Q");
        for i in 0..10 {
            enqueue(&queue_dir, format!("m{i}").as_bytes()).unwrap();
        }
        let mut seen = std::collections::HashSet::new();
        while let Some(m) = dequeue(&queue_dir).unwrap() {
            assert!(seen.insert(m), "message delivered twice");
        }
        assert_eq!(seen.len(), 10);
    }
}
