use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use nebula_base::{err, Error, ErrorKind, Result};
use nebula_store::Repository;
use nebula_vers::Identifier;
use tracing::info;

use crate::fsutil;
use crate::queue;

/// The directory-tree filesystem binding of spec.md §4.7. Blocking filesystem work
/// runs on tokio's blocking pool so every `Repository` call stays a genuine
/// suspension point (spec.md §5) without tying up the async executor.
pub struct LocalRepository {
    root: PathBuf,
    initialized: OnceLock<Result<()>>,
}

impl LocalRepository {
    /// Does not touch the filesystem; directories are created lazily on first use
    /// via the idempotent one-shot guard below.
    pub fn new(root: impl Into<PathBuf>) -> LocalRepository {
        LocalRepository {
            root: root.into(),
            initialized: OnceLock::new(),
        }
    }

    /// Defaults to `<user-home>/.bali/` when the caller passes no directory
    /// (spec.md §6).
    pub fn open_default() -> Result<LocalRepository> {
        let home = std::env::var("HOME").map_err(|e| Error::new(ErrorKind::InvalidParameter, "openDefault").with_cause(e))?;
        Ok(LocalRepository::new(Path::new(&home).join(".bali")))
    }

    fn repository_root(&self) -> PathBuf {
        self.root.join("repository")
    }

    /// Re-specifies the source's self-disabling `initializeAPI` (spec.md §9) as an
    /// idempotent, thread-safe one-shot: the first caller creates the namespace
    /// directories, every later caller (even concurrently, even from another
    /// process racing on the same directories) gets a no-op.
    fn ensure_initialized(&self) -> Result<()> {
        self.initialized
            .get_or_init(|| {
                info!(root = %self.root.display(), "initializing local repository");
                let base = self.repository_root();
                for dir in ["citations", "certificates", "drafts", "documents", "types", "queues"] {
                    fsutil::ensure_dir(&base.join(dir))
                        .map_err(|e| Error::new(ErrorKind::ServerError, "initializeAPI").with_cause(e))?;
                }
                Ok(())
            })
            .as_ref()
            .map(|_| ())
            .map_err(|e| Error::new(e.kind(), "initializeAPI").with_cause(err(e.to_string())))
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.repository_root().join(namespace)
    }

    fn citation_path(&self, name: &str) -> PathBuf {
        self.namespace_dir("citations").join(format!("{}.bali", fsutil::sanitize_name(name)))
    }

    fn identifier_path(&self, namespace: &str, id: &Identifier) -> PathBuf {
        self.namespace_dir(namespace).join(format!("{}.bali", id.as_str()))
    }

    fn queue_dir(&self, queue_id: &str) -> PathBuf {
        self.namespace_dir("queues").join(fsutil::sanitize_name(queue_id))
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_initialized()?;
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| Error::new(ErrorKind::ServerError, "blockingFsCall").with_cause(e))?
    }
}

#[async_trait]
impl Repository for LocalRepository {
    async fn citation_exists(&self, name: &str) -> Result<bool> {
        let path = self.citation_path(name);
        self.blocking(move || Ok(fsutil::path_exists(&path))).await
    }

    async fn fetch_citation(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.citation_path(name);
        self.blocking(move || fsutil::read_blob(&path).map_err(|e| Error::new(ErrorKind::ServerError, "fetchCitation").with_cause(e)))
            .await
    }

    async fn create_citation(&self, name: &str, blob: Vec<u8>) -> Result<()> {
        let path = self.citation_path(name);
        self.blocking(move || fsutil::create_immutable(&path, &blob, "createCitation")).await
    }

    async fn certificate_exists(&self, id: &Identifier) -> Result<bool> {
        let path = self.identifier_path("certificates", id);
        self.blocking(move || Ok(fsutil::path_exists(&path))).await
    }

    async fn fetch_certificate(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
        let path = self.identifier_path("certificates", id);
        self.blocking(move || fsutil::read_blob(&path).map_err(|e| Error::new(ErrorKind::ServerError, "fetchCertificate").with_cause(e)))
            .await
    }

    async fn create_certificate(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
        let path = self.identifier_path("certificates", id);
        self.blocking(move || fsutil::create_immutable(&path, &blob, "createCertificate")).await
    }

    async fn draft_exists(&self, id: &Identifier) -> Result<bool> {
        let path = self.identifier_path("drafts", id);
        self.blocking(move || Ok(fsutil::path_exists(&path))).await
    }

    async fn fetch_draft(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
        let path = self.identifier_path("drafts", id);
        self.blocking(move || fsutil::read_blob(&path).map_err(|e| Error::new(ErrorKind::ServerError, "fetchDraft").with_cause(e)))
            .await
    }

    async fn save_draft(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
        let path = self.identifier_path("drafts", id);
        self.blocking(move || fsutil::save_mutable(&path, &blob).map_err(|e| Error::new(ErrorKind::ServerError, "saveDraft").with_cause(e)))
            .await
    }

    async fn delete_draft(&self, id: &Identifier) -> Result<()> {
        let path = self.identifier_path("drafts", id);
        self.blocking(move || fsutil::delete_if_present(&path).map_err(|e| Error::new(ErrorKind::ServerError, "deleteDraft").with_cause(e)))
            .await
    }

    async fn document_exists(&self, id: &Identifier) -> Result<bool> {
        let path = self.identifier_path("documents", id);
        self.blocking(move || Ok(fsutil::path_exists(&path))).await
    }

    async fn fetch_document(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
        let path = self.identifier_path("documents", id);
        self.blocking(move || fsutil::read_blob(&path).map_err(|e| Error::new(ErrorKind::ServerError, "fetchDocument").with_cause(e)))
            .await
    }

    async fn create_document(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
        let path = self.identifier_path("documents", id);
        self.blocking(move || fsutil::create_immutable(&path, &blob, "createDocument")).await
    }

    async fn type_exists(&self, id: &Identifier) -> Result<bool> {
        let path = self.identifier_path("types", id);
        self.blocking(move || Ok(fsutil::path_exists(&path))).await
    }

    async fn fetch_type(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
        let path = self.identifier_path("types", id);
        self.blocking(move || fsutil::read_blob(&path).map_err(|e| Error::new(ErrorKind::ServerError, "fetchType").with_cause(e)))
            .await
    }

    async fn create_type(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
        let path = self.identifier_path("types", id);
        self.blocking(move || fsutil::create_immutable(&path, &blob, "createType")).await
    }

    async fn enqueue(&self, queue_id: &str, blob: Vec<u8>) -> Result<()> {
        let dir = self.queue_dir(queue_id);
        self.blocking(move || queue::enqueue(&dir, &blob)).await
    }

    async fn dequeue(&self, queue_id: &str) -> Result<Option<Vec<u8>>> {
        let dir = self.queue_dir(queue_id);
        self.blocking(move || queue::dequeue(&dir)).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nebula_vers::{Citation, Digest, Tag, Version};

    fn identifier() -> Identifier {
        let citation = Citation::new("v1.0", Tag::from_canonical("T1"), Version::parse("v1").unwrap(), Digest::None);
        nebula_vers::extract_id(&citation).unwrap()
    }

    #[tokio::test]
    async fn immutable_create_then_fetch_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let id = identifier();
        repo.create_document(&id, b"hello".to_vec()).await.unwrap();
        let fetched = repo.fetch_document(&id).await.unwrap();
        assert_eq!(fetched, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn duplicate_immutable_create_fails_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let id = identifier();
        repo.create_document(&id, b"hello".to_vec()).await.unwrap();
        let err = repo.create_document(&id, b"hello again".to_vec()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn missing_blob_fetch_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let id = identifier();
        assert_eq!(repo.fetch_document(&id).await.unwrap(), None);
        assert!(!repo.document_exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn draft_save_is_idempotently_overwritable_then_deletable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let id = identifier();
        repo.save_draft(&id, b"v1".to_vec()).await.unwrap();
        repo.save_draft(&id, b"v2".to_vec()).await.unwrap();
        assert_eq!(repo.fetch_draft(&id).await.unwrap(), Some(b"v2".to_vec()));

        repo.delete_draft(&id).await.unwrap();
        assert_eq!(repo.fetch_draft(&id).await.unwrap(), None);
        // Deleting an already-absent draft is success.
        repo.delete_draft(&id).await.unwrap();
    }

    #[tokio::test]
    async fn citation_names_do_not_rebind() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        repo.create_citation("alias", b"first".to_vec()).await.unwrap();
        let err = repo.create_citation("alias", b"second".to_vec()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn queue_round_trip_delivers_each_message_once() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        for m in [b"m1".to_vec(), b"m2".to_vec(), b"m3".to_vec()] {
            repo.enqueue("Q", m).await.unwrap();
        }
        let mut received = std::collections::HashSet::new();
        for _ in 0..3 {
            let m = repo.dequeue("Q").await.unwrap().expect("message present");
            received.insert(m);
        }
        assert_eq!(received.len(), 3);
        assert_eq!(repo.dequeue("Q").await.unwrap(), None);
    }

    #[test]
    fn sanitizes_slashes_in_citation_names() {
        assert_eq!(fsutil::sanitize_name("a/b/c"), "a_b_c");
    }
}
