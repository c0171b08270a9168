use std::sync::Arc;

use async_trait::async_trait;
use nebula_auth::Notary;
use nebula_base::{Error, ErrorKind, Result};
use nebula_store::Repository;
use nebula_vers::Identifier;
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::credentials::{fresh_credentials, header_value};

const CONTENT_TYPE: &str = "application/bali";

/// The HTTP binding of `Repository` (spec.md §4.8): each call mints a fresh,
/// single-use credential document, signs it, and issues one request. No state is
/// kept between calls beyond the base URL and the notary used to mint credentials.
pub struct RemoteRepository {
    base_url: String,
    notary: Arc<dyn Notary>,
    http: reqwest::Client,
}

impl RemoteRepository {
    pub fn new(base_url: impl Into<String>, notary: Arc<dyn Notary>) -> RemoteRepository {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        RemoteRepository {
            base_url,
            notary,
            http: reqwest::Client::new(),
        }
    }

    fn credentials_header(&self, operation: &'static str) -> Result<String> {
        let credentials = fresh_credentials(self.notary.as_ref())
            .map_err(|e| Error::new(ErrorKind::InvalidParameter, operation).with_cause(e))?;
        Ok(header_value(&credentials))
    }

    async fn request(&self, method: Method, path: &str, body: Option<Vec<u8>>, operation: &'static str) -> Result<reqwest::Response> {
        let header = self.credentials_header(operation)?;
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "issuing remote repository request");
        let mut builder = self.http.request(method, &url).header("Nebula-Credentials", header);
        if let Some(body) = body {
            builder = builder.header("Content-Type", CONTENT_TYPE).body(body);
        }
        builder
            .send()
            .await
            .map_err(|e| Error::new(ErrorKind::NetworkError, operation).with_identifier(url).with_cause(e))
    }

    /// Maps every non-2xx, non-404 status to the `ErrorKind` spec.md §4.8 tabulates.
    /// 404 is handled by each caller, since whether it means "absent" or
    /// "DocumentMissing" depends on the operation.
    fn status_error(status: StatusCode, operation: &'static str, id: &str) -> Error {
        let kind = match status.as_u16() {
            400 => ErrorKind::InvalidRequest,
            405 => ErrorKind::NotAllowed,
            409 => ErrorKind::AlreadyExists,
            500..=599 => ErrorKind::ServerError,
            _ => ErrorKind::ServerError,
        };
        Error::new(kind, operation).with_identifier(id.to_string())
    }

    async fn exists(&self, path: &str, operation: &'static str) -> Result<bool> {
        let response = self.request(Method::HEAD, path, None, operation).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Self::status_error(status, operation, path)),
        }
    }

    async fn fetch(&self, path: &str, operation: &'static str) -> Result<Option<Vec<u8>>> {
        let response = self.request(Method::GET, path, None, operation).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| Error::new(ErrorKind::NetworkError, operation).with_cause(e))?;
                if bytes.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(bytes.to_vec()))
                }
            }
            status => Err(Self::status_error(status, operation, path)),
        }
    }

    async fn create(&self, path: &str, blob: Vec<u8>, operation: &'static str) -> Result<()> {
        let response = self.request(Method::POST, path, Some(blob), operation).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response.status(), operation, path))
        }
    }
}

#[async_trait]
impl Repository for RemoteRepository {
    async fn citation_exists(&self, name: &str) -> Result<bool> {
        self.exists(&format!("/citation/{name}"), "citationExists").await
    }

    async fn fetch_citation(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.fetch(&format!("/citation/{name}"), "fetchCitation").await
    }

    async fn create_citation(&self, name: &str, blob: Vec<u8>) -> Result<()> {
        self.create(&format!("/citation/{name}"), blob, "createCitation").await
    }

    async fn certificate_exists(&self, id: &Identifier) -> Result<bool> {
        self.exists(&format!("/certificate/{id}"), "certificateExists").await
    }

    async fn fetch_certificate(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
        self.fetch(&format!("/certificate/{id}"), "fetchCertificate").await
    }

    async fn create_certificate(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
        self.create(&format!("/certificate/{id}"), blob, "createCertificate").await
    }

    async fn draft_exists(&self, id: &Identifier) -> Result<bool> {
        self.exists(&format!("/draft/{id}"), "draftExists").await
    }

    async fn fetch_draft(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
        self.fetch(&format!("/draft/{id}"), "fetchDraft").await
    }

    async fn save_draft(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
        let path = format!("/draft/{id}");
        let response = self.request(Method::PUT, &path, Some(blob), "saveDraft").await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response.status(), "saveDraft", &path))
        }
    }

    async fn delete_draft(&self, id: &Identifier) -> Result<()> {
        let path = format!("/draft/{id}");
        let response = self.request(Method::DELETE, &path, None, "deleteDraft").await?;
        match response.status() {
            status if status.is_success() || status == StatusCode::NOT_FOUND => Ok(()),
            status => Err(Self::status_error(status, "deleteDraft", &path)),
        }
    }

    async fn document_exists(&self, id: &Identifier) -> Result<bool> {
        self.exists(&format!("/document/{id}"), "documentExists").await
    }

    async fn fetch_document(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
        self.fetch(&format!("/document/{id}"), "fetchDocument").await
    }

    async fn create_document(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
        self.create(&format!("/document/{id}"), blob, "createDocument").await
    }

    async fn type_exists(&self, id: &Identifier) -> Result<bool> {
        self.exists(&format!("/type/{id}"), "typeExists").await
    }

    async fn fetch_type(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
        self.fetch(&format!("/type/{id}"), "fetchType").await
    }

    async fn create_type(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
        self.create(&format!("/type/{id}"), blob, "createType").await
    }

    async fn enqueue(&self, queue_id: &str, blob: Vec<u8>) -> Result<()> {
        let path = format!("/queue/{queue_id}");
        let response = self.request(Method::PUT, &path, Some(blob), "enqueue").await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response.status(), "enqueue", &path))
        }
    }

    async fn dequeue(&self, queue_id: &str) -> Result<Option<Vec<u8>>> {
        self.fetch(&format!("/queue/{queue_id}"), "dequeue").await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::service::{build_router, AppState};
    use nebula_auth::LocalNotary;
    use nebula_local::LocalRepository;
    use nebula_vers::{Citation, Digest, Tag, Version};

    /// Spawns a server and commits a fresh notary's own certificate to its
    /// repository, so a `RemoteRepository` client built over that same notary's
    /// credentials resolves against the server's stored certificates (spec.md §4.8).
    async fn spawn_server() -> (String, Arc<LocalNotary>) {
        let dir = tempfile::tempdir().unwrap();
        let repository: Arc<dyn Repository> = Arc::new(LocalRepository::new(dir.path().to_path_buf()));
        // Keep the tempdir alive for the server's lifetime.
        std::mem::forget(dir);
        let notary = Arc::new(LocalNotary::generate());
        let cert_id = nebula_vers::extract_id(&notary.get_citation()).unwrap();
        repository
            .create_certificate(&cert_id, notary.certificate().to_canonical_bytes())
            .await
            .unwrap();
        let app = build_router(AppState::new(repository, notary.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), notary)
    }

    fn identifier() -> Identifier {
        let citation = Citation::new("v1.0", Tag::from_canonical("REMOTE1"), Version::parse("v1").unwrap(), Digest::None);
        nebula_vers::extract_id(&citation).unwrap()
    }

    #[tokio::test]
    async fn create_then_fetch_document_over_http() {
        let (base_url, notary) = spawn_server().await;
        let repo = RemoteRepository::new(base_url, notary);
        let id = identifier();

        assert!(!repo.document_exists(&id).await.unwrap());
        repo.create_document(&id, b"over the wire".to_vec()).await.unwrap();
        assert!(repo.document_exists(&id).await.unwrap());
        assert_eq!(repo.fetch_document(&id).await.unwrap(), Some(b"over the wire".to_vec()));
    }

    #[tokio::test]
    async fn duplicate_create_over_http_is_already_exists() {
        let (base_url, notary) = spawn_server().await;
        let repo = RemoteRepository::new(base_url, notary);
        let id = identifier();

        repo.create_document(&id, b"first".to_vec()).await.unwrap();
        let err = repo.create_document(&id, b"second".to_vec()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn fetching_missing_document_over_http_is_none() {
        let (base_url, notary) = spawn_server().await;
        let repo = RemoteRepository::new(base_url, notary);
        assert_eq!(repo.fetch_document(&identifier()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn queue_round_trip_over_http() {
        let (base_url, notary) = spawn_server().await;
        let repo = RemoteRepository::new(base_url, notary);

        repo.enqueue("Q", b"hello".to_vec()).await.unwrap();
        assert_eq!(repo.dequeue("Q").await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(repo.dequeue("Q").await.unwrap(), None);
    }
}
