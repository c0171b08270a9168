use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use nebula_auth::Notary;
use nebula_base::ErrorKind;
use nebula_lang::NotarizedDocument;
use nebula_store::{FifoCache, Repository, CERTIFICATE_CACHE_CAP};
use nebula_valid::{validate_document, ValidationContext};
use nebula_vers::Identifier;
use tracing::{info, warn};

use crate::credentials::parse_header_value;

const CONTENT_TYPE: &str = "application/bali";
const CREDENTIALS_HEADER: &str = "Nebula-Credentials";

/// Shared state behind every route: the repository implementation the service
/// delegates to (spec.md §4.8: "mounts one sub-router per namespace and delegates
/// to a local binding"), plus the notary and certificate cache the credential
/// middleware needs to validate each request's `Nebula-Credentials` header against
/// a stored certificate. `certificate_cache` is `Arc`-wrapped so cloning `AppState`
/// per request (axum's `State` extractor requires `Clone`) shares one cache across
/// every request instead of starting fresh each time.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,
    pub notary: Arc<dyn Notary>,
    certificate_cache: Arc<FifoCache<Identifier, NotarizedDocument>>,
}

impl AppState {
    pub fn new(repository: Arc<dyn Repository>, notary: Arc<dyn Notary>) -> AppState {
        AppState {
            repository,
            notary,
            certificate_cache: Arc::new(FifoCache::new(CERTIFICATE_CACHE_CAP)),
        }
    }
}

/// Parses and validates the `Nebula-Credentials` header (spec.md §4.8): "The server
/// validates this credential against the stored certificate whose citation it
/// embeds." A missing or malformed header is `400`; a well-formed credential whose
/// chain doesn't resolve against this server's own certificates — unknown
/// certificate, broken signature, tampered digest — is `401`.
async fn verify_credentials(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let raw = headers
        .get(CREDENTIALS_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let credentials = parse_header_value(raw).map_err(|_| StatusCode::BAD_REQUEST)?;
    let ctx = ValidationContext::new(state.repository.as_ref(), state.notary.as_ref(), state.certificate_cache.as_ref());
    validate_document(&credentials, &ctx).await.map_err(|_| StatusCode::UNAUTHORIZED)
}

/// Runs in front of every route the router mounts, so no handler can be reached
/// without a credential that resolves against this server's stored certificates.
async fn require_credentials(State(state): State<AppState>, headers: HeaderMap, request: Request, next: Next) -> Response {
    match verify_credentials(&state, &headers).await {
        Ok(()) => next.run(request).await,
        Err(status) => {
            warn!(status = %status, "rejected request with invalid Nebula-Credentials header");
            status.into_response()
        }
    }
}

/// Builds the router spec.md §4.8 describes: one namespace per path prefix, each
/// mounting HEAD/GET/POST (or PUT/DELETE for drafts and queues) onto the matching
/// `Repository` method, behind the `require_credentials` middleware every request
/// must pass first.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/citation/:name", get(get_citation).head(head_citation).post(post_citation))
        .route(
            "/certificate/:id",
            get(get_certificate).head(head_certificate).post(post_certificate),
        )
        .route("/document/:id", get(get_document).head(head_document).post(post_document))
        .route("/type/:id", get(get_type).head(head_type).post(post_type))
        .route(
            "/draft/:id",
            get(get_draft).head(head_draft).put(put_draft).delete(delete_draft),
        )
        .route("/queue/:queueId", get(get_queue).put(put_queue))
        .layer(middleware::from_fn_with_state(state.clone(), require_credentials))
        .with_state(state)
}

fn kind_to_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidParameter | ErrorKind::InvalidRequest | ErrorKind::InvalidCitation => StatusCode::BAD_REQUEST,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::DocumentMissing | ErrorKind::CertificateMissing => StatusCode::NOT_FOUND,
        ErrorKind::NotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorKind::ChainTooDeep | ErrorKind::DocumentInvalid => StatusCode::BAD_REQUEST,
        ErrorKind::NetworkError | ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn blob_response(status: StatusCode, blob: Vec<u8>, immutable: bool) -> Response {
    let cache_control = if immutable { "immutable" } else { "no-store" };
    (status, [(header::CONTENT_TYPE, CONTENT_TYPE), (header::CACHE_CONTROL, cache_control)], blob).into_response()
}

fn error_response(e: nebula_base::Error) -> Response {
    warn!(kind = %e.kind(), operation = e.operation(), "request failed");
    kind_to_status(e.kind()).into_response()
}

fn log_request(method: &str, path: &str, headers: &HeaderMap) {
    let has_credentials = headers.contains_key(CREDENTIALS_HEADER);
    info!(method, path, has_credentials, "request received");
}

async fn head_citation(State(state): State<AppState>, Path(name): Path<String>, headers: HeaderMap) -> StatusCode {
    log_request("HEAD", &format!("/citation/{name}"), &headers);
    match state.repository.citation_exists(&name).await {
        Ok(true) => StatusCode::OK,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => kind_to_status(e.kind()),
    }
}

async fn get_citation(State(state): State<AppState>, Path(name): Path<String>, headers: HeaderMap) -> Response {
    log_request("GET", &format!("/citation/{name}"), &headers);
    match state.repository.fetch_citation(&name).await {
        Ok(Some(blob)) => blob_response(StatusCode::OK, blob, true),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(e),
    }
}

async fn post_citation(State(state): State<AppState>, Path(name): Path<String>, headers: HeaderMap, body: Bytes) -> StatusCode {
    log_request("POST", &format!("/citation/{name}"), &headers);
    match state.repository.create_citation(&name, body.to_vec()).await {
        Ok(()) => StatusCode::CREATED,
        Err(e) => kind_to_status(e.kind()),
    }
}

macro_rules! immutable_namespace_handlers {
    ($ns:literal, $head:ident, $get:ident, $post:ident, $exists:ident, $fetch:ident, $create:ident) => {
        async fn $head(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap) -> StatusCode {
            log_request("HEAD", &format!(concat!("/", $ns, "/{}"), id), &headers);
            let id = Identifier::from_raw(id);
            match state.repository.$exists(&id).await {
                Ok(true) => StatusCode::OK,
                Ok(false) => StatusCode::NOT_FOUND,
                Err(e) => kind_to_status(e.kind()),
            }
        }

        async fn $get(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap) -> Response {
            log_request("GET", &format!(concat!("/", $ns, "/{}"), id), &headers);
            let id = Identifier::from_raw(id);
            match state.repository.$fetch(&id).await {
                Ok(Some(blob)) => blob_response(StatusCode::OK, blob, true),
                Ok(None) => StatusCode::NOT_FOUND.into_response(),
                Err(e) => error_response(e),
            }
        }

        async fn $post(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap, body: Bytes) -> StatusCode {
            log_request("POST", &format!(concat!("/", $ns, "/{}"), id), &headers);
            let id = Identifier::from_raw(id);
            match state.repository.$create(&id, body.to_vec()).await {
                Ok(()) => StatusCode::CREATED,
                Err(e) => kind_to_status(e.kind()),
            }
        }
    };
}

immutable_namespace_handlers!(
    "certificate",
    head_certificate,
    get_certificate,
    post_certificate,
    certificate_exists,
    fetch_certificate,
    create_certificate
);
immutable_namespace_handlers!(
    "document",
    head_document,
    get_document,
    post_document,
    document_exists,
    fetch_document,
    create_document
);
immutable_namespace_handlers!("type", head_type, get_type, post_type, type_exists, fetch_type, create_type);

async fn head_draft(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap) -> StatusCode {
    log_request("HEAD", &format!("/draft/{id}"), &headers);
    let id = Identifier::from_raw(id);
    match state.repository.draft_exists(&id).await {
        Ok(true) => StatusCode::OK,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => kind_to_status(e.kind()),
    }
}

async fn get_draft(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    log_request("GET", &format!("/draft/{id}"), &headers);
    let id = Identifier::from_raw(id);
    match state.repository.fetch_draft(&id).await {
        Ok(Some(blob)) => blob_response(StatusCode::OK, blob, false),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(e),
    }
}

async fn put_draft(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap, body: Bytes) -> StatusCode {
    log_request("PUT", &format!("/draft/{id}"), &headers);
    let id = Identifier::from_raw(id);
    match state.repository.save_draft(&id, body.to_vec()).await {
        Ok(()) => StatusCode::OK,
        Err(e) => kind_to_status(e.kind()),
    }
}

async fn delete_draft(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap) -> StatusCode {
    log_request("DELETE", &format!("/draft/{id}"), &headers);
    let id = Identifier::from_raw(id);
    match state.repository.delete_draft(&id).await {
        Ok(()) => StatusCode::OK,
        Err(e) => kind_to_status(e.kind()),
    }
}

async fn get_queue(State(state): State<AppState>, Path(queue_id): Path<String>, headers: HeaderMap) -> Response {
    log_request("GET", &format!("/queue/{queue_id}"), &headers);
    match state.repository.dequeue(&queue_id).await {
        Ok(Some(blob)) => blob_response(StatusCode::OK, blob, false),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(e),
    }
}

async fn put_queue(State(state): State<AppState>, Path(queue_id): Path<String>, headers: HeaderMap, body: Bytes) -> StatusCode {
    log_request("PUT", &format!("/queue/{queue_id}"), &headers);
    match state.repository.enqueue(&queue_id, body.to_vec()).await {
        Ok(()) => StatusCode::CREATED,
        Err(e) => kind_to_status(e.kind()),
    }
}
