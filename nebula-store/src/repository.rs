use async_trait::async_trait;

use nebula_base::Result;
use nebula_vers::Identifier;

/// Key-spaced blob CRUD plus queue operations over the five namespaces of spec.md
/// §3/§4.3: `citation`, `certificate`, `draft`, `document`, `type`, and
/// `queue/<queueId>`. Every method is a suspension point (spec.md §5) — this is the
/// boundary between the in-process core and whatever actually holds the bytes, local
/// disk or a remote HTTP peer.
///
/// `certificate`, `document`, and `type` are immutable namespaces: `create` on an id
/// that already exists MUST fail with `ErrorKind::AlreadyExists` (spec.md I1).
/// `draft` additionally supports idempotent `save`/`delete`. `citation` is immutable
/// but keyed by an opaque name rather than a tag+version identifier, since a citation
/// name is a symbolic binding (spec.md §3 "Citation name" lifecycle), not a content
/// address.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn citation_exists(&self, name: &str) -> Result<bool>;
    async fn fetch_citation(&self, name: &str) -> Result<Option<Vec<u8>>>;
    /// Fails `AlreadyExists` if `name` is already bound: names do not rebind.
    async fn create_citation(&self, name: &str, blob: Vec<u8>) -> Result<()>;

    async fn certificate_exists(&self, id: &Identifier) -> Result<bool>;
    async fn fetch_certificate(&self, id: &Identifier) -> Result<Option<Vec<u8>>>;
    async fn create_certificate(&self, id: &Identifier, blob: Vec<u8>) -> Result<()>;

    async fn draft_exists(&self, id: &Identifier) -> Result<bool>;
    async fn fetch_draft(&self, id: &Identifier) -> Result<Option<Vec<u8>>>;
    /// Idempotent overwrite: re-saving a draft at the same id replaces its content.
    async fn save_draft(&self, id: &Identifier, blob: Vec<u8>) -> Result<()>;
    /// Idempotent: deleting an absent draft is success, per spec.md §7.
    async fn delete_draft(&self, id: &Identifier) -> Result<()>;

    async fn document_exists(&self, id: &Identifier) -> Result<bool>;
    async fn fetch_document(&self, id: &Identifier) -> Result<Option<Vec<u8>>>;
    async fn create_document(&self, id: &Identifier, blob: Vec<u8>) -> Result<()>;

    async fn type_exists(&self, id: &Identifier) -> Result<bool>;
    async fn fetch_type(&self, id: &Identifier) -> Result<Option<Vec<u8>>>;
    async fn create_type(&self, id: &Identifier, blob: Vec<u8>) -> Result<()>;

    /// Adds a message to the named queue's multiset. No ordering guarantee.
    async fn enqueue(&self, queue_id: &str, blob: Vec<u8>) -> Result<()>;
    /// Removes and returns one message from the named queue, or `None` if empty.
    /// At-most-once: a message removed here MUST NOT be returned to any other
    /// caller (spec.md I5).
    async fn dequeue(&self, queue_id: &str) -> Result<Option<Vec<u8>>>;
}
