use std::sync::Arc;

use nebula_auth::Notary;
use nebula_base::{Error, ErrorKind, Result};
use nebula_lang::{Component, NotarizedDocument};
use nebula_store::{Repository, FifoCache, CERTIFICATE_CACHE_CAP, DOCUMENT_CACHE_CAP, TYPE_CACHE_CAP};
use nebula_valid::{validate_document, ValidationContext};
use nebula_vers::{extract_id, is_valid_next_version, next_version, Citation, Identifier, Tag};

/// The public surface of spec.md §4.6, wired atop a notary, a repository, and the
/// three bounded caches of §4.5. Drafts are deliberately not cached: they are
/// mutable, so every read goes to the repository.
pub struct Client {
    pub(crate) notary: Arc<dyn Notary>,
    pub(crate) repository: Arc<dyn Repository>,
    pub(crate) certificate_cache: FifoCache<Identifier, NotarizedDocument>,
    pub(crate) document_cache: FifoCache<Identifier, NotarizedDocument>,
    pub(crate) type_cache: FifoCache<Identifier, NotarizedDocument>,
}

impl Client {
    pub fn new(notary: Arc<dyn Notary>, repository: Arc<dyn Repository>) -> Client {
        Client::with_cache_caps(notary, repository, CERTIFICATE_CACHE_CAP, DOCUMENT_CACHE_CAP, TYPE_CACHE_CAP)
    }

    /// Spec.md §6 allows cache caps to be exposed as configuration provided the
    /// defaults stay 64/128/256; this is that escape hatch.
    pub fn with_cache_caps(
        notary: Arc<dyn Notary>,
        repository: Arc<dyn Repository>,
        certificate_cap: usize,
        document_cap: usize,
        type_cap: usize,
    ) -> Client {
        Client {
            notary,
            repository,
            certificate_cache: FifoCache::new(certificate_cap),
            document_cache: FifoCache::new(document_cap),
            type_cache: FifoCache::new(type_cap),
        }
    }

    pub(crate) fn validation_context<'a>(&'a self) -> ValidationContext<'a> {
        ValidationContext::new(self.repository.as_ref(), self.notary.as_ref(), &self.certificate_cache)
    }

    /// Every Client API operation wraps failures from the notary, repository, or
    /// validator in a contextual error naming the account (spec.md §4.6); the
    /// operation name and identifier are already attached at the point of
    /// construction.
    pub(crate) fn wrap(&self, err: Error) -> Error {
        if err.account_id().is_some() {
            return err;
        }
        err.with_account(self.notary.get_account_id().canonical().to_string())
    }

    /// Returns the notary's own (self-signed) certificate citation.
    pub fn get_citation(&self) -> Citation {
        self.notary.get_citation()
    }

    async fn parse_and_validate(&self, blob: &[u8], expected: &Citation, operation: &'static str) -> Result<NotarizedDocument> {
        let document = NotarizedDocument::parse_canonical(blob)
            .map_err(|e| self.wrap(Error::new(ErrorKind::InvalidCitation, operation).with_cause(e)))?;
        if !self.notary.citation_matches(expected, &document) {
            return Err(self.wrap(Error::new(ErrorKind::InvalidCitation, operation)));
        }
        validate_document(&document, &self.validation_context())
            .await
            .map_err(|e| self.wrap(e))?;
        Ok(document)
    }

    /// Cache → fetch → parse → validate citation-against-doc → validate chain →
    /// cache. Returns the certificate component, or `None` if the store has no such
    /// id.
    pub async fn retrieve_certificate(&self, citation: &Citation) -> Result<Option<Component>> {
        const OP: &str = "retrieveCertificate";
        let id = extract_id(citation).map_err(|e| self.wrap(e))?;
        if let Some(cached) = self.certificate_cache.get(&id) {
            return Ok(Some(cached.component));
        }
        let blob = match self.repository.fetch_certificate(&id).await.map_err(|e| self.wrap(e))? {
            Some(blob) => blob,
            None => return Ok(None),
        };
        let document = self.parse_and_validate(&blob, citation, OP).await?;
        self.certificate_cache.put(id, document.clone());
        Ok(Some(document.component))
    }

    /// Same shape as `retrieve_certificate`, over the `type` namespace.
    pub async fn retrieve_type(&self, citation: &Citation) -> Result<Option<Component>> {
        const OP: &str = "retrieveType";
        let id = extract_id(citation).map_err(|e| self.wrap(e))?;
        if let Some(cached) = self.type_cache.get(&id) {
            return Ok(Some(cached.component));
        }
        let blob = match self.repository.fetch_type(&id).await.map_err(|e| self.wrap(e))? {
            Some(blob) => blob,
            None => return Ok(None),
        };
        let document = self.parse_and_validate(&blob, citation, OP).await?;
        self.type_cache.put(id, document.clone());
        Ok(Some(document.component))
    }

    /// Signs `type_component`, asserts its id is absent from the store, `create`s
    /// it, caches it, and returns its new citation. Permission enforcement is the
    /// server's job, not this client's (spec.md §4.6).
    pub async fn commit_type(&self, type_component: Component) -> Result<Citation> {
        const OP: &str = "commitType";
        let document = self.notary.sign(type_component).map_err(|e| self.wrap(e))?;
        let citation = self.notary.cite(&document).map_err(|e| self.wrap(e))?;
        let id = extract_id(&citation).map_err(|e| self.wrap(e))?;
        if self.repository.type_exists(&id).await.map_err(|e| self.wrap(e))? {
            return Err(self.wrap(Error::new(ErrorKind::AlreadyExists, OP).with_identifier(id.to_string())));
        }
        self.repository
            .create_type(&id, document.to_canonical_bytes())
            .await
            .map_err(|e| self.wrap(e))?;
        self.type_cache.put(id, document);
        Ok(citation)
    }

    /// Self-signed/certificate-authority commit used to bootstrap trust: the
    /// Client API table of spec.md §4.6 has no explicit `commitCertificate`, but one
    /// is needed to store the root and intermediate certificates end-to-end
    /// scenario 6 exercises — see DESIGN.md.
    pub async fn commit_certificate(&self, certificate: NotarizedDocument) -> Result<Citation> {
        const OP: &str = "commitCertificate";
        let citation = self.notary.cite(&certificate).map_err(|e| self.wrap(e))?;
        let id = extract_id(&citation).map_err(|e| self.wrap(e))?;
        if self.repository.certificate_exists(&id).await.map_err(|e| self.wrap(e))? {
            return Err(self.wrap(Error::new(ErrorKind::AlreadyExists, OP).with_identifier(id.to_string())));
        }
        self.repository
            .create_certificate(&id, certificate.to_canonical_bytes())
            .await
            .map_err(|e| self.wrap(e))?;
        self.certificate_cache.put(id, certificate);
        Ok(citation)
    }

    /// Fetch → parse → validate citation → validate chain → return payload. Never
    /// cached: drafts are mutable.
    pub async fn retrieve_draft(&self, citation: &Citation) -> Result<Option<Component>> {
        const OP: &str = "retrieveDraft";
        let id = extract_id(citation).map_err(|e| self.wrap(e))?;
        let blob = match self.repository.fetch_draft(&id).await.map_err(|e| self.wrap(e))? {
            Some(blob) => blob,
            None => return Ok(None),
        };
        let document = self.parse_and_validate(&blob, citation, OP).await?;
        Ok(Some(document.component))
    }

    /// Signs `draft`, asserts its id is absent from both the document cache and the
    /// document store (never overwrite a committed version), then `save`s it.
    pub async fn save_draft(&self, draft: Component) -> Result<Citation> {
        const OP: &str = "saveDraft";
        let document = self.notary.sign(draft).map_err(|e| self.wrap(e))?;
        let citation = self.notary.cite(&document).map_err(|e| self.wrap(e))?;
        let id = extract_id(&citation).map_err(|e| self.wrap(e))?;
        self.assert_not_committed(&id, OP).await?;
        self.repository
            .save_draft(&id, document.to_canonical_bytes())
            .await
            .map_err(|e| self.wrap(e))?;
        Ok(citation)
    }

    /// Absent-is-ok delete on the draft namespace.
    pub async fn discard_draft(&self, citation: &Citation) -> Result<()> {
        const OP: &str = "discardDraft";
        let id = extract_id(citation).map_err(|e| self.wrap(e))?;
        self.repository.delete_draft(&id).await.map_err(|e| self.wrap(e))
    }

    async fn assert_not_committed(&self, id: &Identifier, operation: &'static str) -> Result<()> {
        if self.document_cache.contains(id) {
            return Err(self.wrap(Error::new(ErrorKind::AlreadyExists, operation).with_identifier(id.to_string())));
        }
        if self.repository.document_exists(id).await.map_err(|e| self.wrap(e))? {
            return Err(self.wrap(Error::new(ErrorKind::AlreadyExists, operation).with_identifier(id.to_string())));
        }
        Ok(())
    }

    /// Signs `draft`, asserts its id is absent from the document cache and store,
    /// `create`s it in `document`, caches it, then deletes the draft at the same
    /// id (idempotent). A crash between `create` and `delete` is tolerated: a
    /// subsequent commit attempt fails `AlreadyExists`, but `discardDraft` or a
    /// later retrieval still converges (spec.md §4.6).
    pub async fn commit_document(&self, draft: Component) -> Result<Citation> {
        const OP: &str = "commitDocument";
        let document = self.notary.sign(draft).map_err(|e| self.wrap(e))?;
        let citation = self.notary.cite(&document).map_err(|e| self.wrap(e))?;
        let id = extract_id(&citation).map_err(|e| self.wrap(e))?;
        self.assert_not_committed(&id, OP).await?;
        self.repository
            .create_document(&id, document.to_canonical_bytes())
            .await
            .map_err(|e| self.wrap(e))?;
        self.document_cache.put(id.clone(), document);
        self.repository.delete_draft(&id).await.map_err(|e| self.wrap(e))?;
        Ok(citation)
    }

    /// Cache → fetch → parse → validate citation → validate chain → cache →
    /// return payload.
    pub async fn retrieve_document(&self, citation: &Citation) -> Result<Option<Component>> {
        const OP: &str = "retrieveDocument";
        let id = extract_id(citation).map_err(|e| self.wrap(e))?;
        if let Some(cached) = self.document_cache.get(&id) {
            return Ok(Some(cached.component));
        }
        let blob = match self.repository.fetch_document(&id).await.map_err(|e| self.wrap(e))? {
            Some(blob) => blob,
            None => return Ok(None),
        };
        let document = self.parse_and_validate(&blob, citation, OP).await?;
        self.document_cache.put(id, document.clone());
        Ok(Some(document.component))
    }

    /// (a) computes the draft version at `level` (default 0); (b) asserts that id is
    /// absent from document cache, document store, and draft store; (c) fetches and
    /// validates the current document, caching it; (d) duplicates its component with
    /// `{version := draftVersion, previous := citation}`; (e) signs and saves it as
    /// a draft; returns the draft citation.
    pub async fn checkout_document(&self, citation: &Citation, level: Option<usize>) -> Result<Citation> {
        const OP: &str = "checkoutDocument";
        let current_version = citation
            .version
            .as_ref()
            .ok_or_else(|| self.wrap(Error::new(ErrorKind::InvalidParameter, OP)))?;
        let draft_version = next_version(current_version, level.unwrap_or(0));
        debug_assert!(is_valid_next_version(current_version, &draft_version));

        let tag = citation
            .tag
            .clone()
            .ok_or_else(|| self.wrap(Error::new(ErrorKind::InvalidParameter, OP)))?;
        let draft_citation = Citation::name_only(citation.protocol.clone(), tag, draft_version.clone());
        let draft_id = extract_id(&draft_citation).map_err(|e| self.wrap(e))?;

        if self.document_cache.contains(&draft_id)
            || self.repository.document_exists(&draft_id).await.map_err(|e| self.wrap(e))?
            || self.repository.draft_exists(&draft_id).await.map_err(|e| self.wrap(e))?
        {
            return Err(self.wrap(Error::new(ErrorKind::AlreadyExists, OP).with_identifier(draft_id.to_string())));
        }

        let current_component = self
            .retrieve_document(citation)
            .await?
            .ok_or_else(|| self.wrap(Error::new(ErrorKind::DocumentMissing, OP)))?;
        let catalog = current_component
            .get_parameters()
            .ok_or_else(|| self.wrap(Error::new(ErrorKind::InvalidParameter, OP)))?
            .clone()
            .with("version", Component::Version(draft_version))
            .with("previous", Component::Reference(citation.clone()));
        let new_draft = Component::Catalog(catalog);

        self.save_draft(new_draft).await
    }

    pub(crate) async fn sign_and_enqueue(&self, queue_id: &str, message: Component) -> Result<()> {
        let document = self.notary.sign(message).map_err(|e| self.wrap(e))?;
        self.repository
            .enqueue(queue_id, document.to_canonical_bytes())
            .await
            .map_err(|e| self.wrap(e))
    }

    /// The account this client's notary signs on behalf of.
    pub fn account_id(&self) -> Tag {
        self.notary.get_account_id()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use nebula_base::Result;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemRepository {
        citations: Mutex<HashMap<String, Vec<u8>>>,
        certificates: Mutex<HashMap<String, Vec<u8>>>,
        drafts: Mutex<HashMap<String, Vec<u8>>>,
        documents: Mutex<HashMap<String, Vec<u8>>>,
        types: Mutex<HashMap<String, Vec<u8>>>,
        queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    }

    #[async_trait]
    impl Repository for MemRepository {
        async fn citation_exists(&self, name: &str) -> Result<bool> {
            Ok(self.citations.lock().unwrap().contains_key(name))
        }
        async fn fetch_citation(&self, name: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.citations.lock().unwrap().get(name).cloned())
        }
        async fn create_citation(&self, name: &str, blob: Vec<u8>) -> Result<()> {
            use std::collections::hash_map::Entry;
            match self.citations.lock().unwrap().entry(name.to_string()) {
                Entry::Occupied(_) => Err(nebula_base::Error::new(nebula_base::ErrorKind::AlreadyExists, "createCitation")),
                Entry::Vacant(e) => {
                    e.insert(blob);
                    Ok(())
                }
            }
        }
        async fn certificate_exists(&self, id: &Identifier) -> Result<bool> {
            Ok(self.certificates.lock().unwrap().contains_key(id.as_str()))
        }
        async fn fetch_certificate(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
            Ok(self.certificates.lock().unwrap().get(id.as_str()).cloned())
        }
        async fn create_certificate(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
            self.certificates.lock().unwrap().insert(id.as_str().to_string(), blob);
            Ok(())
        }
        async fn draft_exists(&self, id: &Identifier) -> Result<bool> {
            Ok(self.drafts.lock().unwrap().contains_key(id.as_str()))
        }
        async fn fetch_draft(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
            Ok(self.drafts.lock().unwrap().get(id.as_str()).cloned())
        }
        async fn save_draft(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
            self.drafts.lock().unwrap().insert(id.as_str().to_string(), blob);
            Ok(())
        }
        async fn delete_draft(&self, id: &Identifier) -> Result<()> {
            self.drafts.lock().unwrap().remove(id.as_str());
            Ok(())
        }
        async fn document_exists(&self, id: &Identifier) -> Result<bool> {
            Ok(self.documents.lock().unwrap().contains_key(id.as_str()))
        }
        async fn fetch_document(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
            Ok(self.documents.lock().unwrap().get(id.as_str()).cloned())
        }
        async fn create_document(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
            use std::collections::hash_map::Entry;
            match self.documents.lock().unwrap().entry(id.as_str().to_string()) {
                Entry::Occupied(_) => Err(nebula_base::Error::new(nebula_base::ErrorKind::AlreadyExists, "createDocument")),
                Entry::Vacant(e) => {
                    e.insert(blob);
                    Ok(())
                }
            }
        }
        async fn type_exists(&self, id: &Identifier) -> Result<bool> {
            Ok(self.types.lock().unwrap().contains_key(id.as_str()))
        }
        async fn fetch_type(&self, id: &Identifier) -> Result<Option<Vec<u8>>> {
            Ok(self.types.lock().unwrap().get(id.as_str()).cloned())
        }
        async fn create_type(&self, id: &Identifier, blob: Vec<u8>) -> Result<()> {
            use std::collections::hash_map::Entry;
            match self.types.lock().unwrap().entry(id.as_str().to_string()) {
                Entry::Occupied(_) => Err(nebula_base::Error::new(nebula_base::ErrorKind::AlreadyExists, "createType")),
                Entry::Vacant(e) => {
                    e.insert(blob);
                    Ok(())
                }
            }
        }
        async fn enqueue(&self, queue_id: &str, blob: Vec<u8>) -> Result<()> {
            self.queues.lock().unwrap().entry(queue_id.to_string()).or_default().push_back(blob);
            Ok(())
        }
        async fn dequeue(&self, queue_id: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.queues.lock().unwrap().get_mut(queue_id).and_then(|q| q.pop_front()))
        }
    }

    use super::*;

    pub fn new_client() -> (Client, std::sync::Arc<nebula_auth::LocalNotary>) {
        let notary = std::sync::Arc::new(nebula_auth::LocalNotary::generate());
        let repository = std::sync::Arc::new(MemRepository::default());
        let client = Client::new(notary.clone(), repository);
        (client, notary)
    }

    pub fn sample_draft(tag: &str, version: &str) -> Component {
        Component::Catalog(
            nebula_lang::Catalog::new()
                .with("tag", Component::Tag(nebula_vers::Tag::from_canonical(tag)))
                .with("version", Component::Version(nebula_vers::Version::parse(version).unwrap()))
                .with("body", Component::Text("hello".into())),
        )
    }
}

#[cfg(test)]
mod test {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn bootstrap_then_retrieve_certificate_hits_cache_on_second_call() {
        let (client, notary) = new_client();
        let c0 = client.get_citation();
        assert_eq!(c0, notary.get_citation());

        client.commit_certificate((*notary.certificate()).clone()).await.unwrap();
        let first = client.retrieve_certificate(&c0).await.unwrap();
        assert!(first.is_some());
        assert!(client.certificate_cache.contains(&extract_id(&c0).unwrap()));

        // Second retrieval should hit the cache and return the identical component.
        let second = client.retrieve_certificate(&c0).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn draft_lifecycle() {
        let (client, _notary) = new_client();
        let draft = sample_draft("DOC1", "v1");
        let citation = client.save_draft(draft.clone()).await.unwrap();

        let retrieved = client.retrieve_draft(&citation).await.unwrap().unwrap();
        assert_eq!(retrieved, draft);

        let updated = Component::Catalog(
            retrieved
                .get_parameters()
                .unwrap()
                .clone()
                .with("body", Component::Text("updated".into())),
        );
        // Re-saving at the same id overwrites: drafts are idempotently saved.
        client.save_draft(updated.clone()).await.unwrap();
        let after_overwrite = client.retrieve_draft(&citation).await.unwrap().unwrap();
        assert_eq!(after_overwrite, updated);

        client.discard_draft(&citation).await.unwrap();
        assert!(client.retrieve_draft(&citation).await.unwrap().is_none());

        // Discarding an already-absent draft is success (spec.md §7).
        client.discard_draft(&citation).await.unwrap();
    }

    #[tokio::test]
    async fn commit_then_retrieve_then_duplicate_commit_fails() {
        let (client, _notary) = new_client();
        let draft = sample_draft("DOC2", "v1");
        let citation = client.commit_document(draft.clone()).await.unwrap();

        let retrieved = client.retrieve_document(&citation).await.unwrap().unwrap();
        assert_eq!(retrieved, draft);

        // P2: after commit, the draft no longer exists at the same id.
        assert!(client.retrieve_draft(&citation).await.unwrap().is_none());

        let err = client.commit_document(draft).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn checkout_at_each_level_matches_scenario() {
        let (client, _notary) = new_client();
        let draft = sample_draft("DOC3", "v3.4");
        let citation = client.commit_document(draft).await.unwrap();

        let level0 = client.checkout_document(&citation, Some(0)).await.unwrap();
        assert_eq!(level0.version.as_ref().unwrap().canonical(), "v3.5");
        assert_eq!(level0.tag, citation.tag);

        let level1_draft = sample_draft("DOC4", "v3.4");
        let c1 = client.commit_document(level1_draft).await.unwrap();
        let level1 = client.checkout_document(&c1, Some(1)).await.unwrap();
        assert_eq!(level1.version.as_ref().unwrap().canonical(), "v4");

        let level2_draft = sample_draft("DOC5", "v3.4");
        let c2 = client.commit_document(level2_draft).await.unwrap();
        let level2 = client.checkout_document(&c2, Some(2)).await.unwrap();
        assert_eq!(level2.version.as_ref().unwrap().canonical(), "v3.4.1");

        let draft_component = client.retrieve_draft(&level2).await.unwrap().unwrap();
        let previous = draft_component.get_parameters().unwrap().previous().unwrap();
        assert_eq!(previous, c2);
    }

    #[tokio::test]
    async fn queue_round_trip_delivers_each_message_exactly_once() {
        let (client, _notary) = new_client();
        client.queue_message("Q", sample_draft("M1", "v1")).await.unwrap();
        client.queue_message("Q", sample_draft("M2", "v1")).await.unwrap();
        client.queue_message("Q", sample_draft("M3", "v1")).await.unwrap();

        let mut received = Vec::new();
        while let Some(m) = client.receive_message("Q").await.unwrap() {
            received.push(m);
        }
        assert_eq!(received.len(), 3);
        assert!(client.receive_message("Q").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn publish_event_and_send_message_enqueue_onto_well_known_queues() {
        let (client, _notary) = new_client();
        client.publish_event(sample_draft("EVT1", "v1")).await.unwrap();
        let event = client.receive_message(nebula_vers::EVENT_QUEUE).await.unwrap();
        assert_eq!(event.is_some(), true);

        client.send_message(nebula_vers::Tag::from_canonical("peer"), sample_draft("MSG1", "v1")).await.unwrap();
        let message = client.receive_message(nebula_vers::SEND_QUEUE).await.unwrap().unwrap();
        match message.get_parameters().unwrap().get("target") {
            Some(Component::Tag(t)) => assert_eq!(t.canonical(), "peer"),
            other => panic!("expected a target tag, got {other:?}"),
        }
    }
}
