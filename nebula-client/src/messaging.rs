use nebula_base::{Error, ErrorKind, Result};
use nebula_lang::{Catalog, Component};
use nebula_valid::validate_document;
use nebula_vers::{Tag, EVENT_QUEUE, SEND_QUEUE};

use crate::client::Client;

impl Client {
    /// Signs `event` and enqueues it onto the well-known `EVENT_QUEUE`.
    pub async fn publish_event(&self, event: Component) -> Result<()> {
        self.sign_and_enqueue(EVENT_QUEUE, event).await
    }

    /// Sets `m`'s `target` parameter, signs, and enqueues onto the well-known
    /// `SEND_QUEUE`.
    pub async fn send_message(&self, target: Tag, message: Component) -> Result<()> {
        let catalog = match message {
            Component::Catalog(cat) => cat,
            _ => Catalog::new(),
        };
        let addressed = Component::Catalog(catalog.with("target", Component::Tag(target)));
        self.sign_and_enqueue(SEND_QUEUE, addressed).await
    }

    /// Signs `m` and enqueues it onto queue `q`.
    pub async fn queue_message(&self, queue: &str, message: Component) -> Result<()> {
        self.sign_and_enqueue(queue, message).await
    }

    /// Dequeues from `q`; if a message is present, parses and validates its chain
    /// before returning the payload. Returns `None` when the queue is empty
    /// (spec.md: `QueueEmpty` is an absent value, not an error).
    pub async fn receive_message(&self, queue: &str) -> Result<Option<Component>> {
        const OP: &str = "receiveMessage";
        let blob = match self.repository.dequeue(queue).await.map_err(|e| self.wrap(e))? {
            Some(blob) => blob,
            None => return Ok(None),
        };
        let document = nebula_lang::NotarizedDocument::parse_canonical(&blob)
            .map_err(|e| self.wrap(Error::new(ErrorKind::InvalidCitation, OP).with_cause(e)))?;
        validate_document(&document, &self.validation_context())
            .await
            .map_err(|e| self.wrap(e))?;
        Ok(Some(document.component))
    }
}
