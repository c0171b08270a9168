use nebula_base::Result;
use nebula_lang::{Component, NotarizedDocument};
use nebula_vers::{Citation, Tag};

/// The shape the core depends on, per spec.md §4.2: the digital notary primitive
/// itself — key material, signing algorithm, digest function — is an external
/// collaborator. The core only ever calls these five operations.
pub trait Notary: Send + Sync {
    /// Wraps and signs a component: sets `certificate`, `timestamp`, `signature`,
    /// and copies any `previous` citation out of the component's own parameters.
    fn sign(&self, component: Component) -> Result<NotarizedDocument>;

    /// Computes the citation (with digest) over a signed document's canonical bytes.
    fn cite(&self, document: &NotarizedDocument) -> Result<Citation>;

    /// Recomputes the digest of `document` and compares it against `citation`'s,
    /// constant-time.
    fn citation_matches(&self, citation: &Citation, document: &NotarizedDocument) -> bool;

    /// Verifies `document.signature` under the public key named by `certificate`.
    fn document_is_valid(&self, document: &NotarizedDocument, certificate: &NotarizedDocument) -> bool;

    /// The citation of this notary's own (self-signed) certificate.
    fn get_citation(&self) -> Citation;

    /// The account tag this notary signs on behalf of.
    fn get_account_id(&self) -> Tag;
}
