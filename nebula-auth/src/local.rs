use std::time::{SystemTime, UNIX_EPOCH};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use nebula_base::{err, Context, Error, ErrorKind, Result};
use nebula_lang::{Catalog, Component, NotarizedDocument};
use nebula_vers::{Citation, Digest, Tag, Version};
use rand::rngs::OsRng;

use crate::Notary;

const PROTOCOL: &str = "v1.0";

/// A concrete, testable notary: ed25519-backed, self-signed bootstrap certificate.
/// Not part of spec.md's abstract Notary Interface — it exists so the rest of the
/// workspace (and the scenarios in spec.md §8) have something to sign with, per
/// SPEC_FULL.md §C.1.
pub struct LocalNotary {
    signing_key: SigningKey,
    account: Tag,
    certificate: NotarizedDocument,
    certificate_citation: Citation,
}

impl LocalNotary {
    /// Generates a fresh keypair, mints an account tag, and self-signs a bootstrap
    /// certificate carrying `{account, publicKey, protocol}`.
    pub fn generate() -> LocalNotary {
        let signing_key = SigningKey::generate(&mut OsRng);
        let account = Tag::generate();
        LocalNotary::from_signing_key(signing_key, account)
    }

    /// Rebuilds a notary from an existing key, e.g. loaded from disk by the `nebula`
    /// binary's `--key` flag.
    pub fn from_signing_key(signing_key: SigningKey, account: Tag) -> LocalNotary {
        let verifying_key = signing_key.verifying_key();
        let component = Component::Catalog(
            Catalog::new()
                .with("account", Component::Tag(account.clone()))
                .with("publicKey", Component::Bytes(verifying_key.to_bytes().to_vec()))
                .with("protocol", Component::Text(PROTOCOL.into())),
        );
        let timestamp = now_millis();
        let mut certificate = NotarizedDocument {
            component,
            protocol: PROTOCOL.into(),
            timestamp,
            certificate: None,
            signature: Vec::new(),
            previous: None,
        };
        let signature = signing_key.sign(&certificate.signable_bytes());
        certificate.signature = signature.to_bytes().to_vec();

        let tag = Tag::generate();
        let version = Version::parse("v1").expect("literal version parses");
        let digest = Digest::hash(&certificate.to_canonical_bytes());
        let certificate_citation = Citation::new(PROTOCOL, tag, version, digest);

        LocalNotary {
            signing_key,
            account,
            certificate,
            certificate_citation,
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// This notary's own self-signed certificate, as a document a caller can store
    /// under its citation (`get_citation()`) to bootstrap a repository.
    pub fn certificate(&self) -> &NotarizedDocument {
        &self.certificate
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn verifying_key_of(certificate: &NotarizedDocument) -> Result<VerifyingKey> {
    let bytes = certificate
        .public_key()
        .ok_or_else(|| err("certificate component has no publicKey parameter"))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| err("publicKey parameter is not 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes).context(ErrorKind::DocumentInvalid, "verifyingKeyOf")
}

impl Notary for LocalNotary {
    fn sign(&self, component: Component) -> Result<NotarizedDocument> {
        let previous = component.get_parameters().and_then(|p| p.previous());
        // Only this notary's own bootstrap certificate is self-signed; every other
        // `sign` call is signed under that certificate, per spec.md §4.2/§4.6.
        let mut doc = NotarizedDocument {
            component,
            protocol: PROTOCOL.into(),
            timestamp: now_millis(),
            certificate: Some(self.get_citation()),
            signature: Vec::new(),
            previous,
        };
        let signature = self.signing_key.sign(&doc.signable_bytes());
        doc.signature = signature.to_bytes().to_vec();
        Ok(doc)
    }

    fn cite(&self, document: &NotarizedDocument) -> Result<Citation> {
        let tag = document
            .component
            .get_parameters()
            .and_then(|p| p.tag())
            .ok_or_else(|| Error::new(ErrorKind::InvalidParameter, "cite").with_identifier("missing tag parameter"))?;
        let version = document
            .component
            .get_parameters()
            .and_then(|p| p.version())
            .ok_or_else(|| Error::new(ErrorKind::InvalidParameter, "cite").with_identifier("missing version parameter"))?;
        let digest = Digest::hash(&document.to_canonical_bytes());
        Ok(Citation::new(PROTOCOL, tag, version, digest).with_timestamp(document.timestamp))
    }

    fn citation_matches(&self, citation: &Citation, document: &NotarizedDocument) -> bool {
        let digest = Digest::hash(&document.to_canonical_bytes());
        citation.digest.matches(&digest)
    }

    fn document_is_valid(&self, document: &NotarizedDocument, certificate: &NotarizedDocument) -> bool {
        let verifying_key = match verifying_key_of(certificate) {
            Ok(k) => k,
            Err(_) => return false,
        };
        let signature_bytes: [u8; 64] = match document.signature.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let signature = Signature::from_bytes(&signature_bytes);
        verifying_key.verify(&document.signable_bytes(), &signature).is_ok()
    }

    fn get_citation(&self) -> Citation {
        self.certificate_citation.clone()
    }

    fn get_account_id(&self) -> Tag {
        self.account.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bootstrap_certificate_is_self_signed_and_valid() {
        let notary = LocalNotary::generate();
        let cert = notary.certificate();
        assert!(cert.is_self_signed());
        assert!(notary.document_is_valid(cert, cert));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let notary = LocalNotary::generate();
        let component = Component::Catalog(
            Catalog::new()
                .with("tag", Component::Tag(Tag::from_canonical("T1")))
                .with("version", Component::Version(Version::parse("v1").unwrap())),
        );
        let doc = notary.sign(component).unwrap();
        assert_eq!(doc.certificate, Some(notary.get_citation()));
        assert!(notary.document_is_valid(&doc, notary.certificate()));
    }

    #[test]
    fn citation_matches_detects_tamper() {
        let notary = LocalNotary::generate();
        let component = Component::Catalog(
            Catalog::new()
                .with("tag", Component::Tag(Tag::from_canonical("T1")))
                .with("version", Component::Version(Version::parse("v1").unwrap())),
        );
        let doc = notary.sign(component).unwrap();
        let citation = notary.cite(&doc).unwrap();
        assert!(notary.citation_matches(&citation, &doc));

        let mut tampered = doc.clone();
        tampered.timestamp += 1;
        assert!(!notary.citation_matches(&citation, &tampered));
    }

    #[test]
    fn invalid_signature_is_rejected() {
        let notary = LocalNotary::generate();
        let other = LocalNotary::generate();
        let component = Component::Catalog(
            Catalog::new()
                .with("tag", Component::Tag(Tag::from_canonical("T1")))
                .with("version", Component::Version(Version::parse("v1").unwrap())),
        );
        let doc = notary.sign(component).unwrap();
        assert!(!other.document_is_valid(&doc, other.certificate()));
    }
}
