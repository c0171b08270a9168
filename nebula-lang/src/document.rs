use serde::{Deserialize, Serialize};

use nebula_vers::{Citation, Tag};

use crate::Component;

/// A component wrapped with `{component, protocol, timestamp, certificate,
/// signature}` and signed under the key named by `certificate`, plus a possibly-`NONE`
/// `previous` citation. `certificate == None` marks a self-signed document (the root
/// of trust, or a bootstrap credential).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotarizedDocument {
    pub component: Component,
    pub protocol: String,
    pub timestamp: i64,
    pub certificate: Option<Citation>,
    pub signature: Vec<u8>,
    pub previous: Option<Citation>,
}

impl NotarizedDocument {
    /// The bytes a notary signs: everything except the signature itself.
    pub fn signable_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct Unsigned<'a> {
            component: &'a Component,
            protocol: &'a str,
            timestamp: i64,
            certificate: &'a Option<Citation>,
            previous: &'a Option<Citation>,
        }
        serde_json::to_vec(&Unsigned {
            component: &self.component,
            protocol: &self.protocol,
            timestamp: self.timestamp,
            certificate: &self.certificate,
            previous: &self.previous,
        })
        .expect("notarized document payload serialization is infallible")
    }

    /// The full signed bytes: what gets hashed for a citation and what gets stored.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("notarized document serialization is infallible")
    }

    pub fn parse_canonical(bytes: &[u8]) -> Result<NotarizedDocument, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn is_self_signed(&self) -> bool {
        self.certificate.is_none()
    }

    /// `account` parameter of a certificate's component.
    pub fn account(&self) -> Option<Tag> {
        match self.component.get_value("account") {
            Some(Component::Tag(t)) => Some(t.clone()),
            _ => None,
        }
    }

    /// `publicKey` parameter of a certificate's component.
    pub fn public_key(&self) -> Option<&[u8]> {
        match self.component.get_value("publicKey") {
            Some(Component::Bytes(b)) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Catalog;

    #[test]
    fn self_signed_has_no_certificate() {
        let doc = NotarizedDocument {
            component: Component::Catalog(Catalog::new()),
            protocol: "v1.0".into(),
            timestamp: 0,
            certificate: None,
            signature: vec![],
            previous: None,
        };
        assert!(doc.is_self_signed());
    }

    #[test]
    fn signable_bytes_excludes_signature() {
        let mut doc = NotarizedDocument {
            component: Component::Catalog(Catalog::new()),
            protocol: "v1.0".into(),
            timestamp: 0,
            certificate: None,
            signature: vec![],
            previous: None,
        };
        let before = doc.signable_bytes();
        doc.signature = vec![1, 2, 3];
        let after = doc.signable_bytes();
        assert_eq!(before, after);
        assert_ne!(doc.to_canonical_bytes(), before);
    }
}
