use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use nebula_base::{err, Result};
use nebula_vers::{Citation, Tag, Version};

use crate::{Catalog, NotarizedDocument};

/// The opaque parse tree every caller consumes through two narrow operations:
/// `get_value`/`get_parameters`. Variants beyond `Catalog` exist so a catalog's
/// values can hold the primitives `{tag, version, permissions, previous}` call for,
/// plus the one control-flow-relevant shape: a nested notarized document, so chain
/// validation can recognize "inner document reached" as data instead of inferring it
/// from a failed reparse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Component {
    Text(String),
    Number(OrderedFloat<f64>),
    Bytes(Vec<u8>),
    Tag(Tag),
    Version(Version),
    Reference(Citation),
    List(Vec<Component>),
    Catalog(Catalog),
    Document(Box<NotarizedDocument>),
}

impl Component {
    /// Returns a named child when `self` is a `Catalog`; `None` for every other
    /// shape, including when the catalog simply has no entry of that name.
    pub fn get_value(&self, name: &str) -> Option<&Component> {
        match self {
            Component::Catalog(cat) => cat.get(name),
            _ => None,
        }
    }

    /// Returns the catalog backing `self`, if any.
    pub fn get_parameters(&self) -> Option<&Catalog> {
        match self {
            Component::Catalog(cat) => Some(cat),
            _ => None,
        }
    }

    /// True for the tagged variant chain validation treats as "the inner document",
    /// per spec.md §9's resolution of the original's parse-failure-as-signal pattern.
    pub fn as_notarized_document(&self) -> Option<&NotarizedDocument> {
        match self {
            Component::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Canonical UTF-8 bytes for this component. The document-language grammar
    /// itself is out of scope (spec.md §1); this format only has to be internally
    /// consistent and round-trip byte-for-byte, which a deterministic map order
    /// (see `Catalog`) and a compact JSON encoding both guarantee.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("component serialization is infallible")
    }

    pub fn parse_canonical(bytes: &[u8]) -> Result<Component> {
        serde_json::from_slice(bytes).map_err(|e| err(format!("malformed component: {e}")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_byte_for_byte() {
        let cat = Catalog::new()
            .with("tag", Component::Tag(Tag::from_canonical("T1")))
            .with("version", Component::Version(Version::parse("v1.2").unwrap()))
            .with("items", Component::List(vec![Component::Number(OrderedFloat(1.5)), Component::Text("x".into())]));
        let component = Component::Catalog(cat);
        let bytes = component.to_canonical_bytes();
        let parsed = Component::parse_canonical(&bytes).unwrap();
        assert_eq!(parsed, component);
        assert_eq!(parsed.to_canonical_bytes(), bytes);
    }

    #[test]
    fn get_value_only_works_on_catalogs() {
        let text = Component::Text("hi".into());
        assert_eq!(text.get_value("anything"), None);
        assert_eq!(text.get_parameters(), None);
    }
}
