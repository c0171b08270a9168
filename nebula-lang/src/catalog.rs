use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use nebula_vers::{Citation, Tag, Version};

use crate::Component;

/// A name-ordered mapping of components. `BTreeMap` gives us the canonical,
/// deterministic iteration order the serializer needs for byte-equivalent
/// round-trips without any extra bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog(BTreeMap<String, Component>);

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Component) {
        self.0.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: Component) -> Catalog {
        self.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Component)> {
        self.0.iter()
    }

    /// The `tag` parameter, if present and well-typed.
    pub fn tag(&self) -> Option<Tag> {
        match self.get("tag") {
            Some(Component::Tag(t)) => Some(t.clone()),
            _ => None,
        }
    }

    /// The `version` parameter, if present and well-typed.
    pub fn version(&self) -> Option<Version> {
        match self.get("version") {
            Some(Component::Version(v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// The `previous` parameter: `NONE` unless a `Reference` citation is present.
    pub fn previous(&self) -> Option<Citation> {
        match self.get("previous") {
            Some(Component::Reference(c)) => Some(c.clone()),
            _ => None,
        }
    }

    /// The `permissions` parameter, if present and well-typed.
    pub fn permissions(&self) -> Option<&str> {
        match self.get("permissions") {
            Some(Component::Text(s)) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_reserved_parameters() {
        let tag = Tag::from_canonical("T1");
        let version = Version::parse("v1.0").unwrap();
        let cat = Catalog::new()
            .with("tag", Component::Tag(tag.clone()))
            .with("version", Component::Version(version.clone()))
            .with("permissions", Component::Text("/bali/permissions/private/v1".into()));
        assert_eq!(cat.tag(), Some(tag));
        assert_eq!(cat.version(), Some(version));
        assert_eq!(cat.permissions(), Some("/bali/permissions/private/v1"));
        assert_eq!(cat.previous(), None);
    }
}
