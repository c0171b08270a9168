use nebula_auth::Notary;
use nebula_base::{Error, ErrorKind, Result};
use nebula_lang::{Catalog, Component, NotarizedDocument};
use nebula_vers::{Tag, Version};

/// A fresh, single-use authorization document (spec.md §4.8): a catalog with fresh
/// `tag`/`version`, the well-known private-permission marker, and no `previous`,
/// signed under `notary`. The server recovers the signer's account from
/// `certificate` (always set by `Notary::sign`) and validates the signature against
/// its stored copy of that certificate.
pub fn fresh_credentials(notary: &dyn Notary) -> Result<NotarizedDocument> {
    let catalog = Catalog::new()
        .with("tag", Component::Tag(Tag::generate()))
        .with("version", Component::Version(Version::parse("v1").expect("literal version parses")))
        .with("permissions", Component::Text("/bali/permissions/private/v1".into()));
    notary.sign(Component::Catalog(catalog))
}

/// The inline-quoted rendering the `Nebula-Credentials` header carries: canonical
/// JSON bytes, escaped into a single double-quoted line.
pub fn header_value(credentials: &NotarizedDocument) -> String {
    let json = String::from_utf8(credentials.to_canonical_bytes()).expect("canonical bytes are UTF-8 JSON");
    serde_json::to_string(&json).expect("re-quoting a string is infallible")
}

/// The inverse of `header_value`: unquotes the header's single line back into
/// canonical JSON bytes and parses the credential document. The server still has to
/// validate the result against its own stored certificates (spec.md §4.8) — this
/// only recovers the document a caller is claiming.
pub fn parse_header_value(raw: &str) -> Result<NotarizedDocument> {
    let json: String = serde_json::from_str(raw)
        .map_err(|e| Error::new(ErrorKind::InvalidRequest, "parseCredentials").with_cause(e))?;
    NotarizedDocument::parse_canonical(json.as_bytes())
        .map_err(|e| Error::new(ErrorKind::InvalidRequest, "parseCredentials").with_cause(e))
}
