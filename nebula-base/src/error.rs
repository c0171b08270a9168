// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system
// 4. A stable `kind` every caller (in particular the HTTP service) can match on without
//    parsing message text.

use std::borrow::Cow;
use std::fmt;

use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

/// The taxonomy of failures the core recognizes. Named after the error kinds in the
/// repository's own error handling design, not after any particular collaborator's
/// exception types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    InvalidCitation,
    AlreadyExists,
    DocumentMissing,
    CertificateMissing,
    DocumentInvalid,
    ChainTooDeep,
    ServerError,
    NetworkError,
    InvalidRequest,
    NotAllowed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidParameter => "invalid-parameter",
            ErrorKind::InvalidCitation => "invalid-citation",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::DocumentMissing => "document-missing",
            ErrorKind::CertificateMissing => "certificate-missing",
            ErrorKind::DocumentInvalid => "document-invalid",
            ErrorKind::ChainTooDeep => "chain-too-deep",
            ErrorKind::ServerError => "server-error",
            ErrorKind::NetworkError => "network-error",
            ErrorKind::InvalidRequest => "invalid-request",
            ErrorKind::NotAllowed => "not-allowed",
        };
        f.write_str(s)
    }
}

struct SimpleErr(Cow<'static, str>);
impl fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {}

/// A single structured error value: {kind, operation, account, identifier, cause}.
/// The wire layer maps `kind` to an HTTP status; nothing upstream needs to parse text.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    operation: Cow<'static, str>,
    account_id: Option<String>,
    identifier: Option<String>,
    cause: Option<DynBacktraceError>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, operation: impl Into<Cow<'static, str>>) -> Error {
        Error {
            kind,
            operation: operation.into(),
            account_id: None,
            identifier: None,
            cause: None,
        }
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Error {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Error {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_cause<E: std::error::Error + Send + Sync + 'static>(mut self, cause: E) -> Error {
        self.cause = Some(DynBacktraceError::from(cause));
        self.log();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    fn log(&self) {
        error!(
            target: "nebula",
            kind = %self.kind,
            operation = %self.operation,
            account = self.account_id.as_deref().unwrap_or("-"),
            identifier = self.identifier.as_deref().unwrap_or("-"),
            cause = ?self.cause,
            "operation failed",
        );
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({})", self.operation, self.kind)?;
        if let Some(account) = &self.account_id {
            write!(f, " account={account}")?;
        }
        if let Some(identifier) = &self.identifier {
            write!(f, " identifier={identifier}")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// Shorthand for a kind-less, causeless error carrying only a message. Used for the
/// handful of internal invariant checks that aren't reachable through the public API
/// and so never need a `kind` a caller would match on.
pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(ErrorKind::InvalidParameter, "internal").with_cause(SimpleErr(msg.into()))
}

/// Attaches operation/kind context to a foreign `Result`, the way every Client API
/// operation is required to wrap the root cause from the notary, repository, or
/// validator before surfacing it.
pub trait Context<T> {
    fn context(self, kind: ErrorKind, operation: &'static str) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T> for std::result::Result<T, E> {
    fn context(self, kind: ErrorKind, operation: &'static str) -> Result<T> {
        self.map_err(|e| Error::new(kind, operation).with_cause(e))
    }
}

#[test]
fn test_error() {
    let e = err("test error");
    assert_eq!(e.kind(), ErrorKind::InvalidParameter);
    assert!(format!("{e}").contains("test error"));
}

#[test]
fn test_error_context() {
    let e = Error::new(ErrorKind::DocumentMissing, "retrieveDocument")
        .with_account("acct-1")
        .with_identifier("tag1v1")
        .with_cause(SimpleErr("not found".into()));
    assert_eq!(e.kind(), ErrorKind::DocumentMissing);
    assert_eq!(e.account_id(), Some("acct-1"));
    assert_eq!(e.identifier(), Some("tag1v1"));
    assert!(format!("{e}").contains("not found"));
}
