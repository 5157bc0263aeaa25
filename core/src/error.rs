//! Error types for request building and execution.
//!
//! # Design
//! `ResponseError` is the classified failure produced for an unacceptable
//! status. It is stored by value everywhere it travels (inside
//! `Error::Response`, inside `ExecuteError`), and every predicate in this
//! module matches that by-value form. A custom handler may still box one
//! into `Error::Handler`; the predicates look there too.
//!
//! `ExecuteError` pairs an `Error` with the response that produced it, so
//! callers still see status and headers after a handler or decode failure.
//! The response is `None` only when the transport itself failed.

use std::fmt;

use thiserror::Error;

use crate::http::Response;

/// Boxed error returned by transports and custom handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by a [`crate::Transport`]; passed through untouched.
pub type TransportError = BoxError;

/// A response whose status is neither success nor an accepted redirect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request failed: response not OK, status: {status}, body: {}", String::from_utf8_lossy(.body))]
pub struct ResponseError {
    status: u16,
    body: Vec<u8>,
}

impl ResponseError {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw response body as read by the classifier.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Everything that can go wrong between `build` and a decoded target.
#[derive(Debug, Error)]
pub enum Error {
    /// The builder had no host; nothing was assembled.
    #[error("missing host from request builder")]
    MissingHost,

    /// Scheme, host and path did not form a valid URL.
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The host carried more than an authority (userinfo, path, query or
    /// fragment).
    #[error("invalid host {0:?}: expected host[:port]")]
    InvalidHost(String),

    /// The transport failed before a response was available.
    #[error(transparent)]
    Transport(TransportError),

    /// The response handler rejected the status.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// A decode target was given but the body was not valid JSON for it.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A custom response handler failed for its own reasons.
    #[error(transparent)]
    Handler(BoxError),
}

impl Error {
    pub fn is_response_error(&self) -> bool {
        self.as_response_error().is_some()
    }

    /// The classified failure carried by this error, including one a custom
    /// handler boxed into `Handler`.
    pub fn as_response_error(&self) -> Option<&ResponseError> {
        match self {
            Error::Response(e) => Some(e),
            Error::Handler(e) => e.downcast_ref::<ResponseError>().or_else(|| {
                e.downcast_ref::<Error>()
                    .and_then(Error::as_response_error)
            }),
            _ => None,
        }
    }
}

/// Failure of [`crate::Requester::execute`].
pub struct ExecuteError {
    response: Option<Response>,
    error: Error,
}

impl ExecuteError {
    pub(crate) fn new(response: Option<Response>, error: Error) -> Self {
        Self { response, error }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn into_parts(self) -> (Option<Response>, Error) {
        (self.response, self.error)
    }

    pub fn is_response_error(&self) -> bool {
        self.error.is_response_error()
    }
}

impl From<ExecuteError> for Error {
    fn from(e: ExecuteError) -> Self {
        e.error
    }
}

impl fmt::Debug for ExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteError")
            .field("status", &self.response.as_ref().map(|r| r.status))
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for ExecuteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Report whether `err`, or any error in its `source()` chain, is a
/// classified response failure, whichever of this crate's wrappers it
/// arrives in.
pub fn is_response_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<ResponseError>() {
            return true;
        }
        if e.downcast_ref::<Error>().is_some_and(Error::is_response_error) {
            return true;
        }
        if e
            .downcast_ref::<ExecuteError>()
            .is_some_and(ExecuteError::is_response_error)
        {
            return true;
        }
        current = e.source();
    }
    false
}
