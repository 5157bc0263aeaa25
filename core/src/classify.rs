//! Response classification: the default `ResponseHandler`.
//!
//! # Design
//! A handler inspects a completed response and returns `Ok(())` when the
//! caller may use it. When it rejects a response it owns the body's
//! lifecycle: the engine adds no cleanup of its own on that path.
//!
//! `StatusClassifier` accepts the 2xx success set and the 3xx redirect set.
//! Redirects pass through as acceptable outcomes; nothing here follows them.
//! Everything else is drained, closed and reported as a `ResponseError`.

use std::io::Read;

use crate::error::{Error, ResponseError};
use crate::http::Response;

/// Status codes accepted as success.
pub const SUCCESS_CODES: [u16; 10] = [200, 201, 202, 203, 204, 205, 206, 207, 208, 226];

/// Status codes accepted as redirects.
pub const REDIRECT_CODES: [u16; 8] = [300, 301, 302, 303, 304, 305, 307, 308];

/// Decides whether a response is acceptable.
///
/// Any `Fn(&mut Response) -> Result<(), Error>` closure is a handler.
pub trait ResponseHandler: Send + Sync {
    fn handle(&self, response: &mut Response) -> Result<(), Error>;
}

impl<F> ResponseHandler for F
where
    F: Fn(&mut Response) -> Result<(), Error> + Send + Sync,
{
    fn handle(&self, response: &mut Response) -> Result<(), Error> {
        self(response)
    }
}

/// Outcome of classifying a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirect,
    Failure,
}

/// The default response handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier;

impl StatusClassifier {
    pub fn classify(status: u16) -> StatusClass {
        if SUCCESS_CODES.contains(&status) {
            StatusClass::Success
        } else if REDIRECT_CODES.contains(&status) {
            StatusClass::Redirect
        } else {
            StatusClass::Failure
        }
    }
}

impl ResponseHandler for StatusClassifier {
    fn handle(&self, response: &mut Response) -> Result<(), Error> {
        match Self::classify(response.status) {
            StatusClass::Success | StatusClass::Redirect => Ok(()),
            StatusClass::Failure => {
                // A body that fails mid-read still reports what arrived.
                let mut body = Vec::new();
                let _ = response.body.read_to_end(&mut body);
                response.body.close();
                Err(ResponseError::new(response.status, body).into())
            }
        }
    }
}
