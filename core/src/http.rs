//! HTTP data types shared by the assembler, the transports and the engine.
//!
//! # Design
//! `Request` is plain data: everything a transport needs to put bytes on the
//! wire, plus the `Context` bound by the engine right before dispatch.
//! `Response` is plain data too, except for its `Body`, which is a
//! single-owner stream. Whoever holds the body is responsible for closing it;
//! reading a closed body yields no data.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};

use strum::{AsRefStr, Display, EnumString};
use url::Url;

use crate::context::Context;

/// Multi-valued name/value set used for headers and query arguments.
///
/// Values under one name keep their insertion order; distinct names iterate
/// in sorted order.
pub type MultiMap = BTreeMap<String, Vec<String>>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// URL scheme for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

/// An assembled, ready-to-send HTTP request.
///
/// Produced once by [`crate::build`]. Headers are flattened into ordered
/// `(name, value)` pairs so repeated names survive; the query string is
/// already encoded into `url`.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub context: Context,
}

impl Request {
    /// Return a copy of this request bound to `context`.
    pub fn with_context(&self, context: Context) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    /// All values sent under header `name`, compared case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response returned by a [`crate::Transport`].
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl Response {
    pub fn new(status: u16, body: Body) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Single-owner response body stream.
pub struct Body {
    reader: Option<Box<dyn Read + Send>>,
}

impl Body {
    pub fn empty() -> Self {
        Self::from_bytes(Vec::new())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(io::Cursor::new(bytes.into()))
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Some(Box::new(reader)),
        }
    }

    /// Release the underlying stream. Idempotent.
    pub fn close(&mut self) {
        self.reader = None;
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Read the remainder of the stream into memory.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_round_trips_through_strings() {
        assert_eq!(Method::Patch.to_string(), "PATCH");
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn scheme_is_lowercase() {
        assert_eq!(Scheme::Https.as_ref(), "https");
        assert_eq!("http".parse::<Scheme>().unwrap(), Scheme::Http);
    }

    #[test]
    fn closed_body_reads_nothing() {
        let mut body = Body::from_bytes("hello");
        let mut first = [0u8; 2];
        body.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"he");

        body.close();
        assert!(body.is_closed());
        assert!(body.read_all().unwrap().is_empty());

        // closing twice is fine
        body.close();
        assert!(body.is_closed());
    }

    #[test]
    fn responses_cross_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<Body>();
        assert_send::<Response>();
        assert_send::<crate::ExecuteError>();

        let mut response = Response::new(200, Body::from_bytes("moved"));
        let body = std::thread::spawn(move || response.body.read_all().unwrap())
            .join()
            .unwrap();
        assert_eq!(body, b"moved");
    }

    #[test]
    fn response_header_lookup_ignores_case() {
        let mut response = Response::new(200, Body::empty());
        response
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
    }
}
