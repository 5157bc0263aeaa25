//! Builder state and the options that configure it.
//!
//! # Design
//! A `RequestOption` is a deferred mutation of `Builder`. Options are applied
//! strictly in argument order and perform no validation; `build` validates
//! the folded state afterwards. Every option overwrites its field wholesale.
//! Passing `with_headers` twice keeps only the second map, and multiple
//! values accumulate only inside a single map.

use std::fmt;
use std::sync::Arc;

use crate::classify::ResponseHandler;
use crate::http::{Method, MultiMap, Scheme};
use crate::transport::Transport;

/// A deferred configuration step.
pub type RequestOption = Box<dyn FnOnce(&mut Builder)>;

/// In-progress request configuration.
///
/// Starts zero-valued; only options mutate it.
#[derive(Default)]
pub struct Builder {
    pub(crate) scheme: Option<Scheme>,
    pub(crate) method: Option<Method>,
    pub(crate) host: String,
    pub(crate) path: String,
    pub(crate) headers: MultiMap,
    pub(crate) query_args: MultiMap,
    pub(crate) body: Vec<u8>,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) response_handler: Option<Arc<dyn ResponseHandler>>,
}

impl Builder {
    /// Fold `options` over a zero-valued builder.
    pub fn apply(options: impl IntoIterator<Item = RequestOption>) -> Self {
        let mut builder = Self::default();
        for option in options {
            option(&mut builder);
        }
        builder
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("scheme", &self.scheme)
            .field("method", &self.method)
            .field("host", &self.host)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("query_args", &self.query_args)
            .field("body_len", &self.body.len())
            .field("custom_transport", &self.transport.is_some())
            .field("custom_response_handler", &self.response_handler.is_some())
            .finish()
    }
}

pub fn with_method(method: Method) -> RequestOption {
    Box::new(move |b: &mut Builder| b.method = Some(method))
}

pub fn with_scheme(scheme: Scheme) -> RequestOption {
    Box::new(move |b: &mut Builder| b.scheme = Some(scheme))
}

pub fn with_host(host: impl Into<String>) -> RequestOption {
    let host = host.into();
    Box::new(move |b: &mut Builder| b.host = host)
}

/// Set the path from segments joined with `/` and cleaned.
///
/// Zero segments give an empty path.
pub fn with_path<I, S>(segments: I) -> RequestOption
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let path = join_path(segments);
    Box::new(move |b: &mut Builder| b.path = path)
}

/// Replace the header set. Each value is sent, in order, under its name.
pub fn with_headers<I, K, V, S>(headers: I) -> RequestOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    let headers = collect_multi(headers);
    Box::new(move |b: &mut Builder| b.headers = headers)
}

/// Replace the query argument set. Each value becomes a repeated parameter.
pub fn with_query_args<I, K, V, S>(query_args: I) -> RequestOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    let query_args = collect_multi(query_args);
    Box::new(move |b: &mut Builder| b.query_args = query_args)
}

/// Raw request payload, sent as-is.
pub fn with_body(body: impl Into<Vec<u8>>) -> RequestOption {
    let body = body.into();
    Box::new(move |b: &mut Builder| b.body = body)
}

pub fn with_transport(transport: impl Transport + 'static) -> RequestOption {
    let transport: Arc<dyn Transport> = Arc::new(transport);
    Box::new(move |b: &mut Builder| b.transport = Some(transport))
}

pub fn with_response_handler(handler: impl ResponseHandler + 'static) -> RequestOption {
    let handler: Arc<dyn ResponseHandler> = Arc::new(handler);
    Box::new(move |b: &mut Builder| b.response_handler = Some(handler))
}

fn collect_multi<I, K, V, S>(pairs: I) -> MultiMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut map = MultiMap::new();
    for (key, values) in pairs {
        map.entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }
    map
}

/// Join path segments with `/`, then collapse repeated separators and
/// resolve `.` and `..`. Empty segments are skipped; a leading `/` on the
/// joined result is kept.
pub fn join_path<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = segments
        .into_iter()
        .filter(|s| !s.as_ref().is_empty())
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return joined;
    }

    let rooted = joined.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                // `..` above the root is dropped.
                _ if rooted => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }

    let cleaned = parts.join("/");
    match (rooted, cleaned.is_empty()) {
        (true, _) => format!("/{cleaned}"),
        (false, true) => ".".to_string(),
        (false, false) => cleaned,
    }
}
