//! Request assembly and execution.
//!
//! # Design
//! `build` folds the options into a `Builder`, validates it and produces a
//! `Requester`: the assembled `Request` bound to its transport and response
//! handler. The network is not touched until `execute`.
//!
//! `execute` coordinates one round-trip and owns the body rules:
//! - transport error: returned as-is, no response exists;
//! - handler error: returned with the response; the handler already dealt
//!   with the body;
//! - success without a target: the response comes back with its body open
//!   and the caller owns it from here;
//! - success with a target: the body is decoded into the target and closed,
//!   whatever the decode outcome.

use std::sync::Arc;

use serde::de::{DeserializeOwned, IgnoredAny};
use url::Url;

use crate::classify::{ResponseHandler, StatusClassifier};
use crate::context::Context;
use crate::error::{Error, ExecuteError};
use crate::http::{Body, Method, MultiMap, Request, Response, Scheme};
use crate::options::{Builder, RequestOption};
use crate::transport::{Transport, UreqTransport};

pub const DEFAULT_SCHEME: Scheme = Scheme::Http;
pub const DEFAULT_METHOD: Method = Method::Get;

/// An assembled request bound to its transport and response handler.
///
/// Reusable: each `execute` sends a fresh copy of the same request.
#[derive(Clone)]
pub struct Requester {
    request: Request,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn ResponseHandler>,
}

/// Apply `options` in order and assemble the result.
///
/// Fails with [`Error::MissingHost`] when no host was set, before anything
/// else is looked at.
pub fn build(options: impl IntoIterator<Item = RequestOption>) -> Result<Requester, Error> {
    assemble(Builder::apply(options))
}

fn assemble(builder: Builder) -> Result<Requester, Error> {
    if builder.host.is_empty() {
        return Err(Error::MissingHost);
    }

    let scheme = builder.scheme.unwrap_or(DEFAULT_SCHEME);
    let method = builder.method.unwrap_or(DEFAULT_METHOD);

    let mut url = Url::parse(&format!("{scheme}://{}", builder.host))?;
    if !is_bare_authority(&url) {
        return Err(Error::InvalidHost(builder.host));
    }
    url.set_path(&builder.path);
    add_query_args(&mut url, &builder.query_args);

    let request = Request {
        method,
        url,
        headers: flatten(&builder.headers),
        body: builder.body,
        context: Context::background(),
    };

    let transport: Arc<dyn Transport> = match builder.transport {
        Some(transport) => transport,
        None => Arc::new(UreqTransport::new()),
    };
    let handler: Arc<dyn ResponseHandler> = match builder.response_handler {
        Some(handler) => handler,
        None => Arc::new(StatusClassifier),
    };

    Ok(Requester {
        request,
        transport,
        handler,
    })
}

/// The host option may carry a port, nothing else of a URL.
fn is_bare_authority(url: &Url) -> bool {
    url.username().is_empty()
        && url.password().is_none()
        && url.path() == "/"
        && url.query().is_none()
        && url.fragment().is_none()
}

fn add_query_args(url: &mut Url, args: &MultiMap) {
    if args.values().all(Vec::is_empty) {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, values) in args {
        for value in values {
            pairs.append_pair(key, value);
        }
    }
}

fn flatten(headers: &MultiMap) -> Vec<(String, String)> {
    headers
        .iter()
        .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
        .collect()
}

impl Requester {
    /// The request every `execute` call sends.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Send the request and, when `target` is given, decode the body into it.
    ///
    /// `target` is only written when decoding succeeds.
    pub fn execute<T>(&self, ctx: &Context, target: Option<&mut T>) -> Result<Response, ExecuteError>
    where
        T: DeserializeOwned,
    {
        let request = self.request.with_context(ctx.clone());
        let mut response = self
            .transport
            .send(&request)
            .map_err(|e| ExecuteError::new(None, Error::Transport(e)))?;

        if let Err(error) = self.handler.handle(&mut response) {
            return Err(ExecuteError::new(Some(response), error));
        }

        let Some(target) = target else {
            return Ok(response);
        };

        let decoded = {
            let guard = ClosingBody(&mut response.body);
            decode::<T>(guard.0)
        };
        match decoded {
            Ok(value) => {
                *target = value;
                Ok(response)
            }
            Err(e) => Err(ExecuteError::new(Some(response), Error::Decode(e))),
        }
    }

    /// `execute` without a decode target; the caller owns the open body.
    pub fn send(&self, ctx: &Context) -> Result<Response, ExecuteError> {
        self.execute::<IgnoredAny>(ctx, None)
    }
}

/// Closes the borrowed body when dropped.
struct ClosingBody<'a>(&'a mut Body);

impl Drop for ClosingBody<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Decode the first JSON value in `body`; anything after it is ignored.
fn decode<T: DeserializeOwned>(body: &mut Body) -> Result<T, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_reader(body);
    serde::Deserialize::deserialize(&mut de)
}
