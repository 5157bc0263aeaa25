//! Transport capability and the default blocking `ureq` implementation.
//!
//! # Design
//! A `Transport` sends one assembled `Request` and returns whatever came
//! back, status included; interpreting the status is the handler's job. Its
//! errors are boxed and travel to the caller untouched.
//!
//! `UreqTransport` is the general-purpose default. It honours the context
//! bound to the request: a cancelled or expired context fails before
//! dispatch, and a live deadline becomes ureq's per-request global timeout.
//! The blocking call runs on a worker thread while the caller watches the
//! context, so cancelling mid-flight returns at once. The abandoned worker
//! finishes or times out on its own and its result is dropped. Once the
//! response head is back, reading the body is no longer watched.
//! For connection, proxy or TLS settings, build your own `ureq::Agent` and
//! hand it to `UreqTransport::with_agent`.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::error::TransportError;
use crate::http::{Body, Method, Request, Response};

/// Sends an assembled request.
///
/// Any `Fn(&Request) -> Result<Response, TransportError>` closure is a
/// transport.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&Request) -> Result<Response, TransportError> + Send + Sync,
{
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self(request)
    }
}

/// How often a waiting caller rechecks the context.
const CONTEXT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default transport backed by a blocking `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// Bare-bones agent. Non-2xx statuses are returned as responses, not
    /// errors, so the response handler sees every status.
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a caller-configured agent. It should have `http_status_as_error`
    /// disabled, otherwise 4xx/5xx arrive as transport errors.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }

    /// Blocking round trip on the calling thread.
    fn round_trip(agent: &Agent, request: &Request) -> Result<Response, TransportError> {
        let response = dispatch(agent, request, request.context.remaining())?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        log::debug!("{} {} -> {status}", request.method, request.url);

        Ok(Response {
            status,
            headers,
            body: Body::from_reader(response.into_body().into_reader()),
        })
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        if let Some(err) = request.context.err() {
            log::debug!("not sending {} {}: {err}", request.method, request.url);
            return Err(Box::new(err));
        }

        log::debug!("sending {} {}", request.method, request.url);
        let (tx, rx) = mpsc::channel();
        let agent = self.agent.clone();
        let worker_request = request.clone();
        thread::Builder::new()
            .name("ureq-transport".to_string())
            .spawn(move || {
                // the receiver is gone if the caller gave up; nothing to report
                let _ = tx.send(Self::round_trip(&agent, &worker_request));
            })?;

        loop {
            match rx.recv_timeout(CONTEXT_POLL_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(err) = request.context.err() {
                        log::debug!("abandoning {} {}: {err}", request.method, request.url);
                        return Err(Box::new(err));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Box::new(TransportPanicked));
                }
            }
        }
    }
}

/// The worker thread died without reporting a result.
#[derive(Debug, thiserror::Error)]
#[error("transport worker exited without a response")]
struct TransportPanicked;

fn dispatch(
    agent: &Agent,
    request: &Request,
    timeout: Option<Duration>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let url = request.url.as_str();
    match request.method {
        Method::Get => send_without_body(agent.get(url), request, timeout),
        Method::Delete => send_without_body(agent.delete(url), request, timeout),
        Method::Post => send_with_body(agent.post(url), request, timeout),
        Method::Put => send_with_body(agent.put(url), request, timeout),
        Method::Patch => send_with_body(agent.patch(url), request, timeout),
    }
}

fn send_without_body(
    builder: RequestBuilder<WithoutBody>,
    request: &Request,
    timeout: Option<Duration>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = configure(builder, request, timeout);
    if request.body.is_empty() {
        builder.call()
    } else {
        builder.force_send_body().send(&request.body[..])
    }
}

fn send_with_body(
    builder: RequestBuilder<WithBody>,
    request: &Request,
    timeout: Option<Duration>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    configure(builder, request, timeout).send(&request.body[..])
}

fn configure<B>(
    mut builder: RequestBuilder<B>,
    request: &Request,
    timeout: Option<Duration>,
) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = timeout {
        builder = builder.config().timeout_global(Some(timeout)).build();
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextError};
    use url::Url;

    fn request(context: Context) -> Request {
        Request {
            method: Method::Get,
            // Nothing listens on port 9 (discard); the context check must
            // fail before any connection attempt.
            url: Url::parse("http://127.0.0.1:9/").unwrap(),
            headers: Vec::new(),
            body: Vec::new(),
            context,
        }
    }

    #[test]
    fn cancelled_context_fails_before_dispatch() {
        let (ctx, token) = Context::background().with_cancel();
        token.cancel();
        let err = UreqTransport::new().send(&request(ctx)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ContextError>(),
            Some(&ContextError::Canceled)
        );
    }

    #[test]
    fn expired_deadline_fails_before_dispatch() {
        let ctx = Context::background().with_timeout(Duration::ZERO);
        let err = UreqTransport::new().send(&request(ctx)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ContextError>(),
            Some(&ContextError::DeadlineExceeded)
        );
    }

    #[test]
    fn cancelling_mid_flight_returns_without_waiting_for_the_server() {
        // Accepts at the kernel level and never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut req = request(Context::background());
        req.url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();

        let (ctx, token) = Context::background().with_cancel();
        let req = req.with_context(ctx);
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        });

        let started = std::time::Instant::now();
        let err = UreqTransport::new().send(&req).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            err.downcast_ref::<ContextError>(),
            Some(&ContextError::Canceled)
        );
        canceller.join().unwrap();
        drop(listener);
    }

    #[test]
    fn closures_are_transports() {
        let transport = |req: &Request| -> Result<Response, TransportError> {
            Ok(Response::new(200, Body::from_bytes(req.url.as_str())))
        };
        let mut resp = transport.send(&request(Context::background())).unwrap();
        assert_eq!(resp.body.read_all().unwrap(), b"http://127.0.0.1:9/");
    }
}
