//! Option-driven HTTP request builder.
//!
//! # Overview
//! Options configure a `Builder`; `build` assembles it into a `Requester`
//! bound to a transport and a response handler; `Requester::execute` sends
//! the request, classifies the response and optionally decodes its JSON body
//! into a caller-owned target.
//!
//! ```no_run
//! use request_core::{build, with_host, with_path, with_scheme, Context, Scheme};
//!
//! #[derive(serde::Deserialize, Default)]
//! struct Item {
//!     name: String,
//! }
//!
//! let requester = build([
//!     with_scheme(Scheme::Https),
//!     with_host("api.example.com"),
//!     with_path(["items", "42"]),
//! ])?;
//!
//! let mut item = Item::default();
//! requester.execute(&Context::background(), Some(&mut item))?;
//! println!("{}", item.name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Design
//! - Options overwrite, never merge; validation waits for `build`.
//! - `Transport` and `ResponseHandler` are one-method traits, implemented by
//!   plain closures as well as by `UreqTransport` and `StatusClassifier`.
//! - Body ownership is explicit: it goes back to the caller open only on
//!   success without a decode target. Every other path closes it.
//! - No retries. The assembler, classifier and engine never log; every
//!   failure is returned once, to the caller.

pub mod classify;
pub mod client;
pub mod context;
pub mod error;
pub mod http;
pub mod options;
pub mod transport;

pub use classify::{ResponseHandler, StatusClass, StatusClassifier, REDIRECT_CODES, SUCCESS_CODES};
pub use client::{build, Requester, DEFAULT_METHOD, DEFAULT_SCHEME};
pub use context::{Context, ContextError};
pub use error::{is_response_error, BoxError, Error, ExecuteError, ResponseError, TransportError};
pub use http::{Body, Method, MultiMap, Request, Response, Scheme};
pub use options::{
    join_path, with_body, with_headers, with_host, with_method, with_path, with_query_args,
    with_response_handler, with_scheme, with_transport, Builder, RequestOption,
};
pub use transport::{Transport, UreqTransport};

pub use tokio_util::sync::CancellationToken;
