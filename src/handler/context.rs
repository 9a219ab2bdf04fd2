//! Per-request state handed to codecs and functions.
//!
//! - [`ExecutionContext`] - request-scoped handle that observes cancellation
//! - [`Header`] - header bag built fresh from the request headers
//! - [`RequestContext`] - everything a codec needs to bind, invoke and encode
//!
//! # Example
//!
//! ```ignore
//! async fn whoami(ctx: ExecutionContext, header: Header) -> Payload<String> {
//!     if ctx.is_cancelled() {
//!         return Payload(String::new());
//!     }
//!     Payload(header.get("x-user").unwrap_or("anonymous").to_string())
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use tokio::sync::watch;

use super::reporter::ErrorReporter;
use crate::binding::FunctionBinding;
use crate::body::Body;
use crate::error::{Error, Result};
use crate::response::ResponseWriter;

/// Request-scoped, cancellation-aware context.
///
/// A transport that can cancel in-flight requests inserts a
/// `tokio::sync::watch::Receiver<bool>` into the request extensions; the value
/// flips to `true` on cancellation. Without one the context is never cancelled.
/// The core does not enforce cancellation, it only makes it observable.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    method: Method,
    uri: Uri,
    cancel: watch::Receiver<bool>,
}

impl ExecutionContext {
    /// Create a context that is never cancelled.
    pub fn new(method: Method, uri: Uri) -> Self {
        let (_tx, cancel) = watch::channel(false);
        Self::with_cancellation(method, uri, cancel)
    }

    /// Create a context that observes `cancel`.
    pub fn with_cancellation(method: Method, uri: Uri, cancel: watch::Receiver<bool>) -> Self {
        Self {
            method,
            uri,
            cancel,
        }
    }

    /// Build the context for a request.
    ///
    /// A context the transport placed in the extensions is used as is; otherwise
    /// a cancellation signal is picked up from them if present.
    pub fn for_request(parts: &Parts) -> Self {
        if let Some(ctx) = parts.extensions.get::<ExecutionContext>() {
            return ctx.clone();
        }
        match parts.extensions.get::<watch::Receiver<bool>>() {
            Some(cancel) => Self::with_cancellation(
                parts.method.clone(),
                parts.uri.clone(),
                cancel.clone(),
            ),
            None => Self::new(parts.method.clone(), parts.uri.clone()),
        }
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Whether the transport cancelled the request.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolve once the request is cancelled.
    ///
    /// Never resolves if the transport dropped its sender without cancelling.
    pub async fn cancelled(&self) {
        let mut cancel = self.cancel.clone();
        loop {
            if *cancel.borrow_and_update() {
                return;
            }
            if cancel.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Header bag: header name to value.
///
/// Names are lower-case. Repeated headers keep their first value and values that
/// are not valid UTF-8 are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header(BTreeMap<String, String>);

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every header present on a request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut bag = BTreeMap::new();
        for (name, value) in headers {
            let Ok(value) = value.to_str() else {
                continue;
            };
            bag.entry(name.as_str().to_owned())
                .or_insert_with(|| value.to_owned());
        }
        Self(bag)
    }

    /// Look up a header, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Set a header, returning the previous value. Names are stored lower-case.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.to_ascii_lowercase(), value.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Header {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Header::new();
        for (name, value) in iter {
            bag.insert(name.as_ref(), value);
        }
        bag
    }
}

/// Context passed to a codec when it matches the request's content type.
///
/// Built fresh for every request and dropped with the response.
pub struct RequestContext {
    parts: Parts,
    body: Body,
    header: Header,
    context: ExecutionContext,
    binding: Arc<FunctionBinding>,
    reporter: Arc<dyn ErrorReporter>,
    max_body_bytes: u64,
}

impl RequestContext {
    pub fn new(
        parts: Parts,
        body: Body,
        binding: Arc<FunctionBinding>,
        reporter: Arc<dyn ErrorReporter>,
        max_body_bytes: u64,
    ) -> Self {
        let header = Header::from_headers(&parts.headers);
        let context = ExecutionContext::for_request(&parts);
        Self {
            parts,
            body,
            header,
            context,
            binding,
            reporter,
            max_body_bytes,
        }
    }

    /// Request line and headers.
    #[inline]
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub fn execution_context(&self) -> &ExecutionContext {
        &self.context
    }

    #[inline]
    pub fn binding(&self) -> &FunctionBinding {
        &self.binding
    }

    #[inline]
    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    /// Take the body and read it up to the byte ceiling.
    ///
    /// A second call sees an empty body.
    pub async fn read_body(&mut self) -> Result<Bytes> {
        let body = std::mem::take(&mut self.body);
        Ok(body.read_to_limit(self.max_body_bytes).await?)
    }

    /// Hand an error to the installed reporter.
    ///
    /// Body failures commit `400 Bad Request` first so no reporter can answer
    /// them with a success status.
    pub fn report(&self, response: &mut ResponseWriter, error: &Error) {
        if error.is_decode() {
            response.write_status(http::StatusCode::BAD_REQUEST);
        }
        self.reporter.report(response, error);
    }
}
