//! Exact-path routing across handlers.
//!
//! A [`Router`] maps `(method, path)` to a [`Handler`]. Only `GET`, `PUT`,
//! `POST`, `PATCH` and `DELETE` can be routed, and each pair can be registered
//! once. Handlers created through [`Router::handler`] start with the router's
//! error reporter and body ceiling.
//!
//! # Example
//!
//! ```ignore
//! use autobind::{Payload, Router};
//! use http::Method;
//!
//! async fn ping() -> Payload<&'static str> {
//!     Payload("pong")
//! }
//!
//! let mut router = Router::new().with_max_body_bytes(1024);
//! let handler = router.handler(ping).build()?;
//! router.register(Method::GET, "/ping", handler)?;
//!
//! let response = router.serve(request).await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};

use crate::body::Body;
use crate::error::{ConfigError, RouteError};
use crate::handler::{
    BindArgs, ErrorReporter, Handler, HandlerBuilder, HandlerFn, JsonErrorReporter,
    DEFAULT_MAX_BODY_BYTES,
};

type NotFound = Arc<dyn Fn(&Request<Body>) -> Response<Bytes> + Send + Sync>;

/// Methods that can carry a route.
pub const ROUTABLE_METHODS: [Method; 5] = [
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::PATCH,
    Method::DELETE,
];

/// Routes requests to handlers by method and exact path.
#[derive(Clone)]
pub struct Router {
    routes: HashMap<Method, HashMap<String, Arc<Handler>>>,
    not_found: NotFound,
    reporter: Arc<dyn ErrorReporter>,
    max_body_bytes: u64,
}

impl Router {
    /// Create an empty router with the default reporter and body ceiling.
    pub fn new() -> Self {
        Self {
            routes: ROUTABLE_METHODS
                .iter()
                .map(|method| (method.clone(), HashMap::new()))
                .collect(),
            not_found: Arc::new(|_: &Request<Body>| {
                let mut response = Response::new(Bytes::new());
                *response.status_mut() = StatusCode::NOT_FOUND;
                response
            }),
            reporter: Arc::new(JsonErrorReporter),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Error reporter given to handlers created by [`handler`](Self::handler).
    pub fn with_error_reporter(mut self, reporter: impl ErrorReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Body ceiling given to handlers created by [`handler`](Self::handler).
    pub fn with_max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Replace the response for unrouted requests (default: empty `404`).
    pub fn with_not_found<N>(mut self, not_found: N) -> Self
    where
        N: Fn(&Request<Body>) -> Response<Bytes> + Send + Sync + 'static,
    {
        self.not_found = Arc::new(not_found);
        self
    }

    /// Start a handler that inherits the router's defaults.
    pub fn handler<F, Args>(&self, function: F) -> HandlerBuilder<F, Args>
    where
        F: HandlerFn<Args>,
        Args: BindArgs,
    {
        HandlerBuilder::with_defaults(function, Arc::clone(&self.reporter), self.max_body_bytes)
    }

    /// Route `method path` to `handler`.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidMethod`] if `method` is not routable
    /// - [`RouteError::AlreadyRegistered`] if the route is taken
    pub fn register(
        &mut self,
        method: Method,
        path: impl Into<String>,
        handler: Handler,
    ) -> Result<(), RouteError> {
        let path = path.into();
        let Some(routes) = self.routes.get_mut(&method) else {
            return Err(RouteError::InvalidMethod(method));
        };
        if routes.contains_key(&path) {
            return Err(RouteError::AlreadyRegistered { method, path });
        }

        tracing::debug!("Registered {} {} -> {}", method, path, handler.binding().name());
        routes.insert(path, Arc::new(handler));
        Ok(())
    }

    /// Look up the handler for a route.
    pub fn route(&self, method: &Method, path: &str) -> Option<&Handler> {
        self.routes.get(method)?.get(path).map(Arc::as_ref)
    }

    /// Serve one request through its handler or the not-found response.
    pub async fn serve(&self, request: Request<Body>) -> Result<Response<Bytes>, ConfigError> {
        let Some(handler) = self.route(request.method(), request.uri().path()) else {
            tracing::debug!("No route for {} {}", request.method(), request.uri().path());
            return Ok((self.not_found)(&request));
        };
        handler.serve(request).await
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<_> = self
            .routes
            .iter()
            .flat_map(|(method, paths)| paths.keys().map(move |path| format!("{method} {path}")))
            .collect();
        routes.sort_unstable();

        f.debug_struct("Router")
            .field("routes", &routes)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}
