//! Handler construction and request dispatch.
//!
//! A [`Handler`] wraps one function. Building it derives the function's
//! [`FunctionBinding`], binds every codec to the function and checks that each
//! of them can serve it. Serving a request then runs the middleware chain,
//! resolves the codec from the `Content-Type` header and hands over.
//!
//! # Example
//!
//! ```ignore
//! use autobind::{Handler, Payload};
//! use autobind::codec::MsgPackCodec;
//!
//! async fn greet(Payload(name): Payload<String>) -> Payload<String> {
//!     Payload(format!("hello, {name}"))
//! }
//!
//! let handler = Handler::builder(greet)
//!     .codec(MsgPackCodec)
//!     .max_body_bytes(4096)
//!     .build()?;
//!
//! let response = handler.serve(request).await?;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response, StatusCode};

use super::context::RequestContext;
use super::params::{BindArgs, HandlerFn};
use super::reporter::{ErrorReporter, JsonErrorReporter};
use crate::binding::FunctionBinding;
use crate::body::Body;
use crate::codec::{parse_mime, BoundCodec, Codec, CodecRegistry, Endpoint, JsonCodec};
use crate::error::{ConfigError, Error};
use crate::middleware::Middleware;
use crate::response::ResponseWriter;

/// Default request body ceiling in bytes.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 65536;

/// Builder for a [`Handler`].
///
/// Starts with [`JsonCodec`] attached, [`JsonErrorReporter`] installed, no
/// middleware and a body ceiling of [`DEFAULT_MAX_BODY_BYTES`].
pub struct HandlerBuilder<F, Args> {
    function: Arc<F>,
    codecs: CodecRegistry,
    middleware: Vec<Arc<dyn Middleware>>,
    reporter: Arc<dyn ErrorReporter>,
    max_body_bytes: u64,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> HandlerBuilder<F, Args>
where
    F: HandlerFn<Args>,
    Args: BindArgs,
{
    /// Create a builder for `function`.
    pub fn new(function: F) -> Self {
        Self::with_defaults(function, Arc::new(JsonErrorReporter), DEFAULT_MAX_BODY_BYTES)
    }

    pub(crate) fn with_defaults(
        function: F,
        reporter: Arc<dyn ErrorReporter>,
        max_body_bytes: u64,
    ) -> Self {
        Self {
            function: Arc::new(function),
            codecs: CodecRegistry::new(),
            middleware: Vec::new(),
            reporter,
            max_body_bytes,
            _args: PhantomData,
        }
        .codec(JsonCodec)
    }

    /// Attach a codec.
    ///
    /// A codec with the same content type as an attached one replaces it.
    pub fn codec<C: Codec>(mut self, codec: C) -> Self {
        let endpoint = BoundCodec::<C, F, Args>::new(codec, Arc::clone(&self.function));
        if let Some(replaced) = self.codecs.insert(Arc::new(endpoint)) {
            tracing::debug!("Replacing codec for {}", replaced.mime_type());
        }
        self
    }

    /// Install the error reporter.
    ///
    /// Default: [`JsonErrorReporter`]
    pub fn error_reporter(mut self, reporter: impl ErrorReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Set the request body ceiling.
    ///
    /// Bytes past the ceiling are not read; a truncated payload fails to decode.
    /// Default: 65536
    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Append a middleware. Middleware run in the order they were added.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Derive the binding and check every codec against it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the function's parameter roles are out of
    /// order or any attached codec cannot serve its shape.
    pub fn build(self) -> Result<Handler, ConfigError> {
        let binding = FunctionBinding::new(std::any::type_name::<F>(), F::signature())?;
        for endpoint in self.codecs.endpoints() {
            endpoint.validate(&binding)?;
        }

        Ok(Handler {
            binding: Arc::new(binding),
            codecs: self.codecs,
            middleware: self.middleware,
            reporter: self.reporter,
            max_body_bytes: self.max_body_bytes,
        })
    }
}

/// A function exposed as a request handler.
///
/// Immutable once built and cheap to clone; `serve` may run concurrently.
#[derive(Clone)]
pub struct Handler {
    binding: Arc<FunctionBinding>,
    codecs: CodecRegistry,
    middleware: Vec<Arc<dyn Middleware>>,
    reporter: Arc<dyn ErrorReporter>,
    max_body_bytes: u64,
}

impl Handler {
    /// Start building a handler for `function`.
    pub fn builder<F, Args>(function: F) -> HandlerBuilder<F, Args>
    where
        F: HandlerFn<Args>,
        Args: BindArgs,
    {
        HandlerBuilder::new(function)
    }

    #[inline]
    pub fn binding(&self) -> &FunctionBinding {
        &self.binding
    }

    /// Content types this handler accepts.
    pub fn mime_types(&self) -> Vec<&str> {
        let mut mimes: Vec<_> = self.codecs.mime_types().collect();
        mimes.sort_unstable();
        mimes
    }

    #[inline]
    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    /// Serve one request.
    ///
    /// Every request-time failure ends up as a response. `Err` is reserved for a
    /// binding that can never be served.
    pub async fn serve(&self, mut request: Request<Body>) -> Result<Response<Bytes>, ConfigError> {
        let mut response = ResponseWriter::new();

        for middleware in &self.middleware {
            if let Err(rejection) = middleware.before(&mut request) {
                tracing::debug!(
                    "Middleware rejected {} {}: {} ({})",
                    request.method(),
                    request.uri().path(),
                    rejection,
                    rejection.status()
                );
                response.write_status(rejection.status());
                self.reporter
                    .report(&mut response, &Error::Rejected(rejection));
                return Ok(response.into_response());
            }
        }

        let mime = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_mime);
        let Some(mime) = mime else {
            tracing::debug!("Missing or malformed content type for {}", self.binding.name());
            return Ok(status_only(StatusCode::BAD_REQUEST));
        };

        let Some(endpoint) = self.codecs.get(&mime) else {
            tracing::warn!(
                "No codec for {} on {}, accepted: {:?}",
                mime,
                self.binding.name(),
                self.mime_types()
            );
            return Ok(status_only(StatusCode::UNSUPPORTED_MEDIA_TYPE));
        };

        let (parts, body) = request.into_parts();
        let ctx = RequestContext::new(
            parts,
            body,
            Arc::clone(&self.binding),
            Arc::clone(&self.reporter),
            self.max_body_bytes,
        );

        if let Err(fault) = endpoint.handle(ctx, &mut response).await {
            tracing::error!("Handler {} cannot serve requests: {}", self.binding.name(), fault);
            return Err(fault);
        }

        Ok(response.into_response())
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("binding", &self.binding)
            .field("mime_types", &self.mime_types())
            .field("middleware", &self.middleware.len())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

fn status_only(status: StatusCode) -> Response<Bytes> {
    let mut response = ResponseWriter::new();
    response.write_status(status);
    response.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MsgPackCodec;
    use crate::handler::{ExecutionContext, Header, Payload};
    use crate::middleware::MiddlewareError;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Deserialize)]
    struct Input {
        input: String,
    }

    #[derive(Serialize)]
    struct Output {
        output: String,
    }

    async fn greet(Payload(input): Payload<Input>) -> Payload<Output> {
        Payload(Output {
            output: format!("{}!", input.input),
        })
    }

    async fn nothing() {}

    async fn misordered(_header: Header, _ctx: ExecutionContext) {}

    fn request(content_type: Option<&str>, body: &'static str) -> Request<Body> {
        let mut builder = Request::post("/greet");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let handler = Handler::builder(greet).build().unwrap();
        assert_eq!(handler.mime_types(), ["application/json"]);
        assert_eq!(handler.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
        assert_eq!(handler.binding().input_arg_count(), 1);
        assert_eq!(handler.binding().output_arg_count(), 1);
        assert!(handler.binding().name().contains("greet"));
    }

    #[test]
    fn test_build_rejects_misordered_roles() {
        let err = Handler::builder(misordered).build().unwrap_err();
        assert!(matches!(err, ConfigError::UnexpectedRole { position: 0, .. }));
    }

    #[test]
    fn test_codecs_accumulate_and_replace() {
        let handler = Handler::builder(greet)
            .codec(MsgPackCodec)
            .codec(JsonCodec)
            .build()
            .unwrap();
        assert_eq!(handler.mime_types(), ["application/json", "application/msgpack"]);
    }

    #[tokio::test]
    async fn test_serve_json() {
        let handler = Handler::builder(greet).build().unwrap();
        let response = handler
            .serve(request(Some("application/json; charset=utf-8"), "{\"input\":\"yo\"}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(&response.body()[..], b"{\"output\":\"yo!\"}\n");
    }

    #[tokio::test]
    async fn test_serve_without_outputs_is_ok() {
        let handler = Handler::builder(nothing).build().unwrap();
        let response = handler
            .serve(request(Some("application/json"), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_content_type_resolution() {
        let handler = Handler::builder(greet).build().unwrap();

        let response = handler.serve(request(None, "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.body().is_empty());

        let response = handler.serve(request(Some("json"), "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handler
            .serve(request(Some("text/plain"), "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_middleware_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let handler = Handler::builder(greet)
            .middleware(|_: &mut Request<Body>| -> Result<(), MiddlewareError> {
                Err(MiddlewareError::new(StatusCode::UNAUTHORIZED, "go away"))
            })
            .middleware(move |_: &mut Request<Body>| -> Result<(), MiddlewareError> {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap();

        let response = handler
            .serve(request(Some("application/json"), "{\"input\":\"yo\"}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(&response.body()[..], b"{\"error\":\"go away\"}\n");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_middleware_mutations_reach_the_function() {
        async fn echo_header(_ctx: ExecutionContext, header: Header) -> Payload<String> {
            Payload(header.get("x-user").unwrap_or_default().to_owned())
        }

        let handler = Handler::builder(echo_header)
            .middleware(|request: &mut Request<Body>| -> Result<(), MiddlewareError> {
                request
                    .headers_mut()
                    .insert("x-user", http::HeaderValue::from_static("rewritten"));
                Ok(())
            })
            .build()
            .unwrap();

        let response = handler
            .serve(request(Some("application/json"), ""))
            .await
            .unwrap();
        assert_eq!(&response.body()[..], b"\"rewritten\"\n");
    }

    #[tokio::test]
    async fn test_handler_is_shareable_across_tasks() {
        let handler = Handler::builder(greet).build().unwrap();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let handler = handler.clone();
            tasks.push(tokio::spawn(async move {
                let body = format!("{{\"input\":\"{i}\"}}");
                let request = Request::post("/greet")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap();
                handler.serve(request).await.unwrap()
            }));
        }

        for (i, task) in tasks.into_iter().enumerate() {
            let response = task.await.unwrap();
            assert_eq!(response.body(), &format!("{{\"output\":\"{i}!\"}}\n"));
        }
    }
}
