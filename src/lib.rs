//! # autobind
//!
//! Expose ordinary async functions as HTTP handlers without writing the
//! marshaling code.
//!
//! A function's parameters and return type describe how a request is bound to
//! it. Parameters are tagged by type: [`ExecutionContext`] for the request-scoped
//! context, [`Header`] for the header bag and [`Payload<T>`] for a value decoded
//! from the body. Returns are `()`, `Payload<T>`, `Result<(), E>` or
//! `Result<Payload<T>, E>`.
//!
//! ## Architecture
//!
//! - **Binding** ([`binding`]): validated shape of a wrapped function
//! - **Codecs** ([`codec`]): content-type specific decode and encode
//! - **Middleware** ([`middleware`]): hooks that can rewrite or veto a request
//! - **Dispatch** ([`handler`], [`router`]): codec selection and error reporting
//!
//! The crate takes `http::Request<Body>` and returns `http::Response<Bytes>`;
//! hosting it on a server is left to the caller.
//!
//! ## Example
//!
//! ```ignore
//! use autobind::{ExecutionContext, Handler, Header, Payload, SignedHeadersMiddleware};
//! use http::HeaderName;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct Input {
//!     input: String,
//! }
//!
//! #[derive(Serialize)]
//! struct Output {
//!     output: String,
//! }
//!
//! async fn greet(
//!     _ctx: ExecutionContext,
//!     header: Header,
//!     Payload(input): Payload<Input>,
//! ) -> Result<Payload<Output>, std::io::Error> {
//!     let user = header.get("x-api-key").unwrap_or("stranger");
//!     Ok(Payload(Output {
//!         output: format!("{} says {}", user, input.input),
//!     }))
//! }
//!
//! let handler = Handler::builder(greet)
//!     .middleware(SignedHeadersMiddleware::new(
//!         [HeaderName::from_static("x-api-key")],
//!         "secret",
//!     ))
//!     .build()?;
//!
//! let response = handler.serve(request).await?;
//! ```

pub mod binding;
pub mod codec;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod router;
pub mod signer;

mod body;
mod response;

pub use binding::FunctionBinding;
pub use body::Body;
pub use error::{ConfigError, Error, RouteError};
pub use handler::{
    ErrorReporter, ExecutionContext, Handler, HandlerBuilder, Header, JsonErrorReporter, Payload,
    RequestContext,
};
pub use middleware::{BasicAuthMiddleware, Middleware, MiddlewareError, SignedHeadersMiddleware};
pub use response::ResponseWriter;
pub use router::Router;
pub use signer::{KeySigner, SignerError};
