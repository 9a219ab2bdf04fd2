//! Handler module - functions as request handlers.
//!
//! Provides:
//! - [`Handler`] / [`HandlerBuilder`] - wrap a function, attach codecs and middleware
//! - [`HandlerFn`] - the calling convention, implemented for async functions
//! - [`ExecutionContext`], [`Header`], [`Payload`] - the parameter types
//! - [`ErrorReporter`] - where every request-time error is written
//!
//! # Example
//!
//! ```ignore
//! use autobind::{ExecutionContext, Handler, Header, Payload};
//!
//! async fn lookup(
//!     ctx: ExecutionContext,
//!     header: Header,
//!     Payload(id): Payload<u64>,
//! ) -> Result<Payload<String>, std::io::Error> {
//!     let tenant = header.get("x-tenant").unwrap_or("default");
//!     Ok(Payload(format!("{tenant}/{id} via {}", ctx.path())))
//! }
//!
//! let handler = Handler::builder(lookup).build()?;
//! ```

mod context;
mod dispatcher;
mod params;
mod reporter;

pub use context::{ExecutionContext, Header, RequestContext};
pub use dispatcher::{Handler, HandlerBuilder, DEFAULT_MAX_BODY_BYTES};
pub use params::{BindArgs, HandlerFn, Outcome, Param, Payload, Resolution};
pub use reporter::{ErrorReporter, JsonErrorReporter};
