//! Codec module - format-specific binding of requests to functions.
//!
//! A codec owns one content type. Given a matched request it binds the
//! function's arguments, invokes it and encodes what it returns:
//!
//! - [`JsonCodec`] - `application/json` via `serde_json`
//! - [`MsgPackCodec`] - `application/msgpack` via `rmp-serde` (named struct fields)
//!
//! # Design
//!
//! Implementors only provide [`Codec::mime_type`], [`Codec::decode`] and
//! [`Codec::encode`]. The bind → invoke → encode cycle is shared by every codec
//! through the provided [`Codec::handle_request`]; override it for formats that
//! need their own exchange.
//!
//! # Example
//!
//! ```
//! use autobind::codec::{Codec, JsonCodec};
//!
//! let codec = JsonCodec;
//! let encoded = codec.encode(&"hello").unwrap();
//! assert_eq!(encoded, b"\"hello\"\n");
//!
//! let decoded: String = codec.decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod json;
mod msgpack;
mod registry;

use std::future::Future;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::binding::{check_arity, FunctionBinding};
use crate::error::{ConfigError, Error, Result};
use crate::handler::{BindArgs, HandlerFn, Outcome, RequestContext, Resolution};
use crate::response::ResponseWriter;

pub use json::{JsonCodec, JSON_MIME};
pub use msgpack::{MsgPackCodec, MSGPACK_MIME};
pub(crate) use registry::{BoundCodec, CodecRegistry, Endpoint};

/// A serialization format that can serve functions.
pub trait Codec: Send + Sync + 'static {
    /// Content type this codec answers to, lower-case without parameters.
    fn mime_type(&self) -> &str;

    /// Check that the codec can serve a function of this shape.
    ///
    /// Called once for every codec attached to a handler, when it is built.
    fn validate_signature(&self, binding: &FunctionBinding) -> std::result::Result<(), ConfigError> {
        check_arity(binding.input_arg_count(), binding.output_arg_count())
    }

    /// Deserialize a request body.
    fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T>;

    /// Serialize a response value.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Run one exchange: bind the arguments, call `function`, write its result.
    ///
    /// Request-time failures are written through the context's error reporter and
    /// the call returns `Ok`. `Err` means the binding itself is unservable.
    fn handle_request<F, Args>(
        &self,
        function: &F,
        ctx: RequestContext,
        response: &mut ResponseWriter,
    ) -> impl Future<Output = std::result::Result<(), ConfigError>> + Send
    where
        Self: Sized,
        F: HandlerFn<Args>,
        Args: BindArgs,
    {
        exchange(self, function, ctx, response)
    }
}

/// The shared bind → invoke → encode cycle.
///
/// Nothing borrowed from `ctx` may live across an await: the body stream makes
/// the context `Send` but not `Sync`.
pub async fn exchange<C, F, Args>(
    codec: &C,
    function: &F,
    mut ctx: RequestContext,
    response: &mut ResponseWriter,
) -> std::result::Result<(), ConfigError>
where
    C: Codec,
    F: HandlerFn<Args>,
    Args: BindArgs,
{
    if let Err(fault) = ctx.binding().check_positions() {
        tracing::error!(
            "Handler {} reached {} with an unservable binding: {}",
            ctx.binding().name(),
            codec.mime_type(),
            fault
        );
        return Err(fault);
    }

    let wants_body = ctx.binding().payload_position().is_some();
    let body = if wants_body {
        match ctx.read_body().await {
            Ok(body) => body,
            Err(e) => {
                ctx.report(response, &e);
                return Ok(());
            }
        }
    } else {
        Bytes::new()
    };

    let args = match Args::bind(&ctx, &body, codec) {
        Ok(args) => args,
        Err(e) => {
            tracing::debug!("Failed to bind arguments for {}: {}", ctx.binding().name(), e);
            ctx.report(response, &e);
            return Ok(());
        }
    };

    let output = function.call(args).await;

    if let Ok(value) = HeaderValue::from_str(codec.mime_type()) {
        response.set_header(CONTENT_TYPE, value);
    }

    match output.resolve() {
        Resolution::Empty => response.write_status(StatusCode::OK),
        Resolution::NoContent => response.write_status(StatusCode::NO_CONTENT),
        Resolution::Value(value) => match codec.encode(&value) {
            Ok(bytes) => response.write(&bytes),
            Err(e) => {
                tracing::warn!("Failed to encode result of {}: {}", ctx.binding().name(), e);
                response.write_status(StatusCode::INTERNAL_SERVER_ERROR);
                ctx.report(response, &e);
            }
        },
        Resolution::Failed(e) => ctx.report(response, &Error::Application(e)),
    }

    Ok(())
}

/// Reduce a `Content-Type` value to its lower-case `type/subtype`.
///
/// Returns `None` when the value is not a media type. Parameters must be
/// `name=token` or `name="quoted string"`; they are checked for shape and dropped.
pub fn parse_mime(value: &str) -> Option<String> {
    let (base, mut rest) = value.split_once(';').unwrap_or((value, ""));
    let base = base.trim();
    let (kind, subtype) = base.split_once('/')?;
    if !is_token(kind) || !is_token(subtype) {
        return None;
    }

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(next) = rest.strip_prefix(';') {
            rest = next;
            continue;
        }

        let (name, after) = rest.split_once('=')?;
        if !is_token(name.trim_end()) {
            return None;
        }
        let after = after.trim_start();
        rest = match after.strip_prefix('"') {
            Some(quoted) => skip_quoted(quoted)?,
            None => {
                let end = after.find(';').unwrap_or(after.len());
                if !is_token(after[..end].trim_end()) {
                    return None;
                }
                &after[end..]
            }
        };

        rest = rest.trim_start();
        match rest.strip_prefix(';') {
            Some(next) => rest = next,
            None if rest.is_empty() => break,
            None => return None,
        }
    }

    Some(base.to_ascii_lowercase())
}

/// Skip past the closing quote of a quoted string whose opening quote is gone.
fn skip_quoted(s: &str) -> Option<&str> {
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next()?;
            }
            '"' => return Some(&s[i + 1..]),
            _ => {}
        }
    }
    None
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
