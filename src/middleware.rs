//! Pre-invocation request hooks.
//!
//! Middleware run in order before the codec is chosen. Each one may rewrite the
//! request in place or veto it with a [`MiddlewareError`]; the first veto stops
//! the chain and the function is never called.
//!
//! - [`SignedHeadersMiddleware`] - verifies HMAC-signed headers and unwraps them
//! - [`BasicAuthMiddleware`] - checks `Authorization: Basic` credentials
//!
//! Plain closures work as middleware too:
//!
//! ```
//! use autobind::{Body, MiddlewareError};
//! use http::{Request, StatusCode};
//!
//! let require_tenant = |request: &mut Request<Body>| -> Result<(), MiddlewareError> {
//!     if request.headers().contains_key("x-tenant") {
//!         Ok(())
//!     } else {
//!         Err(MiddlewareError::new(StatusCode::BAD_REQUEST, "missing tenant"))
//!     }
//! };
//! # let _ = require_tenant;
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use http::{Request, StatusCode};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::body::Body;
use crate::error::BoxError;
use crate::signer::{KeySigner, SignerError};

/// A middleware veto.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct MiddlewareError {
    status: Option<StatusCode>,
    source: BoxError,
}

impl MiddlewareError {
    /// Reject with an explicit status.
    pub fn new(status: StatusCode, source: impl Into<BoxError>) -> Self {
        Self {
            status: Some(status),
            source: source.into(),
        }
    }

    /// Reject without choosing a status; answered with `500`.
    pub fn internal(source: impl Into<BoxError>) -> Self {
        Self {
            status: None,
            source: source.into(),
        }
    }

    /// Status the response is sent with.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// The status the middleware chose, if any.
    pub fn explicit_status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Take the underlying error.
    pub fn into_source(self) -> BoxError {
        self.source
    }
}

/// A hook run before the request reaches a codec.
pub trait Middleware: Send + Sync + 'static {
    fn before(&self, request: &mut Request<Body>) -> Result<(), MiddlewareError>;
}

impl<F> Middleware for F
where
    F: Fn(&mut Request<Body>) -> Result<(), MiddlewareError> + Send + Sync + 'static,
{
    fn before(&self, request: &mut Request<Body>) -> Result<(), MiddlewareError> {
        (self)(request)
    }
}

/// Requires every configured header to carry a value signed with the shared key.
///
/// Verified headers are replaced by their unsigned value before the function
/// sees them. A missing, malformed or forged header rejects the request with
/// `403 Forbidden`.
#[derive(Debug, Clone)]
pub struct SignedHeadersMiddleware {
    signer: KeySigner,
    headers: Vec<HeaderName>,
}

impl SignedHeadersMiddleware {
    /// Protect `headers` with values signed by `key`.
    pub fn new(headers: impl IntoIterator<Item = HeaderName>, key: impl AsRef<[u8]>) -> Self {
        Self {
            signer: KeySigner::new(key),
            headers: headers.into_iter().collect(),
        }
    }

    /// Sign a value for one of the protected headers.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidToken`] if `value` is empty or contains the
    /// token separator.
    pub fn sign(&self, value: &str) -> Result<String, SignerError> {
        self.signer.sign(value)
    }

    #[inline]
    pub fn signer(&self) -> &KeySigner {
        &self.signer
    }

    /// Headers that must carry a signed value.
    #[inline]
    pub fn headers(&self) -> &[HeaderName] {
        &self.headers
    }
}

impl Middleware for SignedHeadersMiddleware {
    fn before(&self, request: &mut Request<Body>) -> Result<(), MiddlewareError> {
        for name in &self.headers {
            let token = request
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();

            let verified = self
                .signer
                .verify(token)
                .map_err(|e| MiddlewareError::new(StatusCode::FORBIDDEN, e))?;
            let value = HeaderValue::from_str(&verified)
                .map_err(|_| MiddlewareError::new(StatusCode::FORBIDDEN, SignerError::InvalidToken))?;

            request.headers_mut().insert(name.clone(), value);
        }
        Ok(())
    }
}

/// Requires `Authorization: Basic` credentials matching a fixed user and password.
#[derive(Clone)]
pub struct BasicAuthMiddleware {
    username: String,
    password: String,
}

impl BasicAuthMiddleware {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicAuthMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthMiddleware")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Middleware for BasicAuthMiddleware {
    fn before(&self, request: &mut Request<Body>) -> Result<(), MiddlewareError> {
        let Some((username, password)) = basic_credentials(request) else {
            return Err(MiddlewareError::new(
                StatusCode::FORBIDDEN,
                "basic auth required",
            ));
        };

        let user_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        if !bool::from(user_ok & password_ok) {
            return Err(MiddlewareError::new(
                StatusCode::FORBIDDEN,
                "invalid basic auth",
            ));
        }
        Ok(())
    }
}

/// Extract `(username, password)` from an `Authorization: Basic` header.
fn basic_credentials(request: &Request<Body>) -> Option<(String, String)> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_owned(), password.to_owned()))
}
