//! HMAC-SHA256 signing of short string values.
//!
//! A signed token has the form `value.hexmac`, where `hexmac` is the hex
//! encoding of `HMAC-SHA256(key, value)`. Tokens are produced in lowercase;
//! verification accepts either case. Such tokens are what the
//! [`SignedHeadersMiddleware`](crate::middleware::SignedHeadersMiddleware) expects
//! in protected headers.
//!
//! # Example
//!
//! ```
//! use autobind::KeySigner;
//!
//! let signer = KeySigner::new("test-key");
//! let token = signer.sign("hurray!").unwrap();
//! assert_eq!(signer.verify(&token).unwrap(), "hurray!");
//! ```

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Separator between the value and its MAC.
pub const SEPARATOR: char = '.';

/// Signing and verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The token is not `value.mac` with two non-empty parts, or the value
    /// cannot be carried in one.
    #[error("invalid token")]
    InvalidToken,

    /// The MAC does not match the value.
    #[error("invalid signature")]
    InvalidSignature,
}

/// Signs values with a shared secret and verifies them at the system borders.
#[derive(Clone)]
pub struct KeySigner {
    key: Vec<u8>,
}

impl KeySigner {
    /// Create a signer for `key`. Any key length is accepted.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    /// Append an HMAC to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidToken`] if `value` is empty or contains
    /// [`SEPARATOR`]; such a token could never be verified.
    pub fn sign(&self, value: &str) -> Result<String, SignerError> {
        if value.is_empty() || value.contains(SEPARATOR) {
            return Err(SignerError::InvalidToken);
        }
        let mac = hex::encode(self.compute(value));
        Ok(format!("{value}{SEPARATOR}{mac}"))
    }

    /// Check a token produced by [`sign`](Self::sign) and return the unsigned value.
    ///
    /// The MAC is compared as bytes, so hex digits of either case are accepted.
    ///
    /// # Errors
    ///
    /// - [`SignerError::InvalidToken`] if the token is not `value.mac` with two
    ///   non-empty parts
    /// - [`SignerError::InvalidSignature`] if the MAC is not hex or does not
    ///   match the value
    pub fn verify(&self, token: &str) -> Result<String, SignerError> {
        let mut parts = token.split(SEPARATOR);
        let (Some(value), Some(supplied), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(SignerError::InvalidToken);
        };
        if value.is_empty() || supplied.is_empty() {
            return Err(SignerError::InvalidToken);
        }

        let supplied = hex::decode(supplied).map_err(|_| SignerError::InvalidSignature)?;
        let expected = self.compute(value);
        if supplied.len() != expected.len() {
            return Err(SignerError::InvalidSignature);
        }
        if !bool::from(supplied.as_slice().ct_eq(expected.as_slice())) {
            return Err(SignerError::InvalidSignature);
        }

        Ok(value.to_owned())
    }

    fn compute(&self, value: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(value.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl fmt::Debug for KeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySigner").finish_non_exhaustive()
    }
}
