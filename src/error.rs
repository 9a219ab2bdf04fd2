//! Error types for autobind.
//!
//! Two channels are kept apart:
//!
//! - [`Error`] - request-time failures. Every one of them is funneled through the
//!   handler's [`ErrorReporter`](crate::handler::ErrorReporter).
//! - [`ConfigError`] - configuration faults. Returned when a handler or route is
//!   built, and on the `Err` side of [`Handler::serve`](crate::Handler::serve)
//!   if one is ever detected while serving.

use http::Method;
use thiserror::Error;

use crate::binding::ParamRole;
use crate::middleware::MiddlewareError;

/// Boxed error type used for application and codec failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Request-time error handed to the error reporter.
#[derive(Debug, Error)]
pub enum Error {
    /// The function expects a payload but the request carried no body.
    #[error("autobind: failure decoding input")]
    DecodeFailure,

    /// The body could not be deserialized into the payload type.
    #[error("{0}")]
    Decode(#[source] BoxError),

    /// I/O error while reading the request body.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The function's return value could not be serialized.
    #[error("{0}")]
    Encode(#[source] BoxError),

    /// A middleware vetoed the request.
    #[error(transparent)]
    Rejected(#[from] MiddlewareError),

    /// The error value returned by the wrapped function.
    #[error("{0}")]
    Application(#[source] BoxError),
}

impl Error {
    /// True for failures caused by the request body.
    ///
    /// These always answer with `400 Bad Request`, whatever reporter is installed.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::DecodeFailure | Error::Decode(_) | Error::Io(_))
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A handler or route that can never serve correctly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// More than three input parameters.
    #[error("autobind: a function can only have up to three input args")]
    TooManyInputArgs,

    /// More than two outputs.
    #[error("autobind: a function can only have up to two output args")]
    TooManyOutputArgs,

    /// A parameter role sits at a position the calling convention forbids.
    #[error("autobind: expected {expected:?} at input position {position}, found {found:?}")]
    UnexpectedRole {
        position: usize,
        expected: ParamRole,
        found: ParamRole,
    },

    /// A special parameter role appears twice.
    #[error("autobind: {role:?} repeated at input position {position}")]
    DuplicateRole { role: ParamRole, position: usize },

    /// Two outputs where the second is not the error slot.
    #[error("autobind: the second of two outputs must be the error slot")]
    MisplacedErrorSlot,

    /// A codec refused the function's shape.
    #[error("autobind: codec {mime} cannot serve {function}: {reason}")]
    IncompatibleCodec {
        mime: String,
        function: String,
        reason: String,
    },
}

/// Errors raised while building a [`Router`](crate::Router).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The (method, path) pair already has a handler.
    #[error("autobind: route already registered: {method} {path}")]
    AlreadyRegistered { method: Method, path: String },

    /// Only GET, PUT, POST, PATCH and DELETE can be routed.
    #[error("autobind: not a valid method: {0}")]
    InvalidMethod(Method),
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_decode_classification() {
        assert!(Error::DecodeFailure.is_decode());
        assert!(Error::Decode("bad json".into()).is_decode());
        assert!(!Error::Application("sup".into()).is_decode());
        assert!(!Error::Encode("nope".into()).is_decode());
    }

    #[test]
    fn test_messages_pass_through() {
        assert_eq!(Error::Application("sup".into()).to_string(), "sup");

        let rejected = Error::from(MiddlewareError::new(
            StatusCode::FORBIDDEN,
            "invalid token",
        ));
        assert_eq!(rejected.to_string(), "invalid token");
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::TooManyInputArgs.to_string(),
            "autobind: a function can only have up to three input args"
        );
        let err = ConfigError::UnexpectedRole {
            position: 0,
            expected: ParamRole::ExecutionContext,
            found: ParamRole::Payload,
        };
        assert!(err.to_string().contains("position 0"));
    }
}
