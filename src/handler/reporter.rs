//! Error reporting hand-off.
//!
//! Codecs and the dispatcher never render errors themselves; every request-time
//! failure goes to the handler's [`ErrorReporter`]. Install your own to change the
//! status codes or body shape globally.

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde_json::json;

use crate::error::Error;
use crate::response::ResponseWriter;

/// Writes a request-time error back to the caller.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, response: &mut ResponseWriter, error: &Error);
}

impl<F> ErrorReporter for F
where
    F: Fn(&mut ResponseWriter, &Error) + Send + Sync + 'static,
{
    fn report(&self, response: &mut ResponseWriter, error: &Error) {
        (self)(response, error)
    }
}

/// Default reporter: `{"error": "<message>"}` followed by a newline.
///
/// Forces `400 Bad Request` for [`Error::DecodeFailure`]; any status already
/// committed (a middleware rejection, a malformed body) is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorReporter;

impl ErrorReporter for JsonErrorReporter {
    fn report(&self, response: &mut ResponseWriter, error: &Error) {
        if matches!(error, Error::DecodeFailure) {
            response.write_status(StatusCode::BAD_REQUEST);
        }

        let body = json!({ "error": error.to_string() });
        match serde_json::to_vec(&body) {
            Ok(mut bytes) => {
                bytes.push(b'\n');
                response.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response.write(&bytes);
            }
            Err(e) => {
                tracing::error!("Failed to encode error body: {}", e);
                response.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }
}
