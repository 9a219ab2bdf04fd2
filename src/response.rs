//! Response sink written by codecs and error reporters.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Response, StatusCode};

/// Buffered response under construction.
///
/// The first status written wins; writing body bytes commits `200 OK` if no
/// status was set yet. A reporter that runs after the dispatcher already chose a
/// status therefore cannot override it.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status code unless one was already written.
    pub fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Status that will be sent (200 if nothing was written).
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status has been committed.
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Replace a header value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Append body bytes.
    pub fn write(&mut self, data: &[u8]) {
        self.write_status(StatusCode::OK);
        self.body.extend_from_slice(data);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Finish into an `http::Response`.
    pub fn into_response(self) -> Response<Bytes> {
        let status = self.status();
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}
