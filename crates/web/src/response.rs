//! The response under construction for one dispatched call.
//!
//! [`Response::json`], [`Response::send`] and [`Response::end`] are finalizers: each emits the
//! body, marks the response as terminated and hands back the [`Finalized`] token that handlers
//! and middlewares return. Once terminated, the chain does not run any further step.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

use crate::error::{HandlerError, HandlerResult};

const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Proof that a finalizer ran for the current request.
///
/// It can only be obtained from a [`Response`] finalizer, so a handler returning `Ok` has always
/// emitted exactly one body.
#[must_use = "return the token from the handler or middleware"]
#[derive(Debug)]
pub struct Finalized {
    _private: (),
}

impl Finalized {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    terminated: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: Bytes::new(), terminated: false }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code, returning `self` so a finalizer can follow.
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a header, replacing any previous value under the same name.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a header from strings, failing on names or values that are not valid HTTP.
    #[track_caller]
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self, HandlerError> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        Ok(self.insert_header(name, value))
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether a finalizer already ran.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Emits `value` as a JSON body.
    #[track_caller]
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> HandlerResult {
        if self.terminated {
            return Err(HandlerError::already_finalized());
        }
        let body = serde_json::to_vec(value)?;
        self.headers.insert(CONTENT_TYPE, APPLICATION_JSON);
        Ok(self.finalize(Bytes::from(body)))
    }

    /// Emits a raw body as is.
    #[track_caller]
    pub fn send<B: Into<Bytes>>(&mut self, body: B) -> HandlerResult {
        if self.terminated {
            return Err(HandlerError::already_finalized());
        }
        Ok(self.finalize(body.into()))
    }

    /// Ends the request with an empty body.
    #[track_caller]
    pub fn end(&mut self) -> HandlerResult {
        self.send(Bytes::new())
    }

    fn finalize(&mut self, body: Bytes) -> Finalized {
        if forbids_content_length(self.status) {
            self.headers.remove(CONTENT_LENGTH);
        } else {
            self.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }
        self.body = body;
        self.terminated = true;
        Finalized::new()
    }

    /// Drops everything written so far and emits the structured error body.
    pub(crate) fn replace_with_error(&mut self, message: String) {
        *self = Self::new();
        self.status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = serde_json::json!({ "error": message });
        // a `Value` with only string content always serializes
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        self.headers.insert(CONTENT_TYPE, APPLICATION_JSON);
        let _ = self.finalize(Bytes::from(bytes));
    }

    /// Converts into the host's response representation.
    pub fn into_http(mut self) -> http::Response<Bytes> {
        // the status may have changed after the finalizer ran
        if forbids_content_length(self.status) {
            self.headers.remove(CONTENT_LENGTH);
        }
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// 1xx and 204 responses must not carry `Content-Length`.
fn forbids_content_length(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::Response;
    use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
    use http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_default_response() {
        let response = Response::new();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.is_terminated());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_json_finalizes() {
        let mut response = Response::new();
        let _ = response.set_status(StatusCode::CREATED).json(&json!({"id": 7})).unwrap();

        assert!(response.is_terminated());
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.body().as_ref(), br#"{"id":7}"#);

        let http_response = response.into_http();
        assert_eq!(http_response.status(), StatusCode::CREATED);
        assert_eq!(http_response.headers()["content-length"], "8");
    }

    #[test]
    fn test_unicode_is_not_escaped() {
        let mut response = Response::new();
        let _ = response.json(&json!({"name": "Łódź"})).unwrap();
        assert_eq!(std::str::from_utf8(response.body()).unwrap(), r#"{"name":"Łódź"}"#);
    }

    #[test]
    fn test_second_finalizer_is_rejected() {
        let mut response = Response::new();
        let _ = response.send("first").unwrap();
        let error = response.send("second").unwrap_err();

        assert_eq!(error.to_string(), "response has already been finalized");
        assert_eq!(response.body().as_ref(), b"first");
    }

    #[test]
    fn test_invalid_header_is_an_error() {
        let mut response = Response::new();
        assert!(response.header("X-Trace", "abc").is_ok());
        assert!(response.header("bad header", "abc").is_err());
        assert_eq!(response.headers()["x-trace"], "abc");
    }

    #[test]
    fn test_replace_with_error() {
        let mut response = Response::new();
        response.header("X-Partial", "1").unwrap();
        response.replace_with_error("boom file:a.rs line:1".into());

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("x-partial").is_none());
        assert_eq!(response.body().as_ref(), br#"{"error":"boom file:a.rs line:1"}"#);
    }

    #[test]
    fn test_no_content_has_no_content_length() {
        let mut response = Response::new();
        let _ = response.set_status(StatusCode::NO_CONTENT).end().unwrap();
        assert!(response.headers().get(CONTENT_LENGTH).is_none());

        let mut response = Response::new();
        let _ = response.end().unwrap();
        assert_eq!(response.headers()[CONTENT_LENGTH], "0");
        response.set_status(StatusCode::NO_CONTENT);
        assert!(response.into_http().headers().get(CONTENT_LENGTH).is_none());
    }
}
