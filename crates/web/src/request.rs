//! The per-call request view handed to middlewares and handlers.
//!
//! A [`Request`] is built fresh for every dispatched call from the host's
//! `http::Request<Bytes>`:
//! - the path is stripped of its query string and kept both raw and percent-decoded
//! - the query string is parsed into a flat `String -> String` map
//! - header names are normalized to `Capitalized-Hyphen` form
//! - the body is parsed as JSON; an empty or unparsable body is simply absent

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, Method};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Path and query parameters, keyed by name.
pub type Params = HashMap<String, String>;

/// A request as seen by the dispatch engine.
#[derive(Debug)]
pub struct Request {
    method: Method,
    target: String,
    raw_path: String,
    path: String,
    raw_query: Option<String>,
    query: Params,
    params: Params,
    headers: HashMap<String, String>,
    body: Option<Value>,
    extensions: Extensions,
}

impl Request {
    /// Builds a request from the host's representation.
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();

        let target = parts.uri.path_and_query().map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
        let raw_path = parts.uri.path().to_string();
        let path = decode_path(&raw_path);
        let raw_query = parts.uri.query().map(ToString::to_string);
        let query = raw_query.as_deref().map(parse_query).unwrap_or_default();

        let mut headers: HashMap<String, String> = HashMap::with_capacity(parts.headers.keys_len());
        for (name, value) in &parts.headers {
            let Ok(value) = value.to_str() else {
                debug!(header = %name, "skip header with non visible ascii value");
                continue;
            };
            headers
                .entry(normalize_header_name(name.as_str()))
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        Self {
            method: parts.method,
            target,
            raw_path,
            path,
            raw_query,
            params: query.clone(),
            query,
            headers,
            body: parse_body(&body),
            extensions: parts.extensions,
        }
    }

    /// The HTTP method, compared case-sensitively against route methods.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw request target, path plus query.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The decoded path, without query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path as sent, still percent-encoded. Routes are matched against this form.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// The undecoded query string, if any.
    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn query(&self) -> &Params {
        &self.query
    }

    /// Path parameters captured by the matched route, overlaid by query parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Headers keyed by their normalized names, e.g. `Content-Type`.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks a header up by any spelling of its name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&normalize_header_name(name)).map(String::as_str)
    }

    /// The parsed JSON body, absent when the body was empty or not JSON.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Deserializes the JSON body into `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.body.as_ref().unwrap_or(&Value::Null))
    }

    /// Deserializes the query string into `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_qs::Error> {
        serde_qs::from_str(self.raw_query.as_deref().unwrap_or_default())
    }

    /// Typed values attached by middlewares for later steps of the chain.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Merges captured path parameters with the query parameters; query values win.
    pub(crate) fn set_path_params(&mut self, path_params: Params) {
        let mut params = path_params;
        params.extend(self.query.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.params = params;
    }
}

/// Normalizes a header name to `Capitalized-Hyphen` form, `x-request-id` becomes `X-Request-Id`.
pub fn normalize_header_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    for (i, part) in name.replace('_', "-").split('-').enumerate() {
        if i > 0 {
            normalized.push('-');
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            normalized.extend(first.to_uppercase());
            normalized.push_str(&chars.as_str().to_lowercase());
        }
    }
    normalized
}

pub(crate) fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn parse_query(query: &str) -> Params {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            debug!(cause = %e, "ignore malformed query string");
            Params::new()
        }
    }
}

fn parse_body(bytes: &Bytes) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::{normalize_header_name, Request};
    use bytes::Bytes;
    use http::Method;
    use serde::Deserialize;
    use serde_json::json;

    fn request(uri: &str, body: &'static str) -> Request {
        let http_request = http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-forwarded-for", "10.0.0.2")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        Request::from_http(http_request)
    }

    #[test]
    fn test_normalize_header_name() {
        assert_eq!(normalize_header_name("content-type"), "Content-Type");
        assert_eq!(normalize_header_name("X-REQUEST-ID"), "X-Request-Id");
        assert_eq!(normalize_header_name("accept_language"), "Accept-Language");
        assert_eq!(normalize_header_name("dnt"), "Dnt");
    }

    #[test]
    fn test_headers_are_normalized_and_joined() {
        let req = request("/", "");
        assert_eq!(req.headers().get("Content-Type").map(String::as_str), Some("application/json"));
        assert_eq!(req.header("x-forwarded-for"), Some("10.0.0.1, 10.0.0.2"));
    }

    #[test]
    fn test_path_is_decoded_and_query_stripped() {
        let req = request("/files/hello%20world?page=2&sort=name", "");
        assert_eq!(req.path(), "/files/hello world");
        assert_eq!(req.raw_path(), "/files/hello%20world");
        assert_eq!(req.target(), "/files/hello%20world?page=2&sort=name");
        assert_eq!(req.raw_query(), Some("page=2&sort=name"));
        assert_eq!(req.query().get("page").map(String::as_str), Some("2"));
        assert_eq!(req.param("sort"), Some("name"));
    }

    #[test]
    fn test_json_body() {
        let req = request("/", r#"{"name":"ada"}"#);
        assert_eq!(req.body(), Some(&json!({"name": "ada"})));

        #[derive(Deserialize)]
        struct User {
            name: String,
        }
        assert_eq!(req.body_as::<User>().unwrap().name, "ada");
    }

    #[test]
    fn test_empty_or_invalid_body_is_absent() {
        assert!(request("/", "").body().is_none());
        assert!(request("/", "{not json").body().is_none());
    }

    #[test]
    fn test_query_overrides_path_params() {
        let mut req = request("/users/1?id=2", "");
        req.set_path_params([("id".to_string(), "1".to_string()), ("tab".to_string(), "posts".to_string())].into());
        assert_eq!(req.param("id"), Some("2"));
        assert_eq!(req.param("tab"), Some("posts"));
    }

    #[test]
    fn test_query_as() {
        #[derive(Deserialize)]
        struct Page {
            page: u32,
        }
        let req = request("/items?page=3", "");
        assert_eq!(req.query_as::<Page>().unwrap().page, 3);
    }
}
