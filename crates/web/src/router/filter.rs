//! Request filtering module that provides composable request filters.
//!
//! Every route carries a method filter; extra filters added with
//! [`RouteBuilder::with`](super::RouteBuilder::with) must pass as well before the route counts
//! as a match. This module implements:
//! - Filter requests based on HTTP methods
//! - Filter requests based on headers
//! - Combine multiple filters using AND/OR logic
//! - Create custom filters using closures
//!
//! # Examples
//!
//! ```
//! use switchyard_web::router::filter::{all_filter, get_method, header};
//!
//! let mut combined = all_filter();
//! combined.and(get_method()).and(header("Authorization", "Bearer token"));
//! ```

use std::fmt;

use crate::Request;
use http::Method;

/// Core trait for request filtering.
///
/// Filters are shared by every dispatch running on the same router, hence `Send + Sync`.
pub trait Filter: Send + Sync {
    /// Check if the request matches this filter's criteria.
    fn matches(&self, req: &Request) -> bool;
}

/// A filter that wraps a closure.
struct FnFilter<F: Fn(&Request) -> bool>(F);

impl<F: Fn(&Request) -> bool + Send + Sync> Filter for FnFilter<F> {
    fn matches(&self, req: &Request) -> bool {
        (self.0)(req)
    }
}

/// Creates a new filter from a closure.
///
/// # Example
/// ```
/// use switchyard_web::router::filter::fn_filter;
///
/// let custom_filter = fn_filter(|req| req.path().starts_with("/api"));
/// ```
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&Request) -> bool + Send + Sync,
{
    FnFilter(f)
}

/// Creates a filter that always returns true.
pub fn true_filter() -> TrueFilter {
    TrueFilter
}

/// A filter that always returns true.
#[derive(Debug, Clone, Copy)]
pub struct TrueFilter;
impl Filter for TrueFilter {
    #[inline]
    fn matches(&self, _req: &Request) -> bool {
        true
    }
}

/// Creates a new OR-composed filter chain.
pub fn any_filter() -> AnyFilter {
    AnyFilter::new()
}

/// Compose filters with OR logic.
///
/// If any inner filter succeeds, the whole filter succeeds.
/// An empty filter chain returns true by default.
pub struct AnyFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl fmt::Debug for AnyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyFilter").field("filters", &self.filters.len()).finish()
    }
}

impl AnyFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a new filter to the OR chain.
    pub fn or<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AnyFilter {
    fn matches(&self, req: &Request) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(req))
    }
}

/// Creates a new AND-composed filter chain.
pub fn all_filter() -> AllFilter {
    AllFilter::new()
}

/// Compose filters with AND logic.
///
/// All inner filters must succeed for the whole filter to succeed.
/// An empty filter chain returns true by default.
pub struct AllFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl fmt::Debug for AllFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllFilter").field("filters", &self.filters.len()).finish()
    }
}

impl AllFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a new filter to the AND chain.
    pub fn and<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AllFilter {
    fn matches(&self, req: &Request) -> bool {
        self.filters.iter().all(|filter| filter.matches(req))
    }
}

/// A filter that matches the request method.
///
/// `Any` is the wildcard marker used by [`any`](super::any) routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Exact(Method),
}

impl Filter for MethodFilter {
    fn matches(&self, req: &Request) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(method) => method == req.method(),
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        Self::Exact(method)
    }
}

macro_rules! method_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a filter that matches HTTP ", stringify!($upper_case_method), " requests.")]
        #[inline]
        pub fn $method() -> MethodFilter {
            MethodFilter::Exact(Method::$upper_case_method)
        }
    };
}

method_filter!(get_method, GET);
method_filter!(post_method, POST);
method_filter!(put_method, PUT);
method_filter!(delete_method, DELETE);
method_filter!(head_method, HEAD);
method_filter!(options_method, OPTIONS);
method_filter!(connect_method, CONNECT);
method_filter!(patch_method, PATCH);
method_filter!(trace_method, TRACE);

/// Creates a filter that matches a specific header name and value.
///
/// The name is looked up in its normalized form, the value is compared exactly.
#[inline]
pub fn header(header_name: impl Into<String>, header_value: impl Into<String>) -> HeaderFilter {
    HeaderFilter { name: header_name.into(), value: header_value.into() }
}

/// A filter that matches HTTP headers.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    name: String,
    value: String,
}

impl Filter for HeaderFilter {
    fn matches(&self, req: &Request) -> bool {
        req.header(&self.name).is_some_and(|value| value == self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::{all_filter, any_filter, fn_filter, get_method, header, post_method, true_filter, Filter, MethodFilter};
    use crate::Request;
    use bytes::Bytes;
    use http::Method;

    fn request(method: Method, content_type: &str) -> Request {
        let http_request = http::Request::builder()
            .method(method)
            .uri("/api/items")
            .header(http::header::CONTENT_TYPE, content_type)
            .body(Bytes::new())
            .unwrap();
        Request::from_http(http_request)
    }

    #[test]
    fn test_method_filter() {
        let req = request(Method::GET, "text/plain");
        assert!(get_method().matches(&req));
        assert!(!post_method().matches(&req));
        assert!(MethodFilter::Any.matches(&req));
    }

    #[test]
    fn test_method_is_case_sensitive() {
        let req = request(Method::from_bytes(b"get").unwrap(), "text/plain");
        assert!(!get_method().matches(&req));
        assert!(MethodFilter::from(Method::from_bytes(b"get").unwrap()).matches(&req));
    }

    #[test]
    fn test_header_filter() {
        let req = request(Method::POST, "application/json");
        assert!(header("content-type", "application/json").matches(&req));
        assert!(!header("Content-Type", "text/plain").matches(&req));
        assert!(!header("X-Missing", "x").matches(&req));
    }

    #[test]
    fn test_composed_filters() {
        let req = request(Method::POST, "application/json");

        let mut all = all_filter();
        all.and(post_method()).and(fn_filter(|req| req.path().starts_with("/api")));
        assert!(all.matches(&req));
        all.and(get_method());
        assert!(!all.matches(&req));

        let mut any = any_filter();
        assert!(any.matches(&req));
        any.or(get_method()).or(post_method());
        assert!(any.matches(&req));

        assert!(true_filter().matches(&req));
    }
}
