//! The route table.
//!
//! Routes are kept in registration order, which is also their match priority: the first route
//! whose method and pattern (and extra filters) accept a request wins, later routes are never
//! considered. Duplicate `(method, pattern)` pairs are allowed.
//!
//! ```
//! use switchyard_web::router::{get, post};
//! use switchyard_web::{handler_fn, Router};
//!
//! let router = Router::builder()
//!     .route("/users/:id", get(handler_fn(|req, resp| resp.json(&req.param("id")))))
//!     .route("/users", post(handler_fn(|_req, resp| resp.end())))
//!     .build();
//!
//! assert_eq!(router.routes().len(), 2);
//! ```

pub mod filter;
pub mod matcher;

use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::handler::RequestHandler;
use crate::middleware::{Middleware, SharedMiddleware};
use crate::request::Params;
use crate::Request;
use filter::{AllFilter, Filter, MethodFilter};
use matcher::{MatchResult, RoutePattern};

/// Immutable, ordered table of routes plus the global middlewares run before every route.
pub struct Router {
    routes: Vec<Route>,
    global_middlewares: Vec<SharedMiddleware>,
}

/// A registered route.
///
/// `chain` holds the global middlewares followed by the route's own middlewares.
pub struct Route {
    method: MethodFilter,
    pattern_text: String,
    pattern: RoutePattern,
    filters: AllFilter,
    chain: Vec<SharedMiddleware>,
    handler: Box<dyn RequestHandler>,
}

/// The first route accepting a request, with the parameters captured from its path.
#[derive(Debug)]
pub struct RouteMatch<'router> {
    route: &'router Route,
    params: Params,
}

impl Router {
    /// Creates a new router builder.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Finds the first route in registration order accepting `req`.
    pub fn at(&self, req: &Request) -> Option<RouteMatch<'_>> {
        self.routes.iter().enumerate().find_map(|(index, route)| {
            let params = route.accept(req)?;
            debug!(index, method = %req.method(), pattern = %route.pattern_text, path = %req.path(), "route matched");
            Some(RouteMatch { route, params })
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn global_middlewares(&self) -> &[SharedMiddleware] {
        &self.global_middlewares
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("global_middlewares", &self.global_middlewares.len())
            .finish()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern_text)
            .field("chain", &self.chain.len())
            .finish_non_exhaustive()
    }
}

impl Route {
    /// Checks method first, then the path pattern, then any extra filters.
    fn accept(&self, req: &Request) -> Option<Params> {
        if !self.method.matches(req) {
            return None;
        }
        let params = match self.pattern.matches(req.raw_path()) {
            MatchResult::Match(params) => params,
            MatchResult::NoMatch => return None,
        };
        self.filters.matches(req).then_some(params)
    }

    pub fn method(&self) -> &MethodFilter {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern_text
    }

    /// The middlewares this route runs, globals first.
    pub fn chain(&self) -> &[SharedMiddleware] {
        &self.chain
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }
}

impl<'router> RouteMatch<'router> {
    pub fn route(&self) -> &'router Route {
        self.route
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn into_params(self) -> Params {
        self.params
    }
}

pub struct RouterBuilder {
    routes: Vec<(String, RouteBuilder)>,
    global_middlewares: Vec<SharedMiddleware>,
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes)
            .field("global_middlewares", &self.global_middlewares.len())
            .finish()
    }
}

impl RouterBuilder {
    fn new() -> Self {
        Self { routes: Vec::new(), global_middlewares: Vec::new() }
    }

    /// Appends a route built with one of the method helpers, e.g. [`get`].
    pub fn route(mut self, pattern: impl Into<String>, route_builder: RouteBuilder) -> Self {
        self.routes.push((pattern.into(), route_builder));
        self
    }

    /// Appends a route for an arbitrary method.
    pub fn register<H: RequestHandler + 'static>(self, method: Method, pattern: impl Into<String>, handler: H) -> Self {
        self.route(pattern, on(method, handler))
    }

    /// Appends a route for an arbitrary method with its own middlewares.
    pub fn register_with<H: RequestHandler + 'static>(
        self,
        method: Method,
        pattern: impl Into<String>,
        middlewares: Vec<SharedMiddleware>,
        handler: H,
    ) -> Self {
        let route_builder = middlewares.into_iter().fold(on(method, handler), RouteBuilder::with_shared_middleware);
        self.route(pattern, route_builder)
    }

    /// Appends a middleware run before the middlewares of every route.
    pub fn with_global_middleware<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.with_shared_global_middleware(Arc::new(middleware))
    }

    pub fn with_shared_global_middleware(mut self, middleware: SharedMiddleware) -> Self {
        self.global_middlewares.push(middleware);
        self
    }

    /// Builds the router from the accumulated routes and middlewares
    pub fn build(self) -> Router {
        let global_middlewares = self.global_middlewares;
        let routes = self
            .routes
            .into_iter()
            .map(|(pattern_text, builder)| {
                let mut chain = Vec::with_capacity(global_middlewares.len() + builder.middlewares.len());
                chain.extend(global_middlewares.iter().cloned());
                chain.extend(builder.middlewares);
                Route {
                    method: builder.method,
                    pattern: RoutePattern::parse(&pattern_text),
                    pattern_text,
                    filters: builder.filters,
                    chain,
                    handler: builder.handler,
                }
            })
            .collect();

        Router { routes, global_middlewares }
    }
}

/// A route waiting for its pattern, created by [`get`], [`post`], [`on`] and friends.
pub struct RouteBuilder {
    method: MethodFilter,
    filters: AllFilter,
    middlewares: Vec<SharedMiddleware>,
    handler: Box<dyn RequestHandler>,
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("method", &self.method)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

impl RouteBuilder {
    fn new(method: MethodFilter, handler: Box<dyn RequestHandler>) -> Self {
        Self { method, filters: filter::all_filter(), middlewares: Vec::new(), handler }
    }

    /// Adds a filter that must also accept the request for this route to match.
    pub fn with<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filters.and(filter);
        self
    }

    /// Appends a middleware run after the global middlewares, before the handler.
    pub fn with_middleware<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.with_shared_middleware(Arc::new(middleware))
    }

    pub fn with_shared_middleware(mut self, middleware: SharedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }
}

/// Creates a route for `method`.
pub fn on<H: RequestHandler + 'static>(method: Method, handler: H) -> RouteBuilder {
    RouteBuilder::new(MethodFilter::Exact(method), Box::new(handler))
}

/// Creates a route accepting every method.
pub fn any<H: RequestHandler + 'static>(handler: H) -> RouteBuilder {
    RouteBuilder::new(MethodFilter::Any, Box::new(handler))
}

macro_rules! method_router {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a route for HTTP ", stringify!($upper_case_method), " requests.")]
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> RouteBuilder {
            on(Method::$upper_case_method, handler)
        }
    };
}

method_router!(get, GET);
method_router!(post, POST);
method_router!(put, PUT);
method_router!(delete, DELETE);
method_router!(head, HEAD);
method_router!(options, OPTIONS);
method_router!(connect, CONNECT);
method_router!(patch, PATCH);
method_router!(trace, TRACE);

#[cfg(test)]
mod tests {
    use super::filter::header;
    use super::{any, get, post, Router};
    use crate::handler::handler_fn;
    use crate::middleware::{middleware_fn, Next, SharedMiddleware};
    use crate::{HandlerResult, Request, Response};
    use bytes::Bytes;
    use http::Method;
    use std::sync::Arc;

    fn tagged(tag: &'static str) -> impl Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync {
        move |_req: &mut Request, resp: &mut Response| resp.send(tag)
    }

    fn request(method: Method, uri: &str) -> Request {
        let http_request = http::Request::builder()
            .method(method)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::new())
            .unwrap();
        Request::from_http(http_request)
    }

    fn matched_tag(router: &Router, req: &mut Request) -> Option<Bytes> {
        let route_match = router.at(req)?;
        let mut resp = Response::new();
        let _ = route_match.route().handler().invoke(req, &mut resp).unwrap();
        Some(resp.body().clone())
    }

    fn router() -> Router {
        Router::builder()
            .route("/users/:id", get(handler_fn(tagged("user"))))
            .route("/users/me", get(handler_fn(tagged("me"))))
            .route("/users/:id", get(handler_fn(tagged("duplicate"))))
            .route("/users", post(handler_fn(tagged("form"))).with(header("Content-Type", "text/plain")))
            .route("/users", post(handler_fn(tagged("create"))))
            .route("*", any(handler_fn(tagged("fallback"))))
            .build()
    }

    #[test]
    fn test_first_registered_route_wins() {
        let router = router();
        assert_eq!(matched_tag(&router, &mut request(Method::GET, "/users/me")).unwrap(), "user");
        assert_eq!(matched_tag(&router, &mut request(Method::GET, "/users/9")).unwrap(), "user");
    }

    #[test]
    fn test_params_are_captured() {
        let router = router();
        let route_match = router.at(&request(Method::GET, "/users/9")).unwrap();
        assert_eq!(route_match.params().get("id").map(String::as_str), Some("9"));
        assert_eq!(route_match.route().pattern(), "/users/:id");
    }

    #[test]
    fn test_method_must_match() {
        let router = router();
        assert_eq!(matched_tag(&router, &mut request(Method::POST, "/users")).unwrap(), "create");
        assert_eq!(matched_tag(&router, &mut request(Method::DELETE, "/users/9")).unwrap(), "fallback");
    }

    #[test]
    fn test_no_match_without_fallback() {
        let router = Router::builder().route("/a", get(handler_fn(tagged("a")))).build();
        assert!(router.at(&request(Method::GET, "/b")).is_none());
        assert!(router.at(&request(Method::POST, "/a")).is_none());
    }

    #[test]
    fn test_register_and_global_chain() {
        let noop = || -> SharedMiddleware {
            Arc::new(middleware_fn(|req: &mut Request, resp: &mut Response, next: Next<'_>| next.run(req, resp)))
        };
        let router = Router::builder()
            .with_global_middleware(middleware_fn(|req: &mut Request, resp: &mut Response, next: Next<'_>| {
                next.run(req, resp)
            }))
            .register(Method::PUT, "/a", handler_fn(tagged("a")))
            .register_with(Method::PATCH, "/b", vec![noop(), noop()], handler_fn(tagged("b")))
            .build();

        assert_eq!(router.global_middlewares().len(), 1);
        assert_eq!(router.routes()[0].chain().len(), 1);
        assert_eq!(router.routes()[1].chain().len(), 3);
        assert_eq!(matched_tag(&router, &mut request(Method::PATCH, "/b")).unwrap(), "b");
    }
}
