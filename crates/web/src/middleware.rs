//! Middlewares and the chain that runs them.
//!
//! A route's chain is the global middlewares followed by the route's own middlewares, ending in
//! the route handler. Each middleware receives a [`Next`] and decides whether the rest of the
//! chain runs:
//!
//! ```
//! use http::StatusCode;
//! use switchyard_web::{middleware_fn, HandlerResult, Next, Request, Response};
//!
//! fn require_api_key(req: &mut Request, resp: &mut Response, next: Next<'_>) -> HandlerResult {
//!     if req.header("x-api-key") == Some("secret") {
//!         next.run(req, resp)
//!     } else {
//!         resp.set_status(StatusCode::UNAUTHORIZED).end()
//!     }
//! }
//!
//! let _middleware = middleware_fn(require_api_key);
//! ```
//!
//! `Next::run` takes the chain by value, so a middleware can proceed at most once.

use std::fmt;
use std::sync::Arc;

use crate::error::HandlerResult;
use crate::handler::RequestHandler;
use crate::response::Finalized;
use crate::{Request, Response};

/// One step of a route's chain.
pub trait Middleware: Send + Sync {
    /// Handles the request, calling `next.run(req, resp)` to continue the chain.
    ///
    /// Returning without running `next` halts the chain; the middleware must then finalize the
    /// response itself.
    fn call(&self, req: &mut Request, resp: &mut Response, next: Next<'_>) -> HandlerResult;
}

pub type SharedMiddleware = Arc<dyn Middleware>;

#[derive(Clone, Copy, Debug)]
pub struct FnMiddleware<F> {
    f: F,
}

pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut Request, &mut Response, Next<'_>) -> HandlerResult + Send + Sync,
{
    FnMiddleware { f }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request, &mut Response, Next<'_>) -> HandlerResult + Send + Sync,
{
    fn call(&self, req: &mut Request, resp: &mut Response, next: Next<'_>) -> HandlerResult {
        (self.f)(req, resp, next)
    }
}

/// The rest of a route's chain: the remaining middlewares and the terminal handler.
pub struct Next<'a> {
    middlewares: &'a [SharedMiddleware],
    cursor: usize,
    handler: &'a dyn RequestHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(middlewares: &'a [SharedMiddleware], handler: &'a dyn RequestHandler) -> Self {
        Self { middlewares, cursor: 0, handler }
    }

    /// Runs the next middleware, or the handler once all middlewares ran.
    ///
    /// Nothing runs when the response is already finalized.
    pub fn run(mut self, req: &mut Request, resp: &mut Response) -> HandlerResult {
        if resp.is_terminated() {
            return Ok(Finalized::new());
        }

        let middlewares = self.middlewares;
        match middlewares.get(self.cursor) {
            Some(middleware) => {
                self.cursor += 1;
                middleware.call(req, resp, self)
            }
            None => self.handler.invoke(req, resp),
        }
    }

    /// How many middlewares are still ahead of the handler.
    pub fn remaining(&self) -> usize {
        self.middlewares.len() - self.cursor
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("cursor", &self.cursor).field("len", &self.middlewares.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{middleware_fn, Next, SharedMiddleware};
    use crate::handler::handler_fn;
    use crate::{HandlerResult, Request, Response};
    use bytes::Bytes;
    use http::StatusCode;
    use std::sync::{Arc, Mutex};

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn request() -> Request {
        Request::from_http(http::Request::new(Bytes::new()))
    }

    fn recording(trace: &Trace, name: &'static str, proceed: bool) -> SharedMiddleware {
        let trace = trace.clone();
        Arc::new(middleware_fn(move |req: &mut Request, resp: &mut Response, next: Next<'_>| -> HandlerResult {
            trace.lock().unwrap().push(name);
            if proceed {
                next.run(req, resp)
            } else {
                resp.set_status(StatusCode::FORBIDDEN).end()
            }
        }))
    }

    #[test]
    fn test_runs_in_order_then_handler() {
        let trace = Trace::default();
        let chain = vec![recording(&trace, "a", true), recording(&trace, "b", true), recording(&trace, "c", true)];
        let handler_trace = trace.clone();
        let handler = handler_fn(move |_req, resp| {
            handler_trace.lock().unwrap().push("handler");
            resp.send("done")
        });

        let mut resp = Response::new();
        let next = Next::new(&chain, &handler);
        assert_eq!(next.remaining(), 3);
        assert!(next.run(&mut request(), &mut resp).is_ok());

        assert_eq!(*trace.lock().unwrap(), vec!["a", "b", "c", "handler"]);
        assert_eq!(resp.body().as_ref(), b"done");
    }

    #[test]
    fn test_middleware_halts_chain() {
        let trace = Trace::default();
        let chain = vec![recording(&trace, "a", true), recording(&trace, "b", false), recording(&trace, "c", true)];
        let handler_trace = trace.clone();
        let handler = handler_fn(move |_req, resp| {
            handler_trace.lock().unwrap().push("handler");
            resp.end()
        });

        let mut resp = Response::new();
        assert!(Next::new(&chain, &handler).run(&mut request(), &mut resp).is_ok());

        assert_eq!(*trace.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_finalized_response_stops_chain() {
        let trace = Trace::default();
        let eager: SharedMiddleware = Arc::new(middleware_fn(|req: &mut Request, resp: &mut Response, next: Next<'_>| {
            let _ = resp.send("early")?;
            next.run(req, resp)
        }));
        let chain = vec![eager, recording(&trace, "late", true)];
        let handler = handler_fn(|_req, resp| resp.send("handler"));

        let mut resp = Response::new();
        assert!(Next::new(&chain, &handler).run(&mut request(), &mut resp).is_ok());

        assert!(trace.lock().unwrap().is_empty());
        assert_eq!(resp.body().as_ref(), b"early");
    }

    #[test]
    fn test_empty_chain_runs_handler() {
        let handler = handler_fn(|_req, resp| resp.send("only handler"));
        let mut resp = Response::new();
        assert!(Next::new(&[], &handler).run(&mut request(), &mut resp).is_ok());
        assert_eq!(resp.body().as_ref(), b"only handler");
    }
}
