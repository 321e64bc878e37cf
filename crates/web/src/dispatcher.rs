//! Entry point invoked once per inbound request.
//!
//! [`Dispatcher::dispatch`] turns the host's `http::Request<Bytes>` into a [`Request`], finds the
//! first matching route, runs its chain and returns the finalized response. The whole path runs
//! inside an error boundary: a [`HandlerError`] returned by any step, or a panic, replaces
//! whatever was written with status 500 and `{"error": "<message> file:<file> line:<line>"}`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use bytes::Bytes;
use http::{Method, StatusCode};
use tracing::{debug, error};

use crate::error::{format_error_message, HandlerError, HandlerResult};
use crate::middleware::Next;
use crate::router::Router;
use crate::{Request, Response};

const UNKNOWN_FILE: &str = "unknown file";

/// Runs requests against an immutable [`Router`].
///
/// Holds no per-request state, so one dispatcher can be shared by any number of threads.
#[derive(Debug)]
pub struct Dispatcher {
    router: Router,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Dispatches one request and returns exactly one finalized response.
    pub fn dispatch(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        let mut req = Request::from_http(request);
        let mut resp = Response::new();
        self.dispatch_request(&mut req, &mut resp);
        resp.into_http()
    }

    /// Same as [`dispatch`](Self::dispatch), on an already built request and response.
    pub fn dispatch_request(&self, req: &mut Request, resp: &mut Response) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.route(req, resp)));

        let failure = match outcome {
            Ok(Ok(_finalized)) => return,
            Ok(Err(e)) => e,
            Err(payload) => HandlerError::with_location(panic_message(payload.as_ref()), UNKNOWN_FILE, 0),
        };

        error!(cause = %failure, file = failure.file(), line = failure.line(), method = %req.method(), path = %req.path(), "request failed");
        resp.replace_with_error(format_error_message(&failure.to_string(), failure.file(), failure.line()));
    }

    fn route(&self, req: &mut Request, resp: &mut Response) -> HandlerResult {
        let Some(route_match) = self.router.at(req) else {
            debug!(method = %req.method(), path = %req.path(), "no route matched");
            let status = if req.method() == Method::OPTIONS { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND };
            return resp.set_status(status).end();
        };

        let route = route_match.route();
        req.set_path_params(route_match.into_params());
        Next::new(route.chain(), route.handler()).run(req, resp)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "request processing panicked".to_string()
    }
}
