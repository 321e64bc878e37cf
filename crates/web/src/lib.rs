//! A small synchronous request router with middleware chaining.
//!
//! The host hands every inbound request to [`Dispatcher::dispatch`]; the dispatcher picks the
//! first registered route whose method and path pattern match, runs the global middlewares, the
//! route's middlewares and finally the route handler, and returns the finalized response.
//!
//! ```
//! use bytes::Bytes;
//! use http::StatusCode;
//! use switchyard_web::router::get;
//! use switchyard_web::{handler_fn, middleware_fn, Dispatcher, Router};
//!
//! let router = Router::builder()
//!     .with_global_middleware(middleware_fn(|req, resp, next| {
//!         resp.header("Access-Control-Allow-Origin", "*")?;
//!         next.run(req, resp)
//!     }))
//!     .route("/hello/:name", get(handler_fn(|req, resp| {
//!         let name = req.param("name").unwrap_or("stranger").to_string();
//!         resp.json(&serde_json::json!({ "hello": name }))
//!     })))
//!     .build();
//!
//! let dispatcher = Dispatcher::new(router);
//! let request = http::Request::get("/hello/ada").body(Bytes::new()).unwrap();
//! let response = dispatcher.dispatch(request);
//!
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body().as_ref(), br#"{"hello":"ada"}"#);
//! ```

mod dispatcher;
mod error;
mod handler;
mod middleware;
mod request;
mod response;

pub mod router;

pub use dispatcher::Dispatcher;
pub use error::format_error_message;
pub use error::BoxError;
pub use error::HandlerError;
pub use error::HandlerResult;
pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use middleware::middleware_fn;
pub use middleware::FnMiddleware;
pub use middleware::Middleware;
pub use middleware::Next;
pub use middleware::SharedMiddleware;
pub use request::normalize_header_name;
pub use request::Params;
pub use request::Request;
pub use response::Finalized;
pub use response::Response;
pub use router::Router;
