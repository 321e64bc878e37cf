//! Guards that plug the collaborators into a router's middleware chain.

use http::StatusCode;
use serde_json::{json, Value};
use switchyard_web::{HandlerResult, Middleware, Next, Request, Response};
use tracing::{debug, warn};

use crate::client::Transport;
use crate::jwt::Jwt;
use crate::recaptcha::Recaptcha;

pub const RECAPTCHA_BODY_FIELD: &str = "g-recaptcha-response";
pub const RECAPTCHA_HEADER: &str = "X-Recaptcha-Token";

/// Verified token payload, stored in the request extensions by [`JwtAuth`].
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(pub Value);

/// Lets a request through only with a valid `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct JwtAuth {
    jwt: Jwt,
}

impl JwtAuth {
    pub fn new(jwt: Jwt) -> Self {
        Self { jwt }
    }
}

impl Middleware for JwtAuth {
    fn call(&self, req: &mut Request, resp: &mut Response, next: Next<'_>) -> HandlerResult {
        let token = req.header("Authorization").and_then(|value| value.strip_prefix("Bearer ")).map(str::trim);

        let claims = match token.map(|token| self.jwt.verified_payload::<Value>(token)) {
            Some(Ok(claims)) => claims,
            Some(Err(e)) => {
                warn!(path = req.path(), cause = %e, "rejected bearer token");
                return unauthorized(resp);
            }
            None => {
                warn!(path = req.path(), "missing bearer token");
                return unauthorized(resp);
            }
        };

        req.extensions_mut().insert(Claims(claims));
        next.run(req, resp)
    }
}

fn unauthorized(resp: &mut Response) -> HandlerResult {
    resp.set_status(StatusCode::UNAUTHORIZED).json(&json!({ "error": "unauthorized" }))
}

/// Lets a request through only when its CAPTCHA token verifies.
///
/// The token is read from the body field `g-recaptcha-response`, falling back to the
/// `X-Recaptcha-Token` header.
#[derive(Debug)]
pub struct RecaptchaGuard<T> {
    recaptcha: Recaptcha<T>,
}

impl<T: Transport> RecaptchaGuard<T> {
    pub fn new(recaptcha: Recaptcha<T>) -> Self {
        Self { recaptcha }
    }
}

impl<T: Transport> Middleware for RecaptchaGuard<T> {
    fn call(&self, req: &mut Request, resp: &mut Response, next: Next<'_>) -> HandlerResult {
        let token = req
            .body()
            .and_then(|body| body.get(RECAPTCHA_BODY_FIELD))
            .and_then(Value::as_str)
            .or_else(|| req.header(RECAPTCHA_HEADER))
            .map(str::to_string);

        let passed = match token {
            Some(token) => {
                let verification = self.recaptcha.validate(&token)?;
                debug!(success = verification.success, error_codes = ?verification.error_codes, "captcha checked");
                verification.success
            }
            None => false,
        };

        if !passed {
            warn!(path = req.path(), "captcha verification failed");
            return resp.set_status(StatusCode::BAD_REQUEST).json(&json!({ "error": "captcha verification failed" }));
        }

        next.run(req, resp)
    }
}
