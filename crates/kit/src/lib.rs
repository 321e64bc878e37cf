//! Collaborators for `switchyard-web` applications.
//!
//! - [`client`]: blocking outbound HTTP with JSON bodies
//! - [`recaptcha`]: CAPTCHA token verification
//! - [`jwt`]: HS256 token signing and verification
//! - [`db`]: a shared connection handle and SQL text builders
//! - [`middleware`]: JWT and CAPTCHA guards for the router's middleware chain

pub mod client;
pub mod config;
pub mod db;
pub mod jwt;
pub mod middleware;
pub mod recaptcha;

pub use client::HttpClient;
pub use config::JwtConfig;
pub use config::RecaptchaConfig;
pub use jwt::Jwt;
pub use middleware::Claims;
pub use middleware::JwtAuth;
pub use middleware::RecaptchaGuard;
pub use recaptcha::Recaptcha;
