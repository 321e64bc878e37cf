//! Settings for the collaborators.
//!
//! The structs deserialize with `serde`, so a host can keep them in whatever configuration
//! source it already reads.

use serde::Deserialize;

pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecaptchaConfig {
    pub secret: String,
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
}

impl RecaptchaConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into(), verify_url: default_verify_url() }
    }
}

fn default_verify_url() -> String {
    DEFAULT_RECAPTCHA_VERIFY_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtConfig {
    /// HMAC key for HS256 signatures.
    pub secret: String,
}
