use http::Method;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::client::{ClientError, OutboundRequest, Transport};
use crate::config::RecaptchaConfig;

#[derive(Error, Debug)]
pub enum CaptchaError {
    #[error("captcha verification request failed: {source}")]
    Client {
        #[from]
        source: ClientError,
    },

    #[error("unexpected captcha verification answer: {source}")]
    Decode {
        #[from]
        source: serde_json::Error,
    },

    #[error("failed to encode captcha verification query: {source}")]
    Encode {
        #[from]
        source: serde_urlencoded::ser::Error,
    },
}

/// The verification service's answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Verification {
    pub success: bool,
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
    /// Only reported by score based (v3) keys.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
}

/// Verifies CAPTCHA response tokens against the site-verify endpoint.
#[derive(Debug)]
pub struct Recaptcha<T> {
    config: RecaptchaConfig,
    transport: T,
}

impl<T: Transport> Recaptcha<T> {
    pub fn new(config: RecaptchaConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Asks the verification service whether `token` was issued for this site's secret.
    pub fn validate(&self, token: &str) -> Result<Verification, CaptchaError> {
        let query = serde_urlencoded::to_string([("secret", self.config.secret.as_str()), ("response", token)])?;
        let url = format!("{}?{}", self.config.verify_url, query);

        let response = self.transport.send(OutboundRequest::new(Method::POST, url))?;
        let verification: Verification = response.json()?;
        debug!(status = response.status, success = verification.success, "captcha verified");
        Ok(verification)
    }
}
