//! HS256 JSON Web Tokens.
//!
//! A token is `base64url(header).base64url(payload).base64url(signature)` where the signature is
//! HMAC-SHA256 over the first two parts, all parts unpadded. A payload with a positive numeric
//! `exp` claim is rejected once the current unix time passes it.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use crate::config::JwtConfig;

type HmacSha256 = Hmac<Sha256>;

/// URL-safe alphabet, no padding on encode, padding tolerated on decode.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_encode_padding(false).with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("malformed token: {reason}")]
    Malformed { reason: String },

    #[error("token signature does not match")]
    BadSignature,

    #[error("token expired at {exp}")]
    Expired { exp: f64 },

    #[error("invalid token json: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl JwtError {
    pub fn malformed<S: ToString>(str: S) -> Self {
        Self::Malformed { reason: str.to_string() }
    }
}

#[derive(Serialize)]
struct Header {
    typ: &'static str,
    alg: &'static str,
}

const HEADER: Header = Header { typ: "JWT", alg: "HS256" };

/// Signs and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct Jwt {
    secret: Vec<u8>,
}

impl std::fmt::Debug for Jwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwt").field("secret", &"<redacted>").finish()
    }
}

impl From<&JwtConfig> for Jwt {
    fn from(config: &JwtConfig) -> Self {
        Self::new(config.secret.as_bytes())
    }
}

impl Jwt {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Serializes `payload` and signs it.
    pub fn build<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, JwtError> {
        let header = BASE64_URL.encode(serde_json::to_vec(&HEADER)?);
        let payload = BASE64_URL.encode(serde_json::to_vec(payload)?);
        let signing_input = format!("{header}.{payload}");
        let signature = BASE64_URL.encode(self.mac(&signing_input).finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Checks the signature and, when present, the `exp` claim.
    pub fn validate(&self, token: &str) -> Result<(), JwtError> {
        self.validate_at(token, unix_now())
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }

    /// Validates and decodes the payload in one step.
    pub fn verified_payload<T: DeserializeOwned>(&self, token: &str) -> Result<T, JwtError> {
        self.validate(token)?;
        payload(token)
    }

    #[allow(clippy::cast_precision_loss)]
    fn validate_at(&self, token: &str, now: u64) -> Result<(), JwtError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or_else(|| JwtError::malformed("missing signature"))?;
        if signing_input.split('.').count() != 2 {
            return Err(JwtError::malformed("expected three parts"));
        }

        let signature = BASE64_URL.decode(signature).map_err(JwtError::malformed)?;
        self.mac(signing_input).verify_slice(&signature).map_err(|_e| JwtError::BadSignature)?;

        let claims: Value = payload(token)?;
        // issuers may send a fractional `exp`
        match claims.get("exp").and_then(Value::as_f64) {
            Some(exp) if exp > 0.0 && now as f64 > exp => Err(JwtError::Expired { exp }),
            _ => Ok(()),
        }
    }

    fn mac(&self, signing_input: &str) -> HmacSha256 {
        // hmac accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(&self.secret).unwrap_or_else(|_| unreachable!());
        mac.update(signing_input.as_bytes());
        mac
    }
}

/// Decodes the payload of `token` without checking its signature.
pub fn payload<T: DeserializeOwned>(token: &str) -> Result<T, JwtError> {
    let encoded = token.split('.').nth(1).ok_or_else(|| JwtError::malformed("missing payload"))?;
    let bytes = BASE64_URL.decode(encoded).map_err(JwtError::malformed)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
}
