//! Bearer token payload decoding.
//!
//! Tokens are treated as opaque apart from the JSON payload segment, which
//! carries the `exp` claim and the realm role list. No signature
//! verification happens here; the server remains the authority.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Seconds subtracted from `exp` before comparing against the current time,
/// so a request that passes the local check is not rejected in flight.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Payload segments show up both with and without `=` padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Token has no payload segment")]
    MissingPayload,

    #[error("Token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as epoch seconds. NumericDate may carry a fraction.
    pub exp: Option<f64>,
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Decode the payload segment of a `header.payload.signature` token.
    pub fn decode(token: &str) -> Result<Self, DecodeError> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|segment| !segment.is_empty())
            .ok_or(DecodeError::MissingPayload)?;
        let bytes = PAYLOAD_ENGINE.decode(payload)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Realm roles carried by the token, empty when the claim is absent.
    pub fn roles(&self) -> Vec<String> {
        self.realm_access
            .as_ref()
            .map(|access| access.roles.clone())
            .unwrap_or_default()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) if exp.is_finite() => {
                exp - EXPIRY_BUFFER_SECS as f64 <= now.timestamp() as f64
            }
            _ => true,
        }
    }
}

/// A token that cannot be decoded or carries no `exp` counts as expired.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    match TokenClaims::decode(token) {
        Ok(claims) => claims.is_expired_at(now),
        Err(e) => {
            debug!(error = %e, "Failed to decode token");
            true
        }
    }
}
