//! Bearer credential decoding.
//!
//! A credential is a three-segment `header.payload.signature` token. Decoding
//! only parses structure: the signature segment is never checked and the
//! expiry claim is surfaced but not enforced (see [`validate_claims`]).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::Role;

/// Claims decoded from a server-issued credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject / user identifier (`sub`, or the API's `id` / `userId`).
    pub subject_id: Option<String>,

    /// Role granted by the API. Defaults to [`Role::USER`] when absent.
    pub role: Role,

    /// Human readable name (`name`, `displayName` or `username`).
    pub display_name: Option<String>,

    /// Expiration instant (`exp`), if the credential carries one.
    pub expires_at: Option<DateTime<Utc>>,

    /// Issued-at instant (`iat`), if the credential carries one.
    pub issued_at: Option<DateTime<Utc>>,

    /// Any other payload members, kept verbatim.
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Name to show for this principal, falling back to email and subject.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or_else(|| self.extra.get("email").and_then(Value::as_str))
            .or(self.subject_id.as_deref())
            .unwrap_or("User")
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// Structural decoding failure. Never accompanied by partial claims.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedCredentialError {
    #[error("credential is empty")]
    Empty,

    #[error("credential must have 3 dot-separated segments, found {found}")]
    SegmentCount { found: usize },

    #[error("credential {segment} segment is empty")]
    EmptySegment { segment: &'static str },

    #[error("credential {segment} segment is not valid base64url: {reason}")]
    Encoding { segment: &'static str, reason: String },

    #[error("credential {segment} segment is not a JSON object: {reason}")]
    NotJsonObject { segment: &'static str, reason: String },

    #[error("invalid '{claim}' claim: {reason}")]
    InvalidClaim { claim: &'static str, reason: String },
}

/// Decode a raw credential into [`Claims`].
///
/// Pure and side-effect free. Signature and expiry are not checked.
pub fn decode(raw: &str) -> Result<Claims, MalformedCredentialError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MalformedCredentialError::Empty);
    }

    let segments: Vec<&str> = raw.split('.').collect();
    let [header, payload, _signature] = segments.as_slice() else {
        return Err(MalformedCredentialError::SegmentCount { found: segments.len() });
    };

    // Only the header shape matters; its algorithm is irrelevant without verification.
    decode_object(header, "header")?;
    let payload = decode_object(payload, "payload")?;

    let raw_claims: RawClaims = serde_json::from_value(Value::Object(payload)).map_err(|e| {
        MalformedCredentialError::NotJsonObject {
            segment: "payload",
            reason: e.to_string(),
        }
    })?;

    raw_claims.try_into()
}

fn decode_object(
    segment: &str,
    name: &'static str,
) -> Result<Map<String, Value>, MalformedCredentialError> {
    if segment.is_empty() {
        return Err(MalformedCredentialError::EmptySegment { segment: name });
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| MalformedCredentialError::Encoding {
            segment: name,
            reason: e.to_string(),
        })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MalformedCredentialError::NotJsonObject {
            segment: name,
            reason: format!("found {}", json_kind(&other)),
        }),
        Err(e) => Err(MalformedCredentialError::NotJsonObject {
            segment: name,
            reason: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Wire shape of the payload. The API has issued several spellings of the
/// subject and name claims over time; all are accepted.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "userId")]
    user_id: Option<Value>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    // NumericDate may carry a fractional part.
    #[serde(default)]
    exp: Option<f64>,
    #[serde(default)]
    iat: Option<f64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawClaims> for Claims {
    type Error = MalformedCredentialError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let subject_id = match raw.sub.or(raw.id).or(raw.user_id) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(MalformedCredentialError::InvalidClaim {
                    claim: "sub",
                    reason: format!("expected a string or number, found {}", json_kind(&other)),
                });
            }
        };

        Ok(Self {
            subject_id,
            role: raw.role.unwrap_or_default(),
            display_name: raw.name.or(raw.display_name).or(raw.username),
            expires_at: timestamp(raw.exp, "exp")?,
            issued_at: timestamp(raw.iat, "iat")?,
            extra: raw.extra,
        })
    }
}

/// Whole seconds of a NumericDate; the fraction is truncated.
fn timestamp(
    seconds: Option<f64>,
    claim: &'static str,
) -> Result<Option<DateTime<Utc>>, MalformedCredentialError> {
    seconds
        .map(|secs| {
            let whole = secs.trunc();
            let in_range = whole.is_finite() && whole.abs() < i64::MAX as f64;
            in_range
                .then(|| DateTime::from_timestamp(whole as i64, 0))
                .flatten()
                .ok_or_else(|| MalformedCredentialError::InvalidClaim {
                    claim,
                    reason: format!("timestamp {secs} is out of range"),
                })
        })
        .transpose()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsValidationError {
    #[error("credential expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
}

/// Check the time window of decoded claims.
///
/// Decoding never calls this; callers that want expiry enforced do.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), ClaimsValidationError> {
    match claims.expires_at {
        Some(expired_at) if now >= expired_at => Err(ClaimsValidationError::Expired { expired_at }),
        _ => Ok(()),
    }
}
