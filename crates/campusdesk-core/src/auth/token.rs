//! Token pair, access-token claims and the decoded user identity.
//!
//! The access token is a signed JWT issued by the API. The client cannot
//! verify the signature (the key never leaves the server), so decoding is
//! limited to reading and validating the claim set. All consumers go through
//! [`TokenDecoder`] so the claim schema is checked in exactly one place.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access/refresh pair as returned by the token endpoints and as persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Bearer credentials must never end up in logs.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token must have 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("Token payload is not valid base64url: {0}")]
    Base64(String),

    #[error("Token payload is not valid claims JSON: {0}")]
    Json(String),

    #[error("Unknown user type claim: {0:?}")]
    UnknownRole(String),

    #[error("Token claim {0} is empty")]
    EmptyClaim(&'static str),
}

/// Account role, carried in the `user_type` claim as `S` or `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn from_claim(value: &str) -> Result<Self, TokenError> {
        match value {
            "S" => Ok(Role::Student),
            "T" => Ok(Role::Teacher),
            other => Err(TokenError::UnknownRole(other.to_string())),
        }
    }

    pub fn claim(&self) -> &'static str {
        match self {
            Role::Student => "S",
            Role::Teacher => "T",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
        }
    }
}

/// Raw claim set of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub enrollment_number: String,
    #[serde(default)]
    pub first_name: String,
    pub user_type: String,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Who is logged in, derived from the current access token.
///
/// Never stored on its own: it is recomputed every time a token pair is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub enrollment_number: String,
    pub display_name: String,
    pub role: Role,
    pub batch: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn from_claims(claims: Claims) -> Result<Self, TokenError> {
        let role = Role::from_claim(&claims.user_type)?;
        let enrollment_number = claims.enrollment_number.trim().to_string();
        if enrollment_number.is_empty() {
            return Err(TokenError::EmptyClaim("enrollment_number"));
        }

        // The API has been seen to send "No" for students without a batch.
        let batch = claims
            .batch
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty() && b != "No");

        let display_name = if claims.first_name.trim().is_empty() {
            enrollment_number.clone()
        } else {
            claims.first_name.trim().to_string()
        };

        Ok(Self {
            user_id: claims.user_id,
            enrollment_number,
            display_name,
            role,
            batch,
            issued_at: claims.iat.and_then(unix_to_utc),
            expires_at: claims.exp.and_then(unix_to_utc),
        })
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    /// Whether the access token is past its `exp` claim at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Validity window of the access token (`exp - iat`), when both are present.
    pub fn token_lifetime(&self) -> Option<chrono::Duration> {
        match (self.issued_at, self.expires_at) {
            (Some(iat), Some(exp)) if exp > iat => Some(exp - iat),
            _ => None,
        }
    }
}

fn unix_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// The single place access tokens are turned into identities.
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, access: &str) -> Result<Identity, TokenError>;
}

/// Decodes the payload segment of a compact JWT without verifying it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtDecoder;

impl JwtDecoder {
    pub fn claims(access: &str) -> Result<Claims, TokenError> {
        let segments: Vec<&str> = access.trim().split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::SegmentCount(segments.len()));
        }

        // Tolerate issuers that keep the `=` padding.
        let payload = segments[1].trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::Base64(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| TokenError::Json(e.to_string()))
    }
}

impl TokenDecoder for JwtDecoder {
    fn decode(&self, access: &str) -> Result<Identity, TokenError> {
        Identity::from_claims(Self::claims(access)?)
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use super::*;

    /// Build an unsigned compact JWT carrying `claims`.
    pub fn encode(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    pub fn student(enrollment: &str, batch: Option<&str>) -> String {
        encode(&serde_json::json!({
            "token_type": "access",
            "user_id": 7,
            "enrollment_number": enrollment,
            "first_name": "Asha",
            "user_type": "S",
            "batch": batch,
            "iat": 1_700_000_000,
            "exp": 1_700_000_300,
        }))
    }

    pub fn teacher(enrollment: &str) -> String {
        encode(&serde_json::json!({
            "token_type": "access",
            "user_id": 42,
            "enrollment_number": enrollment,
            "first_name": "Ravi",
            "user_type": "T",
            "iat": 1_700_000_000,
            "exp": 1_700_000_300,
        }))
    }
}
