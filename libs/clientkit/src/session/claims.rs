//! Unverified decoding of access-token claims.
//!
//! The client reads `userId` and `role` from the JWT payload to decide what to
//! show; it never checks the signature. The backend stays the authority.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT segments are base64url; some issuers keep the padding, most drop it.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Account role as issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Claims the client relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: i64,
    pub role: Role,
    #[serde(default)]
    pub exp: Option<i64>,
}

#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("token is not a JWT (expected three dot-separated segments)")]
    Malformed,

    #[error("token payload is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("token payload does not carry the expected claims: {0}")]
    Payload(#[from] serde_json::Error),
}

pub fn decode_claims(token: &str) -> Result<AccessClaims, ClaimsError> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ClaimsError::Malformed);
    };
    if payload.is_empty() {
        return Err(ClaimsError::Malformed);
    }

    let raw = PAYLOAD_ENGINE.decode(payload)?;
    Ok(serde_json::from_slice(&raw)?)
}
