use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Profile;

/// Bearer token claims (transport-agnostic).
///
/// Timestamps are seconds since the Unix epoch so the struct maps 1:1 onto a
/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the username the token was issued to.
    pub sub: String,

    /// Role ids held at issue time.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Issued-at.
    pub iat: i64,

    /// Expiry.
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(flatten)]
    pub profile: Profile,
}

/// Why a presented token was rejected.
///
/// Every variant reduces to "unauthenticated" in the decision engine; the
/// display text is what the caller sees in the denial body.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is not valid yet")]
    NotYetValid,

    #[error("Token is expired")]
    Expired,

    #[error("Token signature is not valid")]
    BadSignature,

    #[error("Token is malformed")]
    Malformed,
}

/// Deterministically validate the time window and subject of decoded claims.
///
/// Signature verification happens before this, in the token provider.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.sub.trim().is_empty() {
        return Err(TokenError::Malformed);
    }
    if claims.exp <= claims.iat {
        return Err(TokenError::Malformed);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}
