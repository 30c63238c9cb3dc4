//! HS256 token provider backed by `jsonwebtoken`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};

use miniauth_core::{GateError, GateResult};

use crate::{TokenClaims, TokenError, TokenProvider, TokenRequest, validate_claims};

/// Signing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    #[serde(skip_serializing)]
    pub secret: String,
    /// Issuer stamped on (and required from) every token, when set.
    pub issuer: Option<String>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: Some("miniauth".to_string()),
        }
    }
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> GateResult<()> {
        if self.secret.is_empty() {
            return Err(GateError::internal("token secret is not configured"));
        }
        if self.secret.len() < 32 {
            tracing::warn!("token secret is shorter than recommended (32 bytes)");
        }
        Ok(())
    }
}

/// `TokenProvider` over HMAC-SHA256 JWTs.
///
/// The library only verifies the signature (and issuer); the time window is
/// checked by `validate_claims` against the caller's clock so that expiry
/// and not-yet-valid are classified the same way everywhere.
#[derive(Clone)]
pub struct JwtTokenProvider {
    issuer: Option<String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenProvider {
    pub fn new(config: JwtConfig) -> GateResult<Self> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer,
            validation,
        })
    }
}

#[async_trait]
impl TokenProvider for JwtTokenProvider {
    async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                _ => TokenError::Malformed,
            }
        })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }

    async fn issue(&self, request: &TokenRequest, now: DateTime<Utc>) -> GateResult<String> {
        let expires_at = Duration::try_minutes(request.expiry_minutes)
            .filter(|d| *d > Duration::zero())
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                GateError::internal(format!("invalid token lifetime: {} minutes", request.expiry_minutes))
            })?;

        let claims = TokenClaims {
            sub: request.subject.clone(),
            roles: request.roles.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            profile: request.profile.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GateError::internal(format!("failed to sign token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Profile;

    const SECRET: &str = "test-secret-test-secret-test-secret";

    fn provider() -> JwtTokenProvider {
        JwtTokenProvider::new(JwtConfig::new(SECRET)).unwrap()
    }

    fn request(minutes: i64) -> TokenRequest {
        TokenRequest {
            subject: "alice".to_string(),
            roles: vec!["hr".to_string()],
            expiry_minutes: minutes,
            profile: Profile {
                first_name: Some("Alice".to_string()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn issued_token_validates_with_claims_intact() {
        let p = provider();
        let now = Utc::now();
        let token = p.issue(&request(10), now).await.unwrap();

        let claims = p.validate(&token, now).await.unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec!["hr".to_string()]);
        assert_eq!(claims.profile.first_name.as_deref(), Some("Alice"));
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[tokio::test]
    async fn token_past_expiry_is_expired() {
        let p = provider();
        let issued = Utc::now() - Duration::minutes(30);
        let token = p.issue(&request(10), issued).await.unwrap();

        assert_eq!(p.validate(&token, Utc::now()).await, Err(TokenError::Expired));
    }

    #[tokio::test]
    async fn token_from_another_secret_has_bad_signature() {
        let other = JwtTokenProvider::new(JwtConfig::new("another-secret-another-secret-xx")).unwrap();
        let now = Utc::now();
        let token = other.issue(&request(10), now).await.unwrap();

        assert_eq!(provider().validate(&token, now).await, Err(TokenError::BadSignature));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let err = provider().validate("not-a-jwt", Utc::now()).await.unwrap_err();
        assert_eq!(err, TokenError::Malformed);
    }

    #[tokio::test]
    async fn unusable_lifetime_is_an_error_not_a_panic() {
        let p = provider();
        for minutes in [0, -1, i64::MAX] {
            let err = p.issue(&request(minutes), Utc::now()).await.unwrap_err();
            assert!(matches!(err, GateError::Internal(_)), "{minutes}: {err:?}");
        }
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(JwtTokenProvider::new(JwtConfig::default()).is_err());
    }
}
