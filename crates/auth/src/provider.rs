//! Capabilities the gate consumes but does not implement itself.
//!
//! Reference adapters live in `jwt` (tokens) and in `miniauth-infra`
//! (principals and credentials over the user store).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use miniauth_core::GateResult;

use crate::{Principal, Profile, TokenClaims, TokenError};

/// What the session gateway asks a token provider to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub subject: String,
    pub roles: Vec<String>,
    pub expiry_minutes: i64,
    pub profile: Profile,
}

/// Validates presented bearer tokens and issues new ones.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Verify signature and time window, returning the claims.
    async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;

    /// Sign a new token.
    async fn issue(&self, request: &TokenRequest, now: DateTime<Utc>) -> GateResult<String>;
}

/// Resolves a token subject to a principal record.
#[async_trait]
pub trait PrincipalLookup: Send + Sync {
    async fn find(&self, subject: &str) -> GateResult<Option<Principal>>;
}

/// Checks a username/password pair.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, username: &str, password: &str) -> GateResult<bool>;
}

#[async_trait]
impl<T> TokenProvider for Arc<T>
where
    T: TokenProvider + ?Sized,
{
    async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        (**self).validate(token, now).await
    }

    async fn issue(&self, request: &TokenRequest, now: DateTime<Utc>) -> GateResult<String> {
        (**self).issue(request, now).await
    }
}

#[async_trait]
impl<T> PrincipalLookup for Arc<T>
where
    T: PrincipalLookup + ?Sized,
{
    async fn find(&self, subject: &str) -> GateResult<Option<Principal>> {
        (**self).find(subject).await
    }
}

#[async_trait]
impl<T> CredentialValidator for Arc<T>
where
    T: CredentialValidator + ?Sized,
{
    async fn validate(&self, username: &str, password: &str) -> GateResult<bool> {
        (**self).validate(username, password).await
    }
}
