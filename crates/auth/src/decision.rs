//! Authorization decision engine.
//!
//! Given how a request was classified and the token it presented, decide
//! whether it may proceed. The engine performs no HTTP work; turning a
//! `Decision` into a response is the dispatcher's job.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use miniauth_core::GateResult;

use crate::{PrincipalLookup, RoleEndpoint, TokenError, TokenProvider, roles_intersect};

/// Denial reason used when no more specific one applies.
pub const UNAUTHORIZED: &str = "Unauthorized";

/// How the request classifier resolved an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A registered endpoint governs the request.
    Endpoint(Arc<RoleEndpoint>),
    /// Under the managed prefix but not registered (login, login page, assets).
    AdminUnregistered,
    /// Outside anything the operator registered.
    Unmanaged,
}

impl Classification {
    pub fn endpoint(&self) -> Option<&RoleEndpoint> {
        match self {
            Classification::Endpoint(ep) => Some(ep),
            _ => None,
        }
    }
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    PassThrough,
    DenyUnauthenticated { reason: String },
    DenyForbidden { reason: String },
}

impl Decision {
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Decision::DenyUnauthenticated {
            reason: reason.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Decision::DenyForbidden {
            reason: reason.into(),
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(
            self,
            Decision::DenyUnauthenticated { .. } | Decision::DenyForbidden { .. }
        )
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::DenyUnauthenticated { reason } | Decision::DenyForbidden { reason } => {
                Some(reason)
            }
            _ => None,
        }
    }
}

impl From<TokenError> for Decision {
    fn from(value: TokenError) -> Self {
        Decision::unauthenticated(value.to_string())
    }
}

/// The token-validate / role-match state machine.
#[derive(Clone)]
pub struct DecisionEngine {
    tokens: Arc<dyn TokenProvider>,
    principals: Arc<dyn PrincipalLookup>,
}

impl DecisionEngine {
    pub fn new(tokens: Arc<dyn TokenProvider>, principals: Arc<dyn PrincipalLookup>) -> Self {
        Self { tokens, principals }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        &self.tokens
    }

    pub fn principals(&self) -> &Arc<dyn PrincipalLookup> {
        &self.principals
    }

    /// Decide for one request.
    ///
    /// `Err` only for collaborator failures (storage down and the like); every
    /// token or role problem is a `Decision`.
    pub async fn decide(
        &self,
        classification: &Classification,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> GateResult<Decision> {
        let endpoint = match classification {
            Classification::Unmanaged => return Ok(Decision::PassThrough),
            Classification::AdminUnregistered => return Ok(Decision::Allow),
            Classification::Endpoint(ep) => ep,
        };

        if !endpoint.enable {
            return Ok(Decision::Allow);
        }

        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Decision::unauthenticated(UNAUTHORIZED));
        };

        let claims = match self.tokens.validate(token, now).await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(endpoint = %endpoint.id, reason = %e, "token rejected");
                return Ok(e.into());
            }
        };
        if claims.sub.trim().is_empty() {
            return Ok(TokenError::Malformed.into());
        }

        let Some(principal) = self.principals.find(&claims.sub).await? else {
            tracing::debug!(endpoint = %endpoint.id, subject = %claims.sub, "principal not found");
            return Ok(Decision::unauthenticated(UNAUTHORIZED));
        };
        if !principal.enable {
            tracing::debug!(endpoint = %endpoint.id, subject = %claims.sub, "principal disabled");
            return Ok(Decision::unauthenticated(UNAUTHORIZED));
        }

        let required = endpoint.required_roles();
        if required.is_empty() || roles_intersect(principal.roles.as_deref(), required) {
            Ok(Decision::Allow)
        } else {
            tracing::debug!(
                endpoint = %endpoint.id,
                subject = %claims.sub,
                required = ?required,
                held = ?principal.roles,
                "no matching role"
            );
            Ok(Decision::forbidden(UNAUTHORIZED))
        }
    }
}
