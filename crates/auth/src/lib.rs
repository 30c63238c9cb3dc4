//! `miniauth-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it owns the
//! RBAC model, the capability traits the gate consumes, and the decision engine.

pub mod claims;
pub mod decision;
pub mod endpoint;
pub mod jwt;
pub mod principal;
pub mod provider;
pub mod roles;

pub use claims::{TokenClaims, TokenError, validate_claims};
pub use decision::{Classification, Decision, DecisionEngine, UNAUTHORIZED};
pub use endpoint::{EndpointType, EndpointUpdate, RoleEndpoint};
pub use jwt::{JwtConfig, JwtTokenProvider};
pub use principal::{Principal, Profile};
pub use provider::{CredentialValidator, PrincipalLookup, TokenProvider, TokenRequest};
pub use roles::{ADMIN_ROLE_ID, Role, roles_intersect};
