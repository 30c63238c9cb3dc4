//! `PrincipalLookup` backed by the user store.

use std::sync::Arc;

use miniauth_auth::{Principal, PrincipalLookup};
use miniauth_core::GateResult;

use crate::store::UserStore;

/// Resolves a token subject (the username) to the current user record, so
/// role and enable changes apply to tokens that are already issued.
pub struct StorePrincipalLookup {
    users: Arc<dyn UserStore>,
}

impl StorePrincipalLookup {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait::async_trait]
impl PrincipalLookup for StorePrincipalLookup {
    async fn find(&self, subject: &str) -> GateResult<Option<Principal>> {
        Ok(self
            .users
            .find_by_username(subject)
            .await?
            .map(|u| u.to_principal()))
    }
}
