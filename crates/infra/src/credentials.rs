//! Argon2 password hashing and the store-backed credential validator.

use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use miniauth_auth::CredentialValidator;
use miniauth_core::{GateError, GateResult};

use crate::store::UserStore;

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> GateResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| GateError::internal(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| GateError::internal(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| GateError::internal(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// `false` for a wrong password and for anything that is not a PHC string.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Accepts an existing, enabled user whose stored hash matches.
pub struct Argon2Credentials {
    users: Arc<dyn UserStore>,
}

impl Argon2Credentials {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait::async_trait]
impl CredentialValidator for Argon2Credentials {
    async fn validate(&self, username: &str, password: &str) -> GateResult<bool> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Ok(false);
        };
        if !user.enable {
            tracing::debug!(username, "login attempt for disabled user");
            return Ok(false);
        }

        // CPU-bound; run on the blocking pool.
        let password = password.to_string();
        tokio::task::spawn_blocking(move || verify_password(&user.password_hash, &password))
            .await
            .map_err(|e| GateError::internal(e.to_string()))
    }
}
