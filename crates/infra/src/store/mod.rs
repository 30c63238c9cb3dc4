//! Persistent storage of users, roles and endpoint overrides.
//!
//! The gate only needs a handful of generic operations, so storage is three
//! small async traits. `InMemoryAuthStore` backs tests and single-process
//! deployments; `PostgresAuthStore` (feature `postgres`) backs the rest.

use serde::{Deserialize, Serialize};

use miniauth_auth::{ADMIN_ROLE_ID, Principal, Profile, Role, RoleEndpoint};
use miniauth_core::{GateResult, new_id};

use crate::credentials::hash_password;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryAuthStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresAuthStore;

/// Username of the account seeded on first start.
pub const ADMIN_USERNAME: &str = "miniauth";
/// Initial password of the seeded account; change it after first login.
pub const ADMIN_INITIAL_PASSWORD: &str = "miniauth";

/// Stored user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub roles: Option<Vec<String>>,
    pub enable: bool,
    pub profile: Profile,
    pub r#type: Option<String>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            username: username.into(),
            password_hash: password_hash.into(),
            roles: None,
            enable: true,
            profile: Profile::default(),
            r#type: None,
        }
    }

    pub fn to_principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            username: self.username.clone(),
            roles: self.roles.clone(),
            enable: self.enable,
            profile: self.profile.clone(),
        }
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            first_name: self.profile.first_name.clone(),
            last_name: self.profile.last_name.clone(),
            emp_no: self.profile.emp_no.clone(),
            mail: self.profile.mail.clone(),
            enable: self.enable,
            roles: self.roles.clone(),
            r#type: self.r#type.clone(),
        }
    }
}

/// User as listed by the admin surface (no password material).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    #[serde(rename = "First_name")]
    pub first_name: Option<String>,
    #[serde(rename = "Last_name")]
    pub last_name: Option<String>,
    #[serde(rename = "Emp_no")]
    pub emp_no: Option<String>,
    pub mail: Option<String>,
    pub enable: bool,
    pub roles: Option<Vec<String>>,
    pub r#type: Option<String>,
}

/// One page of users plus the unpaged total.
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<UserView>,
    #[serde(rename = "totalItems")]
    pub total_items: u64,
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> GateResult<Option<UserRecord>>;

    async fn get(&self, id: &str) -> GateResult<Option<UserRecord>>;

    /// Users ordered by id; `page_index` is zero-based.
    async fn list(&self, page_index: u32, page_size: u32) -> GateResult<(Vec<UserRecord>, u64)>;

    /// Insert a new user; usernames are unique.
    async fn insert(&self, user: UserRecord) -> GateResult<()>;

    /// Update everything except the password hash.
    async fn update(&self, user: UserRecord) -> GateResult<()>;

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> GateResult<()>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: &str) -> GateResult<bool>;
}

#[async_trait::async_trait]
pub trait RoleStore: Send + Sync {
    async fn list(&self) -> GateResult<Vec<Role>>;

    async fn get(&self, id: &str) -> GateResult<Option<Role>>;

    /// Insert or update by id; role names are unique.
    async fn save(&self, role: Role) -> GateResult<()>;

    async fn delete(&self, id: &str) -> GateResult<bool>;
}

/// Persisted endpoint overrides (system entries that were edited, custom entries).
#[async_trait::async_trait]
pub trait EndpointStore: Send + Sync {
    async fn list(&self) -> GateResult<Vec<RoleEndpoint>>;

    async fn save(&self, endpoint: &RoleEndpoint) -> GateResult<()>;

    async fn delete(&self, id: &str) -> GateResult<bool>;
}

/// Ensure the admin role and the initial admin account exist.
pub async fn seed_defaults(users: &dyn UserStore, roles: &dyn RoleStore) -> GateResult<()> {
    if roles.get(ADMIN_ROLE_ID).await?.is_none() {
        roles
            .save(Role::new(ADMIN_ROLE_ID, ADMIN_ROLE_ID).with_type("miniauth"))
            .await?;
        tracing::info!(role = ADMIN_ROLE_ID, "seeded admin role");
    }

    if users.find_by_username(ADMIN_USERNAME).await?.is_none() {
        let mut admin = UserRecord::new(ADMIN_USERNAME, hash_password(ADMIN_INITIAL_PASSWORD)?);
        admin.roles = Some(vec![ADMIN_ROLE_ID.to_string()]);
        admin.r#type = Some("miniauth".to_string());
        users.insert(admin).await?;
        tracing::warn!(username = ADMIN_USERNAME, "seeded admin account with the default password");
    }

    Ok(())
}

pub(crate) fn join_list(items: Option<&[String]>) -> Option<String> {
    items.filter(|i| !i.is_empty()).map(|i| i.join(","))
}

pub(crate) fn split_list(raw: Option<String>) -> Option<Vec<String>> {
    raw.filter(|s| !s.trim().is_empty()).map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
}
