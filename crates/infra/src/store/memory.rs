//! In-memory auth store for tests and single-process deployments.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use miniauth_auth::{Role, RoleEndpoint};
use miniauth_core::{GateError, GateResult};

use super::{EndpointStore, RoleStore, UserRecord, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, UserRecord>,
    roles: BTreeMap<String, Role>,
    endpoints: BTreeMap<String, RoleEndpoint>,
}

/// All three stores over one lock-protected set of maps.
#[derive(Debug, Default)]
pub struct InMemoryAuthStore {
    inner: RwLock<Tables>,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> GateResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| GateError::storage("in-memory store lock poisoned"))
    }

    fn write(&self) -> GateResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| GateError::storage("in-memory store lock poisoned"))
    }
}

fn username_taken(tables: &Tables, username: &str, except_id: &str) -> bool {
    tables
        .users
        .values()
        .any(|u| u.id != except_id && u.username.eq_ignore_ascii_case(username))
}

#[async_trait::async_trait]
impl UserStore for InMemoryAuthStore {
    async fn find_by_username(&self, username: &str) -> GateResult<Option<UserRecord>> {
        let tables = self.read()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn get(&self, id: &str) -> GateResult<Option<UserRecord>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn list(&self, page_index: u32, page_size: u32) -> GateResult<(Vec<UserRecord>, u64)> {
        let tables = self.read()?;
        let total = tables.users.len() as u64;
        let skip = page_index as usize * page_size as usize;
        let page = tables
            .users
            .values()
            .skip(skip)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn insert(&self, user: UserRecord) -> GateResult<()> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&user.id) {
            return Err(GateError::validation(format!("user id {} already exists", user.id)));
        }
        if username_taken(&tables, &user.username, &user.id) {
            return Err(GateError::validation(format!("username {} already exists", user.username)));
        }
        tables.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update(&self, user: UserRecord) -> GateResult<()> {
        let mut tables = self.write()?;
        if username_taken(&tables, &user.username, &user.id) {
            return Err(GateError::validation(format!("username {} already exists", user.username)));
        }
        let Some(existing) = tables.users.get_mut(&user.id) else {
            return Err(GateError::not_found(format!("user {}", user.id)));
        };
        let password_hash = std::mem::take(&mut existing.password_hash);
        *existing = UserRecord { password_hash, ..user };
        Ok(())
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> GateResult<()> {
        let mut tables = self.write()?;
        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| GateError::not_found(format!("user {id}")))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete(&self, id: &str) -> GateResult<bool> {
        Ok(self.write()?.users.remove(id).is_some())
    }
}

#[async_trait::async_trait]
impl RoleStore for InMemoryAuthStore {
    async fn list(&self) -> GateResult<Vec<Role>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> GateResult<Option<Role>> {
        Ok(self.read()?.roles.get(id).cloned())
    }

    async fn save(&self, role: Role) -> GateResult<()> {
        let mut tables = self.write()?;
        if tables
            .roles
            .values()
            .any(|r| r.id != role.id && r.name.eq_ignore_ascii_case(&role.name))
        {
            return Err(GateError::validation(format!("role name {} already exists", role.name)));
        }
        tables.roles.insert(role.id.clone(), role);
        Ok(())
    }

    async fn delete(&self, id: &str) -> GateResult<bool> {
        Ok(self.write()?.roles.remove(id).is_some())
    }
}

#[async_trait::async_trait]
impl EndpointStore for InMemoryAuthStore {
    async fn list(&self) -> GateResult<Vec<RoleEndpoint>> {
        Ok(self.read()?.endpoints.values().cloned().collect())
    }

    async fn save(&self, endpoint: &RoleEndpoint) -> GateResult<()> {
        self.write()?
            .endpoints
            .insert(endpoint.id.clone(), endpoint.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> GateResult<bool> {
        Ok(self.write()?.endpoints.remove(id).is_some())
    }
}
