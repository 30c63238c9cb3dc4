//! Admin operations behind the `<prefix>/api/*` routes.
//!
//! Bodies arrive as loose JSON: a missing `Id` key and a null `Id` are
//! reported differently, which a typed `Option` cannot express.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use miniauth_auth::{EndpointUpdate, Profile, Role, RoleEndpoint};
use miniauth_core::{GateError, GateResult, new_id, new_password};

use crate::credentials::hash_password;
use crate::registry::EndpointRegistry;
use crate::store::{EndpointStore, RoleStore, UserPage, UserRecord, UserStore};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Extract a non-null string `Id` from a request body.
pub fn required_id(body: &Value) -> GateResult<String> {
    match body.get("Id") {
        None => Err(GateError::missing_field("Without Id key")),
        Some(Value::Null) => Err(GateError::missing_field("Id is null")),
        Some(Value::String(id)) => Ok(id.clone()),
        Some(other) => Err(GateError::validation(format!("Id must be a string, got {other}"))),
    }
}

fn optional_id(body: &Value) -> GateResult<Option<String>> {
    match body.get("Id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Ok(None),
        Some(_) => required_id(body).map(Some),
    }
}

/// Role lists are stored comma-joined, so a role id may not contain a comma.
fn check_role_id(field: &str, id: &str) -> GateResult<()> {
    if id.contains(',') {
        return Err(GateError::validation(format!("{field} must not contain ','")));
    }
    Ok(())
}

fn check_role_list(roles: Option<&[String]>) -> GateResult<()> {
    roles
        .unwrap_or_default()
        .iter()
        .try_for_each(|r| check_role_id("Roles", r))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleInput {
    name: String,
    #[serde(default = "default_true")]
    enable: bool,
    #[serde(default)]
    r#type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserInput {
    username: String,
    #[serde(default = "default_true")]
    enable: bool,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default, rename = "First_name")]
    first_name: Option<String>,
    #[serde(default, rename = "Last_name")]
    last_name: Option<String>,
    #[serde(default)]
    mail: Option<String>,
    #[serde(default, rename = "Emp_no")]
    emp_no: Option<String>,
    #[serde(default)]
    r#type: Option<String>,
    #[serde(default)]
    new_password: Option<String>,
}

impl UserInput {
    fn profile(&self) -> Profile {
        Profile {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            mail: self.mail.clone(),
            emp_no: self.emp_no.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageQuery {
    #[serde(default)]
    page_index: u32,
    #[serde(default)]
    page_size: Option<u32>,
}

/// Thin pass-through over the stores, plus keeping the registry in step with
/// endpoint edits.
pub struct AdminService {
    registry: Arc<EndpointRegistry>,
    endpoints: Arc<dyn EndpointStore>,
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
}

impl AdminService {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        endpoints: Arc<dyn EndpointStore>,
        roles: Arc<dyn RoleStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            registry,
            endpoints,
            roles,
            users,
        }
    }

    pub fn list_endpoints(&self) -> Vec<Arc<RoleEndpoint>> {
        self.registry.all()
    }

    /// Update `Enable`, `Roles` and `RedirectToLoginPage` of a registered endpoint.
    ///
    /// The store is written before the registry, so a failed write leaves the
    /// live descriptor untouched.
    #[tracing::instrument(skip_all, err)]
    pub async fn save_endpoint(&self, body: Value) -> GateResult<Arc<RoleEndpoint>> {
        let id = required_id(&body)?;
        let update: EndpointUpdate = serde_json::from_value(body)?;
        check_role_list(update.roles.as_deref())?;

        let current = self
            .registry
            .get(&id)
            .ok_or_else(|| GateError::not_found(format!("endpoint {id}")))?;
        let next = current.apply(&update);

        self.endpoints.save(&next).await?;
        let published = self.registry.upsert(next);
        tracing::info!(endpoint = %id, enable = published.enable, "endpoint updated");
        Ok(published)
    }

    pub async fn list_roles(&self) -> GateResult<Vec<Role>> {
        self.roles.list().await
    }

    /// Insert when `Id` is absent or null, otherwise update.
    #[tracing::instrument(skip_all, err)]
    pub async fn save_role(&self, body: Value) -> GateResult<Role> {
        let id = optional_id(&body)?;
        let input: RoleInput = serde_json::from_value(body)?;
        if input.name.trim().is_empty() {
            return Err(GateError::validation("Name is required"));
        }
        if let Some(id) = &id {
            check_role_id("Id", id)?;
        }

        let role = Role {
            id: id.unwrap_or_else(new_id),
            name: input.name,
            enable: input.enable,
            r#type: input.r#type,
        };
        self.roles.save(role.clone()).await?;
        Ok(role)
    }

    #[tracing::instrument(skip_all, err)]
    pub async fn delete_role(&self, body: Value) -> GateResult<()> {
        let id = required_id(&body)?;
        if !self.roles.delete(&id).await? {
            tracing::debug!(role = %id, "delete of unknown role");
        }
        Ok(())
    }

    pub async fn list_users(&self, body: Value) -> GateResult<UserPage> {
        let query: PageQuery = if body.is_null() {
            PageQuery {
                page_index: 0,
                page_size: None,
            }
        } else {
            serde_json::from_value(body)?
        };
        let page_size = query.page_size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE);

        let (users, total_items) = self.users.list(query.page_index, page_size).await?;
        Ok(UserPage {
            users: users.iter().map(UserRecord::view).collect(),
            total_items,
        })
    }

    /// Create (returning the generated password) or update a user.
    #[tracing::instrument(skip_all, err)]
    pub async fn save_user(&self, body: Value) -> GateResult<Option<String>> {
        let id = optional_id(&body)?;
        let input: UserInput = serde_json::from_value(body)?;
        if input.username.trim().is_empty() {
            return Err(GateError::validation("Username is required"));
        }
        check_role_list(input.roles.as_deref())?;

        match id {
            None => {
                let password = new_password();
                let user = UserRecord {
                    roles: input.roles.clone(),
                    enable: input.enable,
                    profile: input.profile(),
                    r#type: input.r#type.clone(),
                    ..UserRecord::new(input.username.clone(), hash_password(&password)?)
                };
                let user_id = user.id.clone();
                self.users.insert(user).await?;
                tracing::info!(user = %user_id, "user created");
                Ok(Some(password))
            }
            Some(id) => {
                let existing = self
                    .users
                    .get(&id)
                    .await?
                    .ok_or_else(|| GateError::not_found(format!("user {id}")))?;
                let profile = input.profile();
                self.users
                    .update(UserRecord {
                        id: id.clone(),
                        username: input.username,
                        password_hash: existing.password_hash,
                        roles: input.roles,
                        enable: input.enable,
                        profile,
                        r#type: input.r#type.or(existing.r#type),
                    })
                    .await?;

                if let Some(password) = input.new_password.filter(|p| !p.is_empty()) {
                    self.users
                        .set_password_hash(&id, &hash_password(&password)?)
                        .await?;
                }
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip_all, err)]
    pub async fn delete_user(&self, body: Value) -> GateResult<()> {
        let id = required_id(&body)?;
        if !self.users.delete(&id).await? {
            tracing::debug!(user = %id, "delete of unknown user");
        }
        Ok(())
    }

    /// Replace a user's password with a freshly generated one and return it.
    #[tracing::instrument(skip_all, err)]
    pub async fn reset_password(&self, body: Value) -> GateResult<String> {
        let id = required_id(&body)?;
        let password = new_password();
        self.users
            .set_password_hash(&id, &hash_password(&password)?)
            .await?;
        tracing::info!(user = %id, "password reset");
        Ok(password)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::credentials::verify_password;
    use crate::store::InMemoryAuthStore;

    fn service() -> (AdminService, Arc<InMemoryAuthStore>, Arc<EndpointRegistry>) {
        let store = Arc::new(InMemoryAuthStore::new());
        let registry = Arc::new(EndpointRegistry::new());
        registry.upsert(RoleEndpoint::system("/orders", "/orders", vec!["GET".into()], false));
        let admin = AdminService::new(registry.clone(), store.clone(), store.clone(), store.clone());
        (admin, store, registry)
    }

    #[test]
    fn id_key_errors_are_distinguished() {
        assert_eq!(
            required_id(&json!({})),
            Err(GateError::missing_field("Without Id key"))
        );
        assert_eq!(
            required_id(&json!({ "Id": null })),
            Err(GateError::missing_field("Id is null"))
        );
        assert_eq!(required_id(&json!({ "Id": "x" })), Ok("x".to_string()));
        assert!(matches!(required_id(&json!({ "Id": 3 })), Err(GateError::Validation(_))));
    }

    #[tokio::test]
    async fn save_endpoint_updates_store_then_registry() {
        let (admin, store, registry) = service();
        let held = registry.get("/orders").unwrap();

        admin
            .save_endpoint(json!({
                "Id": "/orders",
                "Enable": false,
                "Roles": ["ops"],
                "RedirectToLoginPage": false
            }))
            .await
            .unwrap();

        let live = registry.get("/orders").unwrap();
        assert!(!live.enable);
        assert_eq!(live.required_roles(), &["ops".to_string()][..]);
        assert!(held.enable);
        assert_eq!(EndpointStore::list(&*store).await.unwrap(), vec![(*live).clone()]);
    }

    #[tokio::test]
    async fn save_endpoint_rejects_missing_or_unknown_ids() {
        let (admin, _, _) = service();
        let body = json!({ "Enable": true, "RedirectToLoginPage": true });
        assert!(matches!(
            admin.save_endpoint(body).await,
            Err(GateError::MissingRequiredField(_))
        ));

        let body = json!({ "Id": "/nope", "Enable": true, "RedirectToLoginPage": true });
        assert!(matches!(admin.save_endpoint(body).await, Err(GateError::NotFound(_))));
    }

    #[tokio::test]
    async fn save_role_inserts_on_null_id_and_updates_otherwise() {
        let (admin, _, _) = service();
        let created = admin
            .save_role(json!({ "Id": null, "Name": "ops", "Enable": true }))
            .await
            .unwrap();
        assert_eq!(created.id.len(), 32);

        admin
            .save_role(json!({ "Id": created.id, "Name": "operators", "Enable": false }))
            .await
            .unwrap();
        let roles = admin.list_roles().await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "operators");
        assert!(!roles[0].enable);

        assert_eq!(
            admin.delete_role(json!({})).await,
            Err(GateError::missing_field("Without Id key"))
        );
        admin.delete_role(json!({ "Id": created.id })).await.unwrap();
        assert!(admin.list_roles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commas_in_role_ids_are_rejected() {
        let (admin, store, registry) = service();

        let err = admin
            .save_role(json!({ "Id": "ops,admin", "Name": "ops" }))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(_)));
        assert!(admin.list_roles().await.unwrap().is_empty());

        let err = admin
            .save_endpoint(json!({
                "Id": "/orders",
                "Enable": true,
                "Roles": ["ops,admin"],
                "RedirectToLoginPage": false
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(_)));
        assert!(registry.get("/orders").unwrap().roles.is_none());

        let err = admin
            .save_user(json!({ "Username": "carol", "Roles": ["a,b"] }))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(_)));
        assert!(store.find_by_username("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_lifecycle() {
        let (admin, store, _) = service();

        let password = admin
            .save_user(json!({
                "Id": null,
                "Username": "alice",
                "Roles": ["ops"],
                "First_name": "Alice",
                "Mail": "alice@example.com"
            }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(password.len(), 10);

        let page = admin.list_users(json!({ "pageIndex": 0, "pageSize": 10 })).await.unwrap();
        assert_eq!(page.total_items, 1);
        let view = &page.users[0];
        assert_eq!(view.first_name.as_deref(), Some("Alice"));
        let id = view.id.clone();

        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        assert!(verify_password(&stored.password_hash, &password));

        admin
            .save_user(json!({
                "Id": id,
                "Username": "alice",
                "Enable": false,
                "NewPassword": "changed"
            }))
            .await
            .unwrap();
        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        assert!(!stored.enable);
        assert!(stored.roles.is_none());
        assert!(verify_password(&stored.password_hash, "changed"));

        let reset = admin.reset_password(json!({ "Id": id })).await.unwrap();
        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        assert!(verify_password(&stored.password_hash, &reset));

        admin.delete_user(json!({ "Id": id })).await.unwrap();
        assert!(store.find_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_view_serializes_admin_keys() {
        let (admin, _, _) = service();
        admin
            .save_user(json!({ "Username": "bob", "Emp_no": "7" }))
            .await
            .unwrap();
        let page = admin.list_users(Value::Null).await.unwrap();
        let json = serde_json::to_value(&page).unwrap();
        let user = &json["users"][0];
        assert_eq!(user["Username"], "bob");
        assert_eq!(user["Emp_no"], "7");
        assert!(user.get("First_name").is_some());
        assert_eq!(json["totalItems"], 1);
    }
}
