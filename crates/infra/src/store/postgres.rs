//! Postgres-backed auth store.
//!
//! List-valued columns (`roles`, `methods`) are stored comma-joined, which
//! keeps the schema readable from psql and matches the admin wire format.

use std::sync::Arc;

use sqlx::{PgPool, Row, postgres::PgRow};

use miniauth_auth::{EndpointType, Profile, Role, RoleEndpoint};
use miniauth_core::{GateError, GateResult};

use super::{EndpointStore, RoleStore, UserRecord, UserStore, join_list, split_list};

const SCHEMA: &str = include_str!("../../migrations/0001_miniauth.sql");

pub struct PostgresAuthStore {
    pool: Arc<PgPool>,
}

impl PostgresAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> GateResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables if they do not exist yet.
    #[tracing::instrument(skip(self), err)]
    pub async fn migrate(&self) -> GateResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> GateError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // unique violation
                Some("23505") => GateError::validation(msg),
                _ => GateError::storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            GateError::storage(format!("connection pool closed in {}", operation))
        }
        _ => GateError::storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        roles: split_list(row.try_get("roles")?),
        enable: row.try_get("enable")?,
        profile: Profile {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            mail: row.try_get("mail")?,
            emp_no: row.try_get("emp_no")?,
        },
        r#type: row.try_get("type")?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        enable: row.try_get("enable")?,
        r#type: row.try_get("type")?,
    })
}

fn endpoint_from_row(row: &PgRow) -> Result<RoleEndpoint, sqlx::Error> {
    let ty: String = row.try_get("type")?;
    Ok(RoleEndpoint {
        id: row.try_get("id")?,
        r#type: EndpointType::parse(&ty),
        name: row.try_get("name")?,
        route: row.try_get("route")?,
        methods: split_list(row.try_get("methods")?).unwrap_or_default(),
        enable: row.try_get("enable")?,
        roles: split_list(row.try_get("roles")?),
        redirect_to_login_page: row.try_get("redirect_to_login_page")?,
    })
}

const USER_COLUMNS: &str =
    "id, username, password_hash, roles, enable, first_name, last_name, mail, emp_no, type";

#[async_trait::async_trait]
impl UserStore for PostgresAuthStore {
    async fn find_by_username(&self, username: &str) -> GateResult<Option<UserRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM miniauth_users WHERE lower(username) = lower($1)"
        ))
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_username", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_by_username", e))
    }

    async fn get(&self, id: &str) -> GateResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM miniauth_users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_user", e))
    }

    async fn list(&self, page_index: u32, page_size: u32) -> GateResult<(Vec<UserRecord>, u64)> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM miniauth_users")
            .fetch_one(&*self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(|e| map_sqlx_error("count_users", e))?;

        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM miniauth_users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page_size))
        .bind(i64::from(page_index) * i64::from(page_size))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_users", e))?;

        Ok((users, total.max(0) as u64))
    }

    async fn insert(&self, user: UserRecord) -> GateResult<()> {
        sqlx::query(&format!(
            "INSERT INTO miniauth_users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(join_list(user.roles.as_deref()))
        .bind(user.enable)
        .bind(&user.profile.first_name)
        .bind(&user.profile.last_name)
        .bind(&user.profile.mail)
        .bind(&user.profile.emp_no)
        .bind(&user.r#type)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn update(&self, user: UserRecord) -> GateResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE miniauth_users
            SET username = $2, roles = $3, enable = $4, first_name = $5,
                last_name = $6, mail = $7, emp_no = $8, type = $9
            WHERE id = $1
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(join_list(user.roles.as_deref()))
        .bind(user.enable)
        .bind(&user.profile.first_name)
        .bind(&user.profile.last_name)
        .bind(&user.profile.mail)
        .bind(&user.profile.emp_no)
        .bind(&user.r#type)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if result.rows_affected() == 0 {
            return Err(GateError::not_found(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> GateResult<()> {
        let result = sqlx::query("UPDATE miniauth_users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_password_hash", e))?;

        if result.rows_affected() == 0 {
            return Err(GateError::not_found(format!("user {id}")));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> GateResult<bool> {
        let result = sqlx::query("DELETE FROM miniauth_users WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl RoleStore for PostgresAuthStore {
    async fn list(&self) -> GateResult<Vec<Role>> {
        let rows = sqlx::query("SELECT id, name, enable, type FROM miniauth_roles ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;

        rows.iter()
            .map(role_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_roles", e))
    }

    async fn get(&self, id: &str) -> GateResult<Option<Role>> {
        let row = sqlx::query("SELECT id, name, enable, type FROM miniauth_roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_role", e))?;

        row.as_ref()
            .map(role_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_role", e))
    }

    async fn save(&self, role: Role) -> GateResult<()> {
        sqlx::query(
            r#"
            INSERT INTO miniauth_roles (id, name, enable, type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, enable = EXCLUDED.enable, type = EXCLUDED.type
            "#,
        )
        .bind(&role.id)
        .bind(&role.name)
        .bind(role.enable)
        .bind(&role.r#type)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_role", e))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> GateResult<bool> {
        let result = sqlx::query("DELETE FROM miniauth_roles WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl EndpointStore for PostgresAuthStore {
    async fn list(&self) -> GateResult<Vec<RoleEndpoint>> {
        let rows = sqlx::query(
            r#"
            SELECT id, type, name, route, methods, enable, redirect_to_login_page, roles
            FROM miniauth_endpoints
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_endpoints", e))?;

        rows.iter()
            .map(endpoint_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_endpoints", e))
    }

    async fn save(&self, endpoint: &RoleEndpoint) -> GateResult<()> {
        sqlx::query(
            r#"
            INSERT INTO miniauth_endpoints
                (id, type, name, route, methods, enable, redirect_to_login_page, roles)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET type = EXCLUDED.type,
                name = EXCLUDED.name,
                route = EXCLUDED.route,
                methods = EXCLUDED.methods,
                enable = EXCLUDED.enable,
                redirect_to_login_page = EXCLUDED.redirect_to_login_page,
                roles = EXCLUDED.roles
            "#,
        )
        .bind(&endpoint.id)
        .bind(endpoint.r#type.as_str())
        .bind(&endpoint.name)
        .bind(&endpoint.route)
        .bind(join_list(Some(endpoint.methods.as_slice())))
        .bind(endpoint.enable)
        .bind(endpoint.redirect_to_login_page)
        .bind(join_list(endpoint.roles.as_deref()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_endpoint", e))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> GateResult<bool> {
        let result = sqlx::query("DELETE FROM miniauth_endpoints WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_endpoint", e))?;
        Ok(result.rows_affected() > 0)
    }
}
