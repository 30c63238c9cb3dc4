//! Service wiring: stores, token provider, registry, decision engine.

use std::sync::Arc;

use anyhow::Context;

use miniauth_auth::{CredentialValidator, DecisionEngine, JwtTokenProvider};
use miniauth_infra::{
    AdminService, Argon2Credentials, EndpointRegistry, EndpointStore, GateConfig, InMemoryAuthStore,
    ManagedPrefix, RegistryBootstrap, RoleStore, RouteSource, StorePrincipalLookup, UserStore,
    seed_defaults,
};

/// The three stores, possibly backed by one object.
#[derive(Clone)]
pub struct AuthStores {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub endpoints: Arc<dyn EndpointStore>,
}

impl AuthStores {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryAuthStore::new());
        Self {
            users: store.clone(),
            roles: store.clone(),
            endpoints: store,
        }
    }

    #[cfg(feature = "postgres")]
    pub async fn postgres(database_url: &str) -> anyhow::Result<Self> {
        let store = miniauth_infra::PostgresAuthStore::connect(database_url)
            .await
            .context("failed to connect to postgres")?;
        store.migrate().await.context("failed to apply schema")?;

        let store = Arc::new(store);
        Ok(Self {
            users: store.clone(),
            roles: store.clone(),
            endpoints: store,
        })
    }

    /// Postgres when a database URL is configured (and compiled in),
    /// in-memory otherwise.
    pub async fn from_config(config: &GateConfig) -> anyhow::Result<Self> {
        match config.database_url.as_deref() {
            #[cfg(feature = "postgres")]
            Some(url) => {
                tracing::info!("using postgres auth store");
                Self::postgres(url).await
            }
            #[cfg(not(feature = "postgres"))]
            Some(_) => {
                tracing::warn!("database url set but built without the `postgres` feature; using in-memory store");
                Ok(Self::in_memory())
            }
            None => {
                tracing::info!("using in-memory auth store");
                Ok(Self::in_memory())
            }
        }
    }
}

/// Everything the gate and its routes need, shared behind one `Arc`.
pub struct GateServices {
    pub config: GateConfig,
    pub prefix: ManagedPrefix,
    pub registry: Arc<EndpointRegistry>,
    pub bootstrap: RegistryBootstrap,
    pub engine: DecisionEngine,
    pub credentials: Arc<dyn CredentialValidator>,
    pub admin: AdminService,
}

pub async fn build_services(
    config: GateConfig,
    stores: AuthStores,
    routes: Arc<dyn RouteSource>,
) -> anyhow::Result<GateServices> {
    let tokens = JwtTokenProvider::new(config.jwt.clone()).context("invalid token configuration")?;

    seed_defaults(&*stores.users, &*stores.roles)
        .await
        .context("failed to seed default role and user")?;

    let prefix = config.prefix();
    let registry = Arc::new(EndpointRegistry::new());
    let bootstrap = RegistryBootstrap::new(
        registry.clone(),
        routes,
        stores.endpoints.clone(),
        prefix.clone(),
    );
    // A failure here is retried by the gate on the first request.
    if let Err(err) = bootstrap.init().await {
        tracing::warn!(error = %err, "initial endpoint registry load failed");
    }

    let engine = DecisionEngine::new(
        Arc::new(tokens),
        Arc::new(StorePrincipalLookup::new(stores.users.clone())),
    );
    let admin = AdminService::new(
        registry.clone(),
        stores.endpoints,
        stores.roles,
        stores.users.clone(),
    );

    tracing::info!(
        admin = %prefix.path("index.html"),
        login = %prefix.login_page(),
        "gate ready"
    );

    Ok(GateServices {
        credentials: Arc::new(Argon2Credentials::new(stores.users)),
        config,
        prefix,
        registry,
        bootstrap,
        engine,
        admin,
    })
}
