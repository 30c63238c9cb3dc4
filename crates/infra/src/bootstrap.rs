//! Registry bootstrap: discovered routes, admin surface, persisted overrides.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use miniauth_auth::{ADMIN_ROLE_ID, EndpointType, EndpointUpdate, RoleEndpoint};
use miniauth_core::GateResult;

use crate::config::ManagedPrefix;
use crate::registry::EndpointRegistry;
use crate::store::EndpointStore;

/// Admin JSON operations, relative to the managed prefix.
pub const ADMIN_API_PATHS: &[&str] = &[
    "api/getallendpoints",
    "api/getroles",
    "api/getusers",
    "api/saveuser",
    "api/deleteuser",
    "api/resetpassword",
    "api/saverole",
    "api/deleterole",
    "api/saveendpoint",
];

/// A route the host application exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Stable identity (the route pattern).
    pub id: String,
    pub route: String,
    pub methods: Vec<String>,
    /// JSON API route (denials answered with 401 JSON, not a redirect).
    pub api_style: bool,
}

impl RouteDescriptor {
    pub fn to_endpoint(&self) -> RoleEndpoint {
        RoleEndpoint::system(
            self.id.clone(),
            self.route.clone(),
            self.methods.clone(),
            self.api_style,
        )
    }
}

/// Enumerates the routes of the host application.
pub trait RouteSource: Send + Sync {
    fn routes(&self) -> Vec<RouteDescriptor>;
}

/// Fixed entries protecting the admin surface itself.
///
/// Login, logout and the login page are not listed, so they stay open.
pub fn admin_endpoints(prefix: &ManagedPrefix) -> Vec<RoleEndpoint> {
    let mut entries = vec![
        RoleEndpoint::system(
            prefix.path("index.html"),
            prefix.path("index.html"),
            vec!["GET".to_string()],
            false,
        )
        .with_roles([ADMIN_ROLE_ID]),
    ];

    entries.extend(ADMIN_API_PATHS.iter().map(|sub| {
        let path = prefix.path(sub);
        RoleEndpoint::system(path.clone(), path, vec!["GET".into(), "POST".into()], true)
            .with_roles([ADMIN_ROLE_ID])
    }));

    entries
}

/// Builds the registry and rebuilds it when it turns out empty.
///
/// When the endpoint store cannot be read, the registry is still loaded with
/// the discovered routes and the admin surface at their defaults (enabled),
/// so the gate fails closed; persisted overrides are retried on later requests.
pub struct RegistryBootstrap {
    registry: Arc<EndpointRegistry>,
    routes: Arc<dyn RouteSource>,
    store: Arc<dyn EndpointStore>,
    prefix: ManagedPrefix,
    lock: Mutex<()>,
    overrides_pending: AtomicBool,
}

impl RegistryBootstrap {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        routes: Arc<dyn RouteSource>,
        store: Arc<dyn EndpointStore>,
        prefix: ManagedPrefix,
    ) -> Self {
        Self {
            registry,
            routes,
            store,
            prefix,
            lock: Mutex::new(()),
            overrides_pending: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Load every entry into the registry; returns the entry count.
    #[tracing::instrument(skip(self), err)]
    pub async fn init(&self) -> GateResult<usize> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Whether the last load ran without the persisted overrides.
    pub fn overrides_pending(&self) -> bool {
        self.overrides_pending.load(Ordering::Acquire)
    }

    fn is_ready(&self) -> bool {
        !self.registry.is_empty() && !self.overrides_pending()
    }

    /// Called per request. Bootstraps when the registry is empty (or was
    /// loaded without persisted overrides) and never fails the request.
    pub async fn ensure_initialized(&self) {
        if self.is_ready() {
            return;
        }

        let _guard = self.lock.lock().await;
        // Another request may have finished bootstrap while we waited.
        if self.is_ready() {
            return;
        }

        if let Err(err) = self.load().await {
            tracing::error!(error = %err, "endpoint registry bootstrap failed");
        }
    }

    async fn load(&self) -> GateResult<usize> {
        let mut discovered: Vec<RoleEndpoint> =
            self.routes.routes().iter().map(RouteDescriptor::to_endpoint).collect();
        discovered.extend(admin_endpoints(&self.prefix));

        let mut persisted: HashMap<String, RoleEndpoint> = match self.store.list().await {
            Ok(stored) => stored.into_iter().map(|e| (e.id.clone(), e)).collect(),
            Err(err) => {
                tracing::error!(error = %err, "endpoint store unreadable; loading route defaults");
                let count = discovered.len();
                self.registry.replace_all(discovered);
                self.overrides_pending.store(true, Ordering::Release);
                return Ok(count);
            }
        };

        let mut entries = Vec::with_capacity(discovered.len() + persisted.len());
        let mut unsaved = Vec::new();

        for endpoint in discovered {
            match persisted.remove(&endpoint.id) {
                Some(stored) => entries.push(endpoint.apply(&EndpointUpdate {
                    enable: stored.enable,
                    roles: stored.roles,
                    redirect_to_login_page: stored.redirect_to_login_page,
                })),
                None => {
                    unsaved.push(endpoint.clone());
                    entries.push(endpoint);
                }
            }
        }

        // Whatever is left is either custom or a system route that no longer exists.
        for (id, stored) in persisted {
            if stored.r#type == EndpointType::Custom {
                entries.push(stored);
            } else {
                tracing::debug!(endpoint = %id, "skipping persisted entry for a route that is gone");
            }
        }

        for endpoint in &unsaved {
            if let Err(err) = self.store.save(endpoint).await {
                tracing::warn!(endpoint = %endpoint.id, error = %err, "failed to persist discovered endpoint");
            }
        }

        let count = entries.len();
        self.registry.replace_all(entries);
        self.overrides_pending.store(false, Ordering::Release);
        tracing::info!(endpoints = count, newly_persisted = unsaved.len(), "endpoint registry loaded");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use miniauth_core::GateError;

    use super::*;
    use crate::store::InMemoryAuthStore;

    struct StaticRoutes(Vec<RouteDescriptor>);

    impl RouteSource for StaticRoutes {
        fn routes(&self) -> Vec<RouteDescriptor> {
            self.0.clone()
        }
    }

    fn orders() -> RouteDescriptor {
        RouteDescriptor {
            id: "/orders/:id".into(),
            route: "/orders/:id".into(),
            methods: vec!["GET".into()],
            api_style: false,
        }
    }

    fn bootstrap(store: Arc<dyn EndpointStore>) -> RegistryBootstrap {
        RegistryBootstrap::new(
            Arc::new(EndpointRegistry::new()),
            Arc::new(StaticRoutes(vec![orders()])),
            store,
            ManagedPrefix::new("miniauth"),
        )
    }

    #[test]
    fn admin_surface_is_admin_only_and_json() {
        let entries = admin_endpoints(&ManagedPrefix::new("MiniAuth"));
        assert_eq!(entries.len(), ADMIN_API_PATHS.len() + 1);
        assert!(entries.iter().any(|e| e.id == "/miniauth/index.html"));
        assert!(entries.iter().any(|e| e.id == "/miniauth/api/saveendpoint"));
        for e in &entries {
            assert_eq!(e.required_roles(), &[ADMIN_ROLE_ID.to_string()][..]);
            assert_eq!(e.redirect_to_login_page, e.id.ends_with("index.html"));
            assert!(e.enable);
        }
    }

    #[tokio::test]
    async fn init_persists_discovered_routes() {
        let store = Arc::new(InMemoryAuthStore::new());
        let boot = bootstrap(store.clone());

        let count = boot.init().await.unwrap();
        assert_eq!(count, 1 + ADMIN_API_PATHS.len() + 1);

        let entry = boot.registry().get("/orders/:id").unwrap();
        assert!(entry.enable);
        assert!(entry.redirect_to_login_page);
        assert_eq!(EndpointStore::list(&*store).await.unwrap().len(), count);
    }

    #[tokio::test]
    async fn persisted_overrides_win_and_custom_entries_load() {
        let store = Arc::new(InMemoryAuthStore::new());
        let edited = orders().to_endpoint().with_enable(false).with_roles(["ops"]);
        EndpointStore::save(&*store, &edited).await.unwrap();

        let mut custom = RoleEndpoint::system("/legacy", "/legacy", vec![], true);
        custom.r#type = EndpointType::Custom;
        EndpointStore::save(&*store, &custom).await.unwrap();

        let mut stale = RoleEndpoint::system("/removed", "/removed", vec![], true);
        stale.r#type = EndpointType::System;
        EndpointStore::save(&*store, &stale).await.unwrap();

        let boot = bootstrap(store);
        boot.init().await.unwrap();

        let entry = boot.registry().get("/orders/:id").unwrap();
        assert!(!entry.enable);
        assert_eq!(entry.required_roles(), &["ops".to_string()][..]);
        assert!(boot.registry().get("/legacy").is_some());
        assert!(boot.registry().get("/removed").is_none());
    }

    struct FailingStore {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EndpointStore for FailingStore {
        async fn list(&self) -> GateResult<Vec<RoleEndpoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GateError::storage("down"))
        }
        async fn save(&self, _endpoint: &RoleEndpoint) -> GateResult<()> {
            Err(GateError::storage("down"))
        }
        async fn delete(&self, _id: &str) -> GateResult<bool> {
            Err(GateError::storage("down"))
        }
    }

    #[tokio::test]
    async fn unreadable_store_still_protects_every_route() {
        let store = Arc::new(FailingStore { calls: AtomicUsize::new(0) });
        let boot = bootstrap(store.clone());

        boot.ensure_initialized().await;
        assert!(boot.overrides_pending());
        assert_eq!(boot.registry().len(), 1 + ADMIN_API_PATHS.len() + 1);

        let orders = boot.registry().get("/orders/:id").unwrap();
        assert!(orders.enable);
        let users = boot.registry().get("/miniauth/api/getusers").unwrap();
        assert!(users.enable);
        assert_eq!(users.required_roles(), &[ADMIN_ROLE_ID.to_string()][..]);

        // Overrides are retried while the store stays down.
        boot.ensure_initialized().await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn overrides_apply_once_the_store_recovers() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryAuthStore::new(),
            down: AtomicBool::new(true),
        });
        let edited = orders().to_endpoint().with_enable(false);
        EndpointStore::save(&store.inner, &edited).await.unwrap();

        let boot = bootstrap(store.clone());
        boot.ensure_initialized().await;
        assert!(boot.registry().get("/orders/:id").unwrap().enable);

        store.down.store(false, Ordering::SeqCst);
        boot.ensure_initialized().await;
        assert!(!boot.overrides_pending());
        assert!(!boot.registry().get("/orders/:id").unwrap().enable);
    }

    struct FlakyStore {
        inner: InMemoryAuthStore,
        down: AtomicBool,
    }

    #[async_trait::async_trait]
    impl EndpointStore for FlakyStore {
        async fn list(&self) -> GateResult<Vec<RoleEndpoint>> {
            if self.down.load(Ordering::SeqCst) {
                return Err(GateError::storage("down"));
            }
            EndpointStore::list(&self.inner).await
        }
        async fn save(&self, endpoint: &RoleEndpoint) -> GateResult<()> {
            EndpointStore::save(&self.inner, endpoint).await
        }
        async fn delete(&self, id: &str) -> GateResult<bool> {
            EndpointStore::delete(&self.inner, id).await
        }
    }

    #[tokio::test]
    async fn concurrent_cold_requests_bootstrap_once() {
        let store = Arc::new(InMemoryAuthStore::new());
        let boot = Arc::new(bootstrap(store.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let boot = boot.clone();
                tokio::spawn(async move { boot.ensure_initialized().await })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(boot.registry().len(), 1 + ADMIN_API_PATHS.len() + 1);
        boot.ensure_initialized().await;
        assert_eq!(boot.registry().len(), 1 + ADMIN_API_PATHS.len() + 1);
    }
}
