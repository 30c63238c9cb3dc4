//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, token provider, registry and engine wiring
//! - `routes/`: session, admin and host routes
//! - `errors.rs`: response envelope and error mapping

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;

use miniauth_infra::GateConfig;

use crate::middleware;
use crate::route_table::RouteTable;

pub mod errors;
pub mod routes;
pub mod services;

use services::{AuthStores, GateServices};

/// Build the full router: the host routes, the session and admin surface,
/// all behind the gate.
pub async fn build_app(config: GateConfig, host: RouteTable) -> anyhow::Result<Router> {
    let stores = AuthStores::from_config(&config).await?;
    build_app_with_stores(config, stores, host).await
}

pub async fn build_app_with_stores(
    config: GateConfig,
    stores: AuthStores,
    host: RouteTable,
) -> anyhow::Result<Router> {
    let (host_router, recorded) = host.into_parts();
    let services = Arc::new(services::build_services(config, stores, Arc::new(recorded)).await?);

    Ok(router(services, host_router))
}

fn router(services: Arc<GateServices>, host: Router) -> Router {
    let gate_surface = routes::router(&services.prefix).with_state(services.clone());

    // `Router::layer` runs after routing, so the gate sees `MatchedPath`.
    Router::new()
        .merge(host)
        .merge(gate_surface)
        .layer(
            ServiceBuilder::new().layer(axum::middleware::from_fn_with_state(
                services,
                middleware::gate_middleware,
            )),
        )
}
