use std::sync::Arc;

use axum::Router;
use axum::routing::{MethodRouter, get};

use miniauth_infra::ManagedPrefix;

use crate::app::services::GateServices;

pub mod admin;
pub mod orders;
pub mod session;
pub mod system;

/// Session and admin routes under the managed prefix.
///
/// Admin paths are registered both as written and lower-cased, since the gate
/// resolves them case-insensitively.
pub fn router(prefix: &ManagedPrefix) -> Router<Arc<GateServices>> {
    let mut router = Router::new()
        .route(&prefix.path("login"), axum::routing::post(session::login))
        .route(&prefix.path("logout"), get(session::logout).post(session::logout));

    for (sub, handler) in admin::routes() {
        router = route_case_insensitive(router, &prefix.path(sub), handler);
    }
    router
}

fn route_case_insensitive(
    router: Router<Arc<GateServices>>,
    path: &str,
    handler: MethodRouter<Arc<GateServices>>,
) -> Router<Arc<GateServices>> {
    let lower = path.to_ascii_lowercase();
    if lower == path {
        router.route(path, handler)
    } else {
        router.route(path, handler.clone()).route(&lower, handler)
    }
}
