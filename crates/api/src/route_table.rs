//! Route registration that remembers what it registered.
//!
//! An axum `Router` cannot be enumerated after the fact, so host routes are
//! added through a `RouteTable`, which records a `RouteDescriptor` per route
//! and later hands that list to the registry bootstrap.

use axum::Router;
use axum::routing::MethodRouter;

use miniauth_infra::{RouteDescriptor, RouteSource};

#[derive(Default)]
pub struct RouteTable {
    router: Router,
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A route the gate manages. `api_style` routes get JSON denials,
    /// the others a redirect to the login page.
    pub fn route(mut self, path: &str, methods: &[&str], api_style: bool, handler: MethodRouter) -> Self {
        self.router = self.router.route(path, handler);
        self.routes.push(RouteDescriptor {
            id: path.to_string(),
            route: path.to_string(),
            methods: methods.iter().map(|m| m.to_ascii_uppercase()).collect(),
            api_style,
        });
        self
    }

    /// A route the gate never inspects.
    pub fn unmanaged(mut self, path: &str, handler: MethodRouter) -> Self {
        self.router = self.router.route(path, handler);
        self
    }

    pub fn into_parts(self) -> (Router, RecordedRoutes) {
        (self.router, RecordedRoutes(self.routes))
    }
}

/// The routes a `RouteTable` recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordedRoutes(Vec<RouteDescriptor>);

impl RouteSource for RecordedRoutes {
    fn routes(&self) -> Vec<RouteDescriptor> {
        self.0.clone()
    }
}
