//! Infrastructure layer: endpoint registry, storage, credentials, config.

pub mod admin;
pub mod bootstrap;
pub mod classifier;
pub mod config;
pub mod credentials;
pub mod principals;
pub mod registry;
pub mod store;

pub use admin::{AdminService, required_id};
pub use bootstrap::{ADMIN_API_PATHS, RegistryBootstrap, RouteDescriptor, RouteSource, admin_endpoints};
pub use classifier::classify;
pub use config::{GateConfig, ManagedPrefix};
pub use credentials::{Argon2Credentials, hash_password, verify_password};
pub use principals::StorePrincipalLookup;
pub use registry::EndpointRegistry;
#[cfg(feature = "postgres")]
pub use store::PostgresAuthStore;
pub use store::{
    EndpointStore, InMemoryAuthStore, RoleStore, UserPage, UserRecord, UserStore, UserView,
    seed_defaults,
};
