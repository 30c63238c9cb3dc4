//! HTTP surface of the gate: middleware, session and admin routes, wiring.

pub mod app;
pub mod middleware;
pub mod route_table;

pub use app::build_app;
pub use route_table::RouteTable;
