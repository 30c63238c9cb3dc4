//! Sample host application protected by the gate in the bundled binary.
//!
//! A real deployment passes its own `RouteTable`; these routes exist so the
//! binary has something to guard and so the black-box tests have a host.

use axum::{
    Json,
    extract::Path,
    response::{Html, IntoResponse},
    routing::get,
};
use serde_json::json;

use crate::route_table::RouteTable;

use super::system;

pub fn table() -> RouteTable {
    RouteTable::new()
        .route("/api/orders", &["GET"], true, get(list_orders))
        .route("/api/orders/:id", &["GET"], true, get(get_order))
        .route("/orders", &["GET"], false, get(orders_page))
        .unmanaged("/health", get(system::health))
}

pub async fn list_orders() -> impl IntoResponse {
    Json(json!([
        { "id": "1", "item": "widget", "quantity": 3 },
        { "id": "2", "item": "gadget", "quantity": 1 },
    ]))
}

pub async fn get_order(Path(id): Path<String>) -> impl IntoResponse {
    Json(json!({ "id": id, "item": "widget", "quantity": 3 }))
}

pub async fn orders_page() -> Html<&'static str> {
    Html("<!doctype html><title>Orders</title><h1>Orders</h1>")
}
