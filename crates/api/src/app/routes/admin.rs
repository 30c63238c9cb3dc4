//! Admin JSON API: endpoints, roles and users.
//!
//! Every handler accepts GET and POST with an optional JSON body; each path
//! is protected by its own registry entry (admin role only).

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    response::Response,
    routing::{MethodRouter, get},
};
use serde::Serialize;
use serde_json::{Value, json};

use miniauth_auth::RoleEndpoint;
use miniauth_core::GateResult;

use crate::app::errors;
use crate::app::services::GateServices;

/// Handlers keyed by their path relative to the managed prefix.
pub fn routes() -> Vec<(&'static str, MethodRouter<Arc<GateServices>>)> {
    vec![
        ("api/getAllEndpoints", get(get_all_endpoints).post(get_all_endpoints)),
        ("api/saveEndpoint", get(save_endpoint).post(save_endpoint)),
        ("api/getRoles", get(get_roles).post(get_roles)),
        ("api/saveRole", get(save_role).post(save_role)),
        ("api/deleteRole", get(delete_role).post(delete_role)),
        ("api/getUsers", get(get_users).post(get_users)),
        ("api/saveUser", get(save_user).post(save_user)),
        ("api/deleteUser", get(delete_user).post(delete_user)),
        ("api/resetPassword", get(reset_password).post(reset_password)),
    ]
}

/// An absent body reads as JSON `null`.
fn parse_body(body: &Bytes) -> GateResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}

fn respond<T: Serialize>(gate: &GateServices, result: GateResult<T>) -> Response {
    match result {
        Ok(data) => errors::ok(data),
        Err(err) => errors::gate_error_to_response(&err, gate.config.production),
    }
}

pub async fn get_all_endpoints(State(gate): State<Arc<GateServices>>) -> Response {
    let endpoints: Vec<RoleEndpoint> = gate
        .admin
        .list_endpoints()
        .iter()
        .map(|e| RoleEndpoint::clone(e))
        .collect();
    errors::ok(endpoints)
}

pub async fn save_endpoint(State(gate): State<Arc<GateServices>>, body: Bytes) -> Response {
    let result = match parse_body(&body) {
        Ok(body) => gate
            .admin
            .save_endpoint(body)
            .await
            .map(|e| RoleEndpoint::clone(&e)),
        Err(err) => Err(err),
    };
    respond(&gate, result)
}

pub async fn get_roles(State(gate): State<Arc<GateServices>>) -> Response {
    let result = gate.admin.list_roles().await;
    respond(&gate, result)
}

pub async fn save_role(State(gate): State<Arc<GateServices>>, body: Bytes) -> Response {
    let result = match parse_body(&body) {
        Ok(body) => gate.admin.save_role(body).await,
        Err(err) => Err(err),
    };
    respond(&gate, result)
}

pub async fn delete_role(State(gate): State<Arc<GateServices>>, body: Bytes) -> Response {
    let result = match parse_body(&body) {
        Ok(body) => gate.admin.delete_role(body).await,
        Err(err) => Err(err),
    };
    respond(&gate, result)
}

pub async fn get_users(State(gate): State<Arc<GateServices>>, body: Bytes) -> Response {
    let result = match parse_body(&body) {
        Ok(body) => gate.admin.list_users(body).await,
        Err(err) => Err(err),
    };
    respond(&gate, result)
}

pub async fn save_user(State(gate): State<Arc<GateServices>>, body: Bytes) -> Response {
    let result = match parse_body(&body) {
        Ok(body) => gate
            .admin
            .save_user(body)
            .await
            .map(|created| created.map(|pw| json!({ "newPassword": pw }))),
        Err(err) => Err(err),
    };
    respond(&gate, result)
}

pub async fn delete_user(State(gate): State<Arc<GateServices>>, body: Bytes) -> Response {
    let result = match parse_body(&body) {
        Ok(body) => gate.admin.delete_user(body).await,
        Err(err) => Err(err),
    };
    respond(&gate, result)
}

pub async fn reset_password(State(gate): State<Arc<GateServices>>, body: Bytes) -> Response {
    let result = match parse_body(&body) {
        Ok(body) => gate
            .admin
            .reset_password(body)
            .await
            .map(|pw| json!({ "newPassword": pw })),
        Err(err) => Err(err),
    };
    respond(&gate, result)
}
