//! Response envelope and error-to-response mapping.
//!
//! Every JSON body the gate itself produces has the shape
//! `{code, message, data, ok}` with `ok == (code == 200)`.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use serde::Serialize;
use serde_json::{Value, json};

use miniauth_core::GateError;

/// Serialize `body` with an explicit `Content-Length`.
pub fn json_response(status: StatusCode, body: &Value) -> Response {
    let bytes = body.to_string().into_bytes();
    let len = bytes.len();

    let mut res = Response::new(Body::from(bytes));
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    res
}

pub fn envelope<T: Serialize>(code: StatusCode, message: impl Into<String>, data: T) -> Value {
    json!({
        "code": code.as_u16(),
        "message": message.into(),
        "data": data,
        "ok": code == StatusCode::OK,
    })
}

pub fn ok<T: Serialize>(data: T) -> Response {
    json_response(StatusCode::OK, &envelope(StatusCode::OK, "", data))
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    json_response(status, &envelope(status, message, Value::Null))
}

/// Map a `GateError` to its envelope. Server-side faults are logged, and
/// outside production the body carries the debug representation.
pub fn gate_error_to_response(err: &GateError, production: bool) -> Response {
    let status = match err {
        GateError::MissingRequiredField(_) | GateError::Validation(_) => StatusCode::BAD_REQUEST,
        GateError::NotFound(_) => StatusCode::NOT_FOUND,
        GateError::Storage(_) | GateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return internal_error(err, production);
    }
    json_error(status, err.to_string())
}

/// 500 envelope for anything unexpected at the request boundary.
pub fn internal_error<E>(err: &E, production: bool) -> Response
where
    E: std::fmt::Display + std::fmt::Debug,
{
    tracing::error!(error = %err, "request failed");

    let message = if production {
        err.to_string()
    } else {
        format!("{err} ({err:?})")
    };
    json_error(StatusCode::INTERNAL_SERVER_ERROR, message)
}
