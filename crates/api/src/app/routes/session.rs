//! Login and logout.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use miniauth_auth::{CredentialValidator, PrincipalLookup, TokenProvider, TokenRequest};

use crate::app::errors;
use crate::app::services::GateServices;
use crate::middleware::{TOKEN_HEADER, TOKEN_HEADER_NAME};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

/// Token cookie; persistent for `max_age_secs`, session-scoped otherwise.
pub fn token_cookie(token: &str, max_age_secs: Option<i64>) -> String {
    let mut cookie = format!("{TOKEN_HEADER}={token}; HttpOnly; Secure; SameSite=Strict; Path=/");
    if let Some(secs) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={secs}"));
    }
    cookie
}

/// `Max-Age` (seconds) of the "remember me" cookie, `None` on overflow.
pub fn remember_max_age(expiration_minutes: i64) -> Option<i64> {
    expiration_minutes.checked_mul(60).filter(|secs| *secs > 0)
}

pub fn clear_token_cookie() -> String {
    format!("{TOKEN_HEADER}=; Max-Age=0; HttpOnly; Secure; SameSite=Strict; Path=/")
}

/// POST <prefix>/login
pub async fn login(
    State(gate): State<Arc<GateServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match gate.credentials.validate(&req.username, &req.password).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(username = %req.username, "login failed");
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Err(err) => return errors::gate_error_to_response(&err, gate.config.production),
    }

    let principal = match gate.engine.principals().find(&req.username).await {
        Ok(Some(p)) => p,
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => return errors::gate_error_to_response(&err, gate.config.production),
    };

    let request = TokenRequest {
        subject: principal.username.clone(),
        roles: principal.roles().to_vec(),
        expiry_minutes: gate.config.expiration_minutes,
        profile: principal.profile.clone(),
    };
    let token = match gate.engine.tokens().issue(&request, Utc::now()).await {
        Ok(token) => token,
        Err(err) => return errors::gate_error_to_response(&err, gate.config.production),
    };

    let max_age = if req.remember {
        match remember_max_age(gate.config.expiration_minutes) {
            Some(secs) => Some(secs),
            None => {
                return errors::internal_error(
                    &"token lifetime does not fit a cookie Max-Age",
                    gate.config.production,
                );
            }
        }
    } else {
        None
    };
    let (Ok(token_header), Ok(cookie)) = (
        HeaderValue::from_str(&token),
        HeaderValue::from_str(&token_cookie(&token, max_age)),
    ) else {
        return errors::internal_error(&"issued token is not a valid header value", gate.config.production);
    };

    tracing::info!(username = %principal.username, remember = req.remember, "login succeeded");

    let mut res = Json(json!({ "X-MiniAuth-Token": token })).into_response();
    res.headers_mut().insert(TOKEN_HEADER_NAME, token_header);
    res.headers_mut().insert(header::SET_COOKIE, cookie);
    res
}

/// GET|POST <prefix>/logout
pub async fn logout(State(gate): State<Arc<GateServices>>) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::SET_COOKIE, clear_token_cookie()),
            (header::LOCATION, gate.prefix.login_page()),
        ],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_me_sets_max_age() {
        let session = token_cookie("abc", None);
        assert!(session.starts_with("X-MiniAuth-Token=abc;"));
        assert!(session.contains("HttpOnly"));
        assert!(!session.contains("Max-Age"));

        assert!(token_cookie("abc", Some(3600)).ends_with("; Max-Age=3600"));
        assert!(clear_token_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn remember_max_age_rejects_overflow() {
        assert_eq!(remember_max_age(60), Some(3600));
        assert_eq!(remember_max_age(i64::MAX), None);
        assert_eq!(remember_max_age(0), None);
    }
}
