//! The gate: classify, decide, then forward or deny.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{HeaderMap, HeaderName, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use miniauth_auth::{Classification, Decision};
use miniauth_infra::{ManagedPrefix, classify};

use crate::app::errors;
use crate::app::services::GateServices;

/// Header (and cookie) carrying the bearer token.
pub const TOKEN_HEADER: &str = "X-MiniAuth-Token";
pub const TOKEN_HEADER_NAME: HeaderName = HeaderName::from_static("x-miniauth-token");

pub async fn gate_middleware(
    State(gate): State<Arc<GateServices>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    gate.bootstrap.ensure_initialized().await;

    let path = req.uri().path().to_string();
    let matched = req.extensions().get::<MatchedPath>().map(|m| m.as_str().to_string());
    let classification = classify(&gate.registry, &gate.prefix, &path, matched.as_deref());

    let token = extract_token(req.headers());
    let decision = match gate
        .engine
        .decide(&classification, token.as_deref(), Utc::now())
        .await
    {
        Ok(decision) => decision,
        Err(err) => return errors::internal_error(&err, gate.config.production),
    };

    match decision {
        Decision::Allow | Decision::PassThrough => next.run(req).await,
        denied => {
            tracing::info!(
                path = %path,
                endpoint = classification.endpoint().map(|e| e.id.as_str()),
                reason = denied.reason(),
                "request denied"
            );
            dispatch_denial(&classification, &denied, &path, &gate.prefix)
        }
    }
}

/// Token from the `X-MiniAuth-Token` header, else from the cookie of the same name.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(&TOKEN_HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match from_header {
        Some(token) => Some(token.to_string()),
        None => parse_cookie(headers, TOKEN_HEADER).filter(|t| !t.is_empty()),
    }
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(header::COOKIE) {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

/// Turn a denial into a response: a login redirect for page endpoints,
/// otherwise a 401 JSON body.
pub fn dispatch_denial(
    classification: &Classification,
    decision: &Decision,
    path: &str,
    prefix: &ManagedPrefix,
) -> Response {
    let redirect = classification
        .endpoint()
        .is_some_and(|e| e.redirect_to_login_page);

    if redirect {
        let location = format!("{}?returnUrl={}", prefix.login_page(), urlencoding::encode(path));
        return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    }

    let message = decision.reason().unwrap_or(miniauth_auth::UNAUTHORIZED);
    errors::json_response(
        StatusCode::UNAUTHORIZED,
        &json!({
            "code": StatusCode::UNAUTHORIZED.as_u16(),
            "message": message,
            "ok": false,
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use miniauth_auth::RoleEndpoint;

    use super::*;

    #[test]
    fn header_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; X-MiniAuth-Token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(TOKEN_HEADER_NAME, HeaderValue::from_static("from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn page_denials_redirect_with_return_url() {
        let ep = RoleEndpoint::system("/orders/:id", "/orders/:id", vec![], false);
        let res = dispatch_denial(
            &Classification::Endpoint(Arc::new(ep)),
            &Decision::unauthenticated("Token is expired"),
            "/orders/7",
            &ManagedPrefix::new("miniauth"),
        );

        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(
            res.headers()[header::LOCATION],
            "/miniauth/login.html?returnUrl=%2Forders%2F7"
        );
    }

    #[test]
    fn api_denials_are_json_401() {
        let ep = RoleEndpoint::system("/api/orders", "/api/orders", vec![], true);
        let res = dispatch_denial(
            &Classification::Endpoint(Arc::new(ep)),
            &Decision::forbidden("Unauthorized"),
            "/api/orders",
            &ManagedPrefix::new("miniauth"),
        );

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().contains_key(header::CONTENT_LENGTH));
    }
}
