//! One structured log event per API request.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::jwt::validate_token;
use crate::state::AppState;

/// First `X-Forwarded-For` hop, else the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

pub fn outcome(status: u16) -> &'static str {
    if status < 400 {
        "success"
    } else {
        "error"
    }
}

/// Logs `user_id`, `action`, `outcome`, `status_code` and `ip` once the
/// response is ready. The user is read from the bearer token only; no
/// database lookup happens here.
pub async fn log_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let action = format!("{} {}", request.method(), request.uri().path());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_ip(request.headers(), peer);
    let user_id = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| validate_token(token, &state.config.jwt).ok())
        .map(|claims| claims.sub);

    let response = next.run(request).await;
    let status_code = response.status().as_u16();

    tracing::info!(
        target: "intake_api::request_log",
        user_id,
        action = %action,
        outcome = outcome(status_code),
        status_code,
        ip = ip.as_deref(),
        "API request"
    );
    response
}
