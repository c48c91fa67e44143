//! Request admission: the administrative switch, the per-client rate limit,
//! and the session check for protected routes.
//!
//! Order matters. A disabled service answers 503 before anything is counted,
//! and a rate-limited client is rejected before its session is touched, so a
//! rejected request never refreshes `last_activity`.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::commands::AppState;
use crate::config::SESSION_COOKIE;
use crate::core::session::SessionCheck;
use crate::error::AppError;

/// Rate-limit key for a request: the peer IP, or `unknown` when the
/// listener did not record one.
pub fn client_id(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn admit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.is_enabled() {
        return Err(AppError::Disabled);
    }
    let client = client_id(&request);
    if !state.rate_limiter.allow(&client) {
        tracing::warn!("Rate limit exceeded for {client}");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}

pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(request.headers());
    match state.sessions.check(token.as_deref()) {
        SessionCheck::Valid => Ok(next.run(request).await),
        SessionCheck::Expired => Err(AppError::SessionExpired),
        SessionCheck::Unauthenticated => Err(AppError::Unauthenticated),
    }
}

/// Pull the session token out of the `Cookie` headers, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
