//! HTTP handlers.
//!
//! Dispatcher calls block on host commands and settle delays, so every one of
//! them runs on the blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::PathRejection;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse};
use axum::{Form, Json};
use serde::Deserialize;

use crate::commands::actions::Action;
use crate::commands::{ActionResponse, AppState, StatusReport};
use crate::error::AppError;
use crate::server::gate;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    if !state.credentials.matches(&form.username, &form.password) {
        tracing::warn!("Failed login attempt for {:?}", form.username);
        return Err(AppError::InvalidCredentials);
    }
    let token = state.sessions.login();
    tracing::info!("User {} logged in", form.username);
    Ok((
        AppendHeaders([(header::SET_COOKIE, gate::session_cookie(&token))]),
        Json(ActionResponse::new(true, "Logged in")),
    ))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = gate::session_token(&headers) {
        state.sessions.logout(&token);
    }
    (
        AppendHeaders([(header::SET_COOKIE, gate::cleared_cookie())]),
        Json(ActionResponse::new(true, "Logged out")),
    )
}

pub async fn status_all(State(state): State<AppState>) -> Result<Json<StatusReport>, AppError> {
    let dispatcher = Arc::clone(&state.dispatcher);
    let report = tokio::task::spawn_blocking(move || dispatcher.status_all()).await?;
    Ok(Json(report))
}

pub async fn action(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let dispatcher = Arc::clone(&state.dispatcher);
    let response = tokio::task::spawn_blocking(move || dispatcher.dispatch(&name)).await?;
    Ok(Json(response))
}

pub async fn toggle_app(
    State(state): State<AppState>,
    Path(app): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let dispatcher = Arc::clone(&state.dispatcher);
    let response =
        tokio::task::spawn_blocking(move || dispatcher.execute(&Action::AppToggle(app))).await?;
    Ok(Json(response))
}

pub async fn set_volume(
    State(state): State<AppState>,
    value: Result<Path<u32>, PathRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let Path(value) = value.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let dispatcher = Arc::clone(&state.dispatcher);
    let response =
        tokio::task::spawn_blocking(move || dispatcher.execute(&Action::SetVolume(value))).await?;
    Ok(Json(response))
}

/// `POST /admin/enabled/{on|off}`, loopback peers only.
pub async fn set_enabled(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(flag): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !peer.ip().is_loopback() {
        tracing::warn!("Rejected admin request from {peer}");
        return Err(AppError::Forbidden);
    }
    let enabled = match flag.as_str() {
        "on" => true,
        "off" => false,
        other => {
            return Err(AppError::InvalidInput(format!(
                "expected 'on' or 'off', got {other:?}"
            )))
        }
    };
    let was = state.set_enabled(enabled);
    if was != enabled {
        tracing::info!("Remote control {}", if enabled { "enabled" } else { "disabled" });
    }
    Ok(Json(serde_json::json!({ "success": true, "enabled": enabled })))
}
