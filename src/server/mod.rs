//! HTTP surface: router assembly and the serve loop.

pub mod gate;
pub mod routes;

use std::net::SocketAddr;

use anyhow::Context;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::commands::AppState;

/// Build the application router.
///
/// Everything except the admin switch passes the admission gate (disabled,
/// then rate limit); the `/api` routes additionally require a session.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/status/all", get(routes::status_all))
        .route("/api/action/{name}", post(routes::action))
        .route("/api/app/{app}/toggle", post(routes::toggle_app))
        .route("/api/volume/{value}", post(routes::set_volume))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_session,
        ));

    let admitted = Router::new()
        .route("/login", post(routes::login))
        .route("/logout", get(routes::logout).post(routes::logout))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), gate::admit));

    Router::new()
        .route("/admin/enabled/{flag}", post(routes::set_enabled))
        .merge(admitted)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C, then release any modifier keys still held.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    let modifiers = state.dispatcher.modifiers().clone();
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    match tokio::task::spawn_blocking(move || modifiers.force_clear()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Failed to release modifier keys on shutdown: {e}"),
        Err(e) => tracing::warn!("Modifier release task failed: {e}"),
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => {
            tracing::error!("Could not listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
