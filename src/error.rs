//! Unified error type for the HTTP boundary.
//!
//! `AppError` covers the failures that stop a request before it reaches the
//! dispatcher. It serializes as `{ "kind": "...", "message": "..." }` so the
//! client can distinguish a rate-limit rejection from an expired session.
//! Command and probe failures never show up here; the dispatcher folds them
//! into `{ success: false, message }` payloads.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::ser::SerializeStruct;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The service was switched off administratively.
    #[error("App is disabled")]
    Disabled,

    /// The client exceeded its per-minute request budget.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// No session, or a session that never authenticated.
    #[error("Authentication required")]
    Unauthenticated,

    /// The session sat idle past the timeout and has been cleared.
    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Admin operation requested from a non-loopback peer.
    #[error("Forbidden")]
    Forbidden,

    /// Invalid or missing user input.
    #[error("{0}")]
    InvalidInput(String),

    /// I/O and OS-level errors.
    #[error("{0}")]
    Io(String),
}

impl AppError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Disabled => "Disabled",
            AppError::RateLimited => "RateLimited",
            AppError::Unauthenticated => "Unauthenticated",
            AppError::SessionExpired => "SessionExpired",
            AppError::InvalidCredentials => "InvalidCredentials",
            AppError::Forbidden => "Forbidden",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Io(_) => "Io",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Disabled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unauthenticated | AppError::SessionExpired | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Custom Serialize: produces `{ "kind": "Variant", "message": "..." }`.
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Io(format!("worker task failed: {err}"))
    }
}
