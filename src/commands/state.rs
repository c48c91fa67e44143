//! Shared application state handed to every HTTP handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::commands::dispatcher::Dispatcher;
use crate::core::rate_limiter::RateLimiter;
use crate::core::session::SessionStore;

/// Login pair checked by `POST /login`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub rate_limiter: Arc<RateLimiter>,
    pub sessions: Arc<SessionStore>,
    /// Administrative switch. When false every gated route answers 503.
    pub enabled: Arc<AtomicBool>,
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        rate_limiter: Arc<RateLimiter>,
        sessions: Arc<SessionStore>,
        credentials: Credentials,
    ) -> Self {
        Self {
            dispatcher,
            rate_limiter,
            sessions,
            enabled: Arc::new(AtomicBool::new(true)),
            credentials: Arc::new(credentials),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Returns the previous value.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_match_exactly() {
        let creds = Credentials {
            username: "admin".into(),
            password: "secret".into(),
        };
        assert!(creds.matches("admin", "secret"));
        assert!(!creds.matches("admin", "Secret"));
        assert!(!creds.matches("", ""));
    }
}
