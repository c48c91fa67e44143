//! Session tokens with an idle timeout.
//!
//! The check is a gate, not a query: an authenticated session that has been
//! idle past the timeout is removed by the same call that notices it, and a
//! live one has its activity stamp refreshed.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub authenticated: bool,
    pub last_activity: Instant,
}

impl Session {
    pub fn authenticated_at(now: Instant) -> Self {
        Self {
            authenticated: true,
            last_activity: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    Valid,
    /// Was authenticated but idle past the timeout; now cleared.
    Expired,
    /// Never authenticated. Nothing was changed.
    Unauthenticated,
}

impl SessionCheck {
    pub fn is_valid(self) -> bool {
        self == SessionCheck::Valid
    }
}

/// Apply the idle-timeout rule to one session.
///
/// On expiry the session is reset to unauthenticated so the caller can drop it.
pub fn check_session(session: &mut Session, timeout: Duration, now: Instant) -> SessionCheck {
    if !session.authenticated {
        return SessionCheck::Unauthenticated;
    }
    if now.saturating_duration_since(session.last_activity) > timeout {
        session.authenticated = false;
        return SessionCheck::Expired;
    }
    session.last_activity = now;
    SessionCheck::Valid
}

/// Server-side session table keyed by opaque token.
pub struct SessionStore {
    timeout: Duration,
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sessions: DashMap::new(),
        }
    }

    /// Create an authenticated session and return its token.
    pub fn login(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions
            .insert(token.clone(), Session::authenticated_at(Instant::now()));
        token
    }

    pub fn logout(&self, token: &str) {
        self.sessions.remove(token);
    }

    pub fn check(&self, token: Option<&str>) -> SessionCheck {
        self.check_at(token, Instant::now())
    }

    pub(crate) fn check_at(&self, token: Option<&str>, now: Instant) -> SessionCheck {
        let Some(token) = token else {
            return SessionCheck::Unauthenticated;
        };
        let result = match self.sessions.get_mut(token) {
            Some(mut session) => check_session(&mut session, self.timeout, now),
            None => return SessionCheck::Unauthenticated,
        };
        if result == SessionCheck::Expired {
            // Only remove if nobody re-authenticated the token in between.
            self.sessions.remove_if(token, |_, s| !s.authenticated);
            tracing::info!("Session expired after {:?} idle", self.timeout);
        }
        result
    }

    /// Remove every session idle past the timeout. Returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| {
            s.authenticated && now.saturating_duration_since(s.last_activity) <= self.timeout
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
