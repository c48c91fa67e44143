//! Sliding-window request limiter, keyed by client address.
//!
//! Each client gets its own log of request timestamps inside the trailing
//! window. The log lives in a `DashMap` entry, so the prune-count-append
//! sequence for one client runs under that entry's shard lock while other
//! clients proceed independently.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    logs: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            logs: DashMap::new(),
        }
    }

    /// Record a request from `client` if it is within budget.
    ///
    /// Returns `false` without touching the log when the client already made
    /// `max_per_window` requests inside the window.
    pub fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now())
    }

    pub(crate) fn allow_at(&self, client: &str, now: Instant) -> bool {
        let mut log = self.logs.entry(client.to_string()).or_default();
        prune(&mut log, now, self.window);
        if log.len() >= self.max_per_window {
            return false;
        }
        log.push_back(now);
        true
    }

    /// Drop clients whose whole log has aged out. Returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.logs.len();
        self.logs.retain(|_, log| {
            prune(log, now, self.window);
            !log.is_empty()
        });
        before.saturating_sub(self.logs.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.logs.len()
    }
}

fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = log.front() {
        if now.duration_since(*front) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}
