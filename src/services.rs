//! Background service lifecycle management.
//!
//! `BackgroundServices` owns the threads spawned at startup and stops them on
//! shutdown. There is one today: housekeeping, which drops expired sessions
//! and idle rate-limit logs so neither map grows with every client ever seen.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::core::rate_limiter::RateLimiter;
use crate::core::session::SessionStore;

/// What one housekeeping pass removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub clients: usize,
}

/// Sweep expired sessions and idle client logs once.
pub fn sweep(rate_limiter: &RateLimiter, sessions: &SessionStore) -> SweepReport {
    let report = SweepReport {
        sessions: sessions.sweep_expired(),
        clients: rate_limiter.prune_idle(),
    };
    if report != SweepReport::default() {
        tracing::debug!(
            "Housekeeping dropped {} session(s) and {} idle client(s); {} session(s) and {} client(s) remain",
            report.sessions,
            report.clients,
            sessions.len(),
            rate_limiter.tracked_clients()
        );
    }
    report
}

pub struct BackgroundServices {
    stop: mpsc::Sender<()>,
    housekeeping: JoinHandle<()>,
}

impl BackgroundServices {
    pub fn start(
        rate_limiter: &Arc<RateLimiter>,
        sessions: &Arc<SessionStore>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let rate_limiter = Arc::clone(rate_limiter);
        let sessions = Arc::clone(sessions);

        let housekeeping = std::thread::Builder::new()
            .name("housekeeping".into())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        sweep(&rate_limiter, &sessions);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self { stop, housekeeping })
    }

    /// Signal every service to stop and wait for it.
    pub fn shutdown(self) {
        let _ = self.stop.send(());
        if self.housekeeping.join().is_err() {
            tracing::error!("Housekeeping thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_drops_idle_clients_and_expired_sessions() {
        let limiter = RateLimiter::new(10, Duration::from_millis(20));
        let sessions = SessionStore::new(Duration::from_millis(20));
        assert!(limiter.allow("10.0.0.1"));
        sessions.login();

        assert_eq!(sweep(&limiter, &sessions), SweepReport::default());

        std::thread::sleep(Duration::from_millis(50));
        let report = sweep(&limiter, &sessions);
        assert_eq!(report, SweepReport { sessions: 1, clients: 1 });
        assert_eq!(limiter.tracked_clients(), 0);
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_housekeeping_thread_runs_and_stops() {
        let limiter = Arc::new(RateLimiter::new(10, Duration::from_millis(10)));
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(60)));
        assert!(limiter.allow("10.0.0.2"));

        let services =
            BackgroundServices::start(&limiter, &sessions, Duration::from_millis(20)).unwrap();
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(limiter.tracked_clients(), 0);
        services.shutdown();
    }
}
