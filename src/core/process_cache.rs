//! TTL-memoized snapshot of running process names.
//!
//! The snapshot is an immutable `Arc` swapped wholesale on refresh, so readers
//! never see a half-built set. A failed probe keeps the previous snapshot, and
//! a listing that started before the stored one never replaces it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core::probe::SystemProbe;

#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub names: HashSet<String>,
    /// `None` until the first successful probe.
    pub captured_at: Option<Instant>,
}

impl ProcessSnapshot {
    fn empty() -> Self {
        Self {
            names: HashSet::new(),
            captured_at: None,
        }
    }

    pub fn is_stale(&self, ttl: Duration, now: Instant) -> bool {
        match self.captured_at {
            Some(at) => now.saturating_duration_since(at) >= ttl,
            None => true,
        }
    }

    pub fn contains(&self, process_name: &str) -> bool {
        self.names.contains(&process_name.to_lowercase())
    }
}

pub struct ProcessCache {
    probe: Arc<dyn SystemProbe>,
    ttl: Duration,
    snapshot: Mutex<Arc<ProcessSnapshot>>,
}

impl ProcessCache {
    pub fn new(probe: Arc<dyn SystemProbe>, ttl: Duration) -> Self {
        Self {
            probe,
            ttl,
            snapshot: Mutex::new(Arc::new(ProcessSnapshot::empty())),
        }
    }

    /// Whether a process with this name is running.
    ///
    /// With `force` the probe is always consulted; otherwise only when the
    /// snapshot is older than the TTL.
    pub fn is_running(&self, process_name: &str, force: bool) -> bool {
        self.snapshot_for(force).contains(process_name)
    }

    /// Current snapshot, refreshed first if forced or stale.
    pub fn snapshot_for(&self, force: bool) -> Arc<ProcessSnapshot> {
        let current = self.current();
        if force || current.is_stale(self.ttl, Instant::now()) {
            self.refresh()
        } else {
            current
        }
    }

    /// Probe and replace the snapshot. On probe failure the previous snapshot
    /// stays in place and is returned.
    ///
    /// `captured_at` is the moment the listing started. When overlapping
    /// refreshes finish out of order, the one that started later wins.
    pub fn refresh(&self) -> Arc<ProcessSnapshot> {
        let started = Instant::now();
        match self.probe.process_names() {
            Ok(names) => {
                let fresh = Arc::new(ProcessSnapshot {
                    names,
                    captured_at: Some(started),
                });
                let mut stored = self.lock();
                if stored.captured_at.is_some_and(|at| at > started) {
                    return Arc::clone(&stored);
                }
                *stored = Arc::clone(&fresh);
                fresh
            }
            Err(e) => {
                tracing::warn!("Process probe failed, keeping previous snapshot: {e}");
                self.current()
            }
        }
    }

    pub fn current(&self) -> Arc<ProcessSnapshot> {
        Arc::clone(&self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Arc<ProcessSnapshot>> {
        // The guarded value is a plain Arc swap; a poisoned lock still holds a whole snapshot.
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::FakeProbe;

    fn cache_with(probe: &Arc<FakeProbe>, ttl: Duration) -> ProcessCache {
        ProcessCache::new(Arc::clone(probe) as Arc<dyn SystemProbe>, ttl)
    }

    #[test]
    fn test_first_read_probes() {
        let probe = Arc::new(FakeProbe::with_processes(&["steam"]));
        let cache = cache_with(&probe, Duration::from_secs(60));
        assert!(cache.is_running("steam", false));
        assert!(cache.is_running("STEAM", false));
        assert_eq!(probe.process_calls(), 1);
    }

    #[test]
    fn test_reads_within_ttl_are_identical() {
        let probe = Arc::new(FakeProbe::with_processes(&["steam"]));
        let cache = cache_with(&probe, Duration::from_secs(60));
        let first = cache.is_running("steam", false);

        probe.set_processes(&["chrome"]);
        let second = cache.is_running("steam", false);

        assert_eq!(first, second);
        assert!(!cache.is_running("chrome", false));
        assert_eq!(probe.process_calls(), 1);
    }

    #[test]
    fn test_force_reflects_latest_probe() {
        let probe = Arc::new(FakeProbe::with_processes(&["steam"]));
        let cache = cache_with(&probe, Duration::from_secs(60));
        assert!(cache.is_running("steam", false));

        probe.set_processes(&["chrome"]);
        assert!(!cache.is_running("steam", true));
        assert!(cache.is_running("chrome", true));
    }

    #[test]
    fn test_stale_snapshot_is_refreshed() {
        let probe = Arc::new(FakeProbe::with_processes(&["steam"]));
        let cache = cache_with(&probe, Duration::from_millis(20));
        assert!(cache.is_running("steam", false));

        probe.set_processes(&[]);
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cache.is_running("steam", false));
        assert_eq!(probe.process_calls(), 2);
    }

    #[test]
    fn test_listing_failure_keeps_previous_snapshot() {
        let probe = Arc::new(FakeProbe::with_processes(&["steam"]));
        let cache = cache_with(&probe, Duration::from_secs(60));
        assert!(cache.is_running("steam", true));

        probe.fail(true);
        assert!(cache.is_running("steam", true));
        assert!(cache.current().captured_at.is_some());
    }

    #[test]
    fn test_listing_failure_before_any_snapshot_reports_not_running() {
        let probe = Arc::new(FakeProbe::with_processes(&["steam"]));
        probe.fail(true);
        let cache = cache_with(&probe, Duration::from_secs(60));
        assert!(!cache.is_running("steam", false));
        assert!(cache.current().captured_at.is_none());
    }

    #[test]
    fn test_slow_refresh_does_not_overwrite_newer_snapshot() {
        let probe = Arc::new(FakeProbe::with_processes(&["steam"]));
        let cache = Arc::new(cache_with(&probe, Duration::from_secs(60)));

        // The first listing sees "steam" but returns late.
        probe.slow_processes(Some(Duration::from_millis(300)));
        let slow = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.refresh())
        };
        std::thread::sleep(Duration::from_millis(50));

        // Steam exits; a second, fast refresh records that first.
        probe.slow_processes(None);
        probe.set_processes(&["chrome"]);
        assert!(!cache.is_running("steam", true));

        let late = slow.join().unwrap();
        assert!(!late.contains("steam"));
        assert!(!cache.is_running("steam", false));
        assert!(cache.is_running("chrome", false));
    }
}
