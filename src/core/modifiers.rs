//! Modifier keys held across independent requests.
//!
//! A client toggles Alt/Ctrl/Shift on and off with separate requests, and the
//! next ordinary key press is sent as one chord with every held modifier. Held
//! keys release themselves after an idle period so a client that goes away
//! cannot leave the host keyboard stuck.
//!
//! The held set and its release timer form one unit under a single mutex:
//!
//! - the set is non-empty iff a release timer is pending;
//! - every transition cancels the pending timer before it mutates the set or
//!   schedules a new one, all inside the same critical section;
//! - each timer carries the generation it was scheduled under, and fires only
//!   if no transition happened since. A timer that lost the race to a new
//!   toggle therefore never releases keys that were just pressed again.
//!
//! Host key events run outside that mutex, behind a second `events` lock that
//! is taken before the state lock is let go. Events therefore reach the host
//! in the order of the set mutations, while reads and bookkeeping never wait
//! on a slow key tool. The state lock is never acquired while `events` is held.
//!
//! Key events are issued optimistically: a failed key-down or key-up is
//! reported through the returned `Result`, but the in-memory set is not
//! rolled back.

use std::collections::BTreeSet;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crate::core::executor::{CommandError, CommandExecutor, HostCommand};
use crate::core::keys::{Key, KeyChord, Modifier};

/// Result of toggling one modifier.
#[derive(Debug)]
pub struct ToggleOutcome {
    pub modifier: Modifier,
    /// Whether the modifier is held after the toggle.
    pub held: bool,
    pub active: Vec<Modifier>,
    pub result: Result<(), CommandError>,
}

impl ToggleOutcome {
    pub fn message(&self) -> String {
        if self.held {
            format!("{} is active.", self.modifier.label())
        } else {
            format!("{} released.", self.modifier.label())
        }
    }
}

/// Result of a modifier-aware key press.
#[derive(Debug)]
pub struct KeyPressOutcome {
    pub chord: KeyChord,
    pub active: Vec<Modifier>,
    pub result: Result<(), CommandError>,
}

impl KeyPressOutcome {
    pub fn message(&self) -> String {
        match self.result {
            Ok(()) => format!("Sent {}", self.chord),
            Err(_) => "Command failed".to_string(),
        }
    }
}

struct ReleaseTimer {
    cancel: mpsc::Sender<()>,
}

impl ReleaseTimer {
    /// Run `fire` after `after` unless canceled first.
    fn schedule(after: Duration, fire: impl FnOnce() + Send + 'static) -> std::io::Result<Self> {
        let (cancel, canceled) = mpsc::channel::<()>();
        std::thread::Builder::new()
            .name("modifier-release".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = canceled.recv_timeout(after) {
                    fire();
                }
            })?;
        Ok(Self { cancel })
    }

    fn cancel(self) {
        // The thread may already be past its wait; the generation check covers that.
        let _ = self.cancel.send(());
    }
}

#[derive(Default)]
struct Held {
    keys: BTreeSet<Modifier>,
    timer: Option<ReleaseTimer>,
    generation: u64,
}

impl Held {
    /// Cancel any pending timer and start a new generation.
    fn invalidate_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    fn active(&self) -> Vec<Modifier> {
        self.keys.iter().copied().collect()
    }
}

struct Inner {
    executor: Arc<dyn CommandExecutor>,
    release_after: Duration,
    settle_delay: Duration,
    held: Mutex<Held>,
    events: Mutex<()>,
}

/// Shared handle to the modifier state machine.
#[derive(Clone)]
pub struct ModifierState {
    inner: Arc<Inner>,
}

impl ModifierState {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        release_after: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                release_after,
                settle_delay,
                held: Mutex::new(Held::default()),
                events: Mutex::new(()),
            }),
        }
    }

    /// Press `modifier` if released, release it if held, and restart the idle timer.
    pub fn toggle(&self, modifier: Modifier) -> ToggleOutcome {
        self.inner.toggle(modifier)
    }

    /// Send `key` with every held modifier as one chord, consuming the held set.
    pub fn press(&self, key: Key) -> KeyPressOutcome {
        self.inner.press(key)
    }

    /// Release every held modifier. Safe to call when nothing is held.
    pub fn force_clear(&self) -> Result<(), CommandError> {
        self.inner.force_clear()
    }

    pub fn active(&self) -> Vec<Modifier> {
        self.inner.lock().active()
    }

    #[cfg(test)]
    pub fn has_pending_release(&self) -> bool {
        self.inner.lock().timer.is_some()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Held> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn events(&self) -> MutexGuard<'_, ()> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn toggle(self: &Arc<Self>, modifier: Modifier) -> ToggleOutcome {
        let mut held = self.lock();
        held.invalidate_timer();

        let now_held = !held.keys.remove(&modifier);
        let command = if now_held {
            held.keys.insert(modifier);
            HostCommand::KeyDown(modifier)
        } else {
            HostCommand::KeyUp(modifier)
        };
        let mut orphaned = Vec::new();
        if !held.keys.is_empty() {
            let generation = held.generation;
            let weak = Arc::downgrade(self);
            let fire = move || release_expired(weak, generation);
            match ReleaseTimer::schedule(self.release_after, fire) {
                Ok(timer) => held.timer = Some(timer),
                Err(e) => {
                    tracing::error!("Could not schedule modifier release, releasing now: {e}");
                    orphaned = std::mem::take(&mut held.keys).into_iter().collect();
                }
            }
        }
        let active = held.active();
        let events = self.events();
        drop(held);

        let result = self.executor.execute(&command);
        if let Err(e) = self.release(&orphaned) {
            tracing::warn!("Releasing unscheduled modifiers failed: {e}");
        }
        drop(events);
        tracing::debug!("Toggled {modifier}: held={now_held}, active={active:?}");
        ToggleOutcome {
            modifier,
            held: now_held,
            active,
            result,
        }
    }

    fn press(&self, key: Key) -> KeyPressOutcome {
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }

        let (consumed, events) = self.take_all();
        let chord = KeyChord::with(consumed.iter().copied(), key);
        let result = self.executor.execute(&HostCommand::KeyPress(chord.clone()));
        if let Err(e) = self.release(&consumed) {
            tracing::warn!("Releasing consumed modifiers failed: {e}");
        }
        drop(events);

        KeyPressOutcome {
            chord,
            active: self.lock().active(),
            result,
        }
    }

    fn force_clear(&self) -> Result<(), CommandError> {
        let (released, _events) = self.take_all();
        let result = self.release(&released);
        if !released.is_empty() {
            tracing::info!("All modifier keys have been released.");
        }
        result
    }

    /// Cancel the timer and empty the set as one step, handing back the event
    /// lock for the key events that follow.
    fn take_all(&self) -> (Vec<Modifier>, MutexGuard<'_, ()>) {
        let mut held = self.lock();
        held.invalidate_timer();
        let keys = std::mem::take(&mut held.keys).into_iter().collect();
        (keys, self.events())
    }

    /// Key-up for each modifier, outside the state lock. Returns the first failure.
    fn release(&self, modifiers: &[Modifier]) -> Result<(), CommandError> {
        let mut first_err = None;
        for m in modifiers {
            if let Err(e) = self.executor.execute(&HostCommand::KeyUp(*m)) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Timer callback: release everything if no transition happened since scheduling.
fn release_expired(inner: Weak<Inner>, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let (released, events) = {
        let mut held = inner.lock();
        if held.generation != generation {
            return;
        }
        held.timer = None;
        held.generation = held.generation.wrapping_add(1);
        let keys: Vec<Modifier> = std::mem::take(&mut held.keys).into_iter().collect();
        (keys, inner.events())
    };
    if let Err(e) = inner.release(&released) {
        tracing::warn!("Auto-release of held modifiers failed: {e}");
    }
    drop(events);
    tracing::info!(
        "Released {:?} after {:?} idle",
        released,
        inner.release_after
    );
}
