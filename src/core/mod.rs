//! Core state: request admission, sessions, process presence, held modifiers,
//! and the host capabilities they drive.
//!
//! - [`rate_limiter`] : per-client sliding-window request budget
//! - [`session`] : session tokens with an idle timeout
//! - [`process_cache`] : TTL-memoized set of running process names
//! - [`modifiers`] : held Alt/Ctrl/Shift with idle auto-release
//! - [`executor`] / [`probe`] : host command execution and system queries

pub mod executor;
pub mod keys;
pub mod modifiers;
pub mod probe;
pub mod process_cache;
pub mod rate_limiter;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
