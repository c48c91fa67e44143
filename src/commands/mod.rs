//! Action handling behind the HTTP routes, organized by concern.
//!
//! - `actions`: the closed action set and name lookup
//! - `apps`: registered applications
//! - `dispatcher`: runs actions against the host and builds replies
//! - `logic`: pure decision functions (unit-testable)
//! - `state`: shared `AppState` definition

pub mod actions;
pub mod apps;
pub mod dispatcher;
mod logic;
mod state;

pub use dispatcher::{ActionResponse, Dispatcher, StatusReport, Timings};
pub use state::{AppState, Credentials};
