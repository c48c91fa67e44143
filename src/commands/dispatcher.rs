//! Action Dispatcher: turns a resolved [`Action`] into host effects.
//!
//! Nothing here returns an error. Command and probe failures are folded into
//! an [`ActionResponse`] with `success: false`, and status queries fall back
//! to defaults when the probe is unavailable.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::commands::actions::Action;
use crate::commands::apps::{display_name, AppRegistry};
use crate::commands::logic::{self, AppTransition};
use crate::config::{self, Settings};
use crate::core::executor::{CommandExecutor, HostCommand};
use crate::core::keys::Modifier;
use crate::core::modifiers::ModifierState;
use crate::core::probe::SystemProbe;
use crate::core::process_cache::ProcessCache;

/// Mute and output-device snapshot returned alongside every action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MuteState {
    pub speaker_muted: bool,
    pub mic_muted: bool,
    pub is_headphone_active: bool,
}

/// Reply for actions, app toggles and volume changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "activeModifiers", skip_serializing_if = "Option::is_none")]
    pub active_modifiers: Option<Vec<Modifier>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<MuteState>,
}

impl ActionResponse {
    pub fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            active_modifiers: None,
            running: None,
            state: None,
        }
    }

    pub fn invalid_action() -> Self {
        Self::new(false, "Invalid action")
    }
}

/// `GET /api/status/all` payload.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub apps: BTreeMap<String, bool>,
    pub volume: u8,
    pub muted_state: MuteState,
}

/// Durations the dispatcher and its components run with.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub process_ttl: Duration,
    pub modifier_release: Duration,
    pub key_settle: Duration,
    pub app_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            process_ttl: config::process_cache_ttl(),
            modifier_release: config::modifier_release(),
            key_settle: config::key_settle_delay(),
            app_settle: config::app_settle_delay(),
        }
    }
}

pub struct Dispatcher {
    executor: Arc<dyn CommandExecutor>,
    probe: Arc<dyn SystemProbe>,
    processes: ProcessCache,
    modifiers: ModifierState,
    apps: AppRegistry,
    speakers: String,
    headphones: String,
    screenshot_dir: PathBuf,
    app_settle: Duration,
}

impl Dispatcher {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        probe: Arc<dyn SystemProbe>,
        settings: &Settings,
        timings: Timings,
    ) -> Self {
        Self {
            processes: ProcessCache::new(Arc::clone(&probe), timings.process_ttl),
            modifiers: ModifierState::new(
                Arc::clone(&executor),
                timings.modifier_release,
                timings.key_settle,
            ),
            executor,
            probe,
            apps: AppRegistry::new(settings.apps.clone()),
            speakers: settings.playback_device_1.clone(),
            headphones: settings.playback_device_2.clone(),
            screenshot_dir: settings.screenshot_dir(),
            app_settle: timings.app_settle,
        }
    }

    pub fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    #[cfg(test)]
    pub fn processes(&self) -> &ProcessCache {
        &self.processes
    }

    /// Handle `/api/action/{name}`: resolve, run, and attach the state snapshot.
    pub fn dispatch(&self, name: &str) -> ActionResponse {
        let Some(action) = Action::from_name(name) else {
            tracing::debug!("Unknown action {name:?}");
            return ActionResponse::invalid_action();
        };
        let mut response = self.execute(&action);
        if response.active_modifiers.is_none() {
            response.active_modifiers = Some(self.modifiers.active());
        }
        response.state = Some(self.mute_state());
        response
    }

    pub fn execute(&self, action: &Action) -> ActionResponse {
        match action {
            Action::Direct { command, message } => self.run_direct(command, message),
            Action::ModifierToggle(modifier) => {
                let outcome = self.modifiers.toggle(*modifier);
                let mut response = ActionResponse::new(outcome.result.is_ok(), outcome.message());
                response.active_modifiers = Some(outcome.active);
                response
            }
            Action::ModifierKey(key) => {
                let outcome = self.modifiers.press(*key);
                let mut response = ActionResponse::new(outcome.result.is_ok(), outcome.message());
                response.active_modifiers = Some(outcome.active);
                response
            }
            Action::AppToggle(key) => self.toggle_app(key),
            Action::SetVolume(value) => self.set_volume(*value),
            Action::AudioDeviceToggle => self.toggle_audio_device(),
            Action::Screenshot => self.take_screenshot(),
        }
    }

    fn run_direct(&self, command: &HostCommand, message: &str) -> ActionResponse {
        match self.executor.execute(command) {
            Ok(()) => ActionResponse::new(true, message),
            Err(e) => {
                tracing::warn!("Direct action failed: {e}");
                ActionResponse::new(false, format!("Failed to execute: {command}"))
            }
        }
    }

    /// Start a stopped app or stop a running one.
    pub fn toggle_app(&self, key: &str) -> ActionResponse {
        let Some(app) = self.apps.get(key) else {
            return ActionResponse::new(false, "App not configured");
        };
        let label = display_name(key);
        let was_running = self.processes.is_running(&app.process_name, true);

        let (success, message) = match logic::plan_app_toggle(was_running, app.closable) {
            AppTransition::Refuse => {
                let mut response = ActionResponse::new(true, format!("Cannot close {label}"));
                response.running = Some(true);
                return response;
            }
            AppTransition::Terminate => {
                let command = HostCommand::Kill {
                    executable: app.executable_name.clone(),
                };
                match self.executor.execute(&command) {
                    Ok(()) => (true, format!("{label} closed.")),
                    Err(e) => {
                        tracing::warn!("Failed to close {label}: {e}");
                        (false, format!("Failed to close {label}."))
                    }
                }
            }
            AppTransition::Launch => {
                let command = HostCommand::Launch {
                    command: app.launch_command.clone(),
                };
                match self.executor.execute(&command) {
                    Ok(()) => (true, format!("{label} started.")),
                    Err(e) => (false, format!("Failed to start {label}: {e}")),
                }
            }
        };

        if !self.app_settle.is_zero() {
            std::thread::sleep(self.app_settle);
        }
        self.processes.refresh();

        tracing::info!("{message}");
        let mut response = ActionResponse::new(success, message);
        response.running = Some(logic::running_after_toggle(was_running, success));
        response
    }

    pub fn set_volume(&self, value: u32) -> ActionResponse {
        let percent = logic::clamp_volume(value);
        match self.probe.set_volume(percent) {
            Ok(()) => ActionResponse::new(true, format!("Volume set to {percent}%")),
            Err(e) => {
                tracing::warn!("Failed to set volume: {e}");
                ActionResponse::new(false, e.to_string())
            }
        }
    }

    fn toggle_audio_device(&self) -> ActionResponse {
        let current = match self.probe.default_output() {
            Ok(name) => name,
            Err(e) => {
                tracing::error!("Error toggling audio device: {e}");
                return ActionResponse::new(false, e.to_string());
            }
        };
        let target = logic::next_output_device(&current, &self.speakers, &self.headphones);
        // The settings hold a name fragment; the sink command wants the full name.
        let device = match self.probe.output_devices() {
            Ok(devices) => logic::resolve_device(&devices, target)
                .unwrap_or(target)
                .to_string(),
            Err(e) => {
                tracing::warn!("Could not list output devices: {e}");
                target.to_string()
            }
        };
        match self.executor.execute(&HostCommand::SetDefaultOutput(device)) {
            Ok(()) => ActionResponse::new(true, format!("Switched to {target}")),
            Err(e) => {
                tracing::warn!("Failed to switch audio device: {e}");
                ActionResponse::new(false, "Failed to switch audio device")
            }
        }
    }

    fn take_screenshot(&self) -> ActionResponse {
        if let Err(e) = std::fs::create_dir_all(&self.screenshot_dir) {
            return ActionResponse::new(false, e.to_string());
        }
        let unix_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let file_name = logic::screenshot_file_name(unix_secs);
        let path = self.screenshot_dir.join(&file_name);

        match self.executor.execute(&HostCommand::Screenshot { path }) {
            Ok(()) => ActionResponse::new(true, format!("Screenshot saved to {file_name}")),
            Err(e) => ActionResponse::new(false, e.to_string()),
        }
    }

    /// Volume in percent, or the fallback when the endpoint cannot be read.
    pub fn volume(&self) -> u8 {
        self.probe.volume().unwrap_or_else(|e| {
            tracing::error!("Failed to get volume: {e}");
            config::FALLBACK_VOLUME
        })
    }

    /// Each field degrades to `false` independently when its probe fails.
    pub fn mute_state(&self) -> MuteState {
        let speaker_muted = self.probe.speaker_muted().unwrap_or_else(|e| {
            tracing::warn!("Could not get speaker mute status: {e}");
            false
        });
        let mic_muted = self.probe.mic_muted().unwrap_or_else(|e| {
            tracing::warn!("Could not get microphone mute status: {e}");
            false
        });
        let is_headphone_active = match self.probe.default_output() {
            Ok(device) => logic::is_headphone_active(&device, &self.headphones),
            Err(e) => {
                tracing::warn!("Could not get output device name: {e}");
                false
            }
        };
        MuteState {
            speaker_muted,
            mic_muted,
            is_headphone_active,
        }
    }

    pub fn status_all(&self) -> StatusReport {
        let snapshot = self.processes.snapshot_for(true);
        let apps = self
            .apps
            .iter()
            .map(|(key, app)| (key.clone(), snapshot.contains(&app.process_name)))
            .collect();
        StatusReport {
            apps,
            volume: self.volume(),
            muted_state: self.mute_state(),
        }
    }
}
