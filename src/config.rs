//! Centralized runtime constants and the on-disk settings file.
//!
//! Tunable intervals and timeouts are collected here so they can be found and
//! adjusted in a single place. User-facing settings (credentials, devices,
//! registered apps) live in a JSON file that is created with defaults on first run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::commands::apps::AppDescriptor;

/// Length of the sliding window used by the per-client rate limiter (seconds).
pub const RATE_WINDOW_SECS: u64 = 60;

/// Age at which the running-process snapshot is considered stale (milliseconds).
pub const PROCESS_CACHE_TTL_MS: u64 = 2000;

/// Idle time after which held modifier keys are released automatically (milliseconds).
pub const MODIFIER_RELEASE_MS: u64 = 4100;

/// Delay applied before a key press so the host's key-down state can settle (milliseconds).
pub const KEY_SETTLE_DELAY_MS: u64 = 100;

/// Upper bound on any external command invocation (seconds).
pub const COMMAND_TIMEOUT_SECS: u64 = 10;

/// Wait after launching or killing an app before re-reading the process list (milliseconds).
pub const APP_SETTLE_DELAY_MS: u64 = 500;

/// Interval at which expired sessions and idle client logs are swept (seconds).
pub const HOUSEKEEPING_INTERVAL_SECS: u64 = 60;

/// Volume reported when the audio endpoint cannot be queried.
pub const FALLBACK_VOLUME: u8 = 50;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "pcremote_session";

pub fn rate_window() -> Duration {
    Duration::from_secs(RATE_WINDOW_SECS)
}

pub fn process_cache_ttl() -> Duration {
    Duration::from_millis(PROCESS_CACHE_TTL_MS)
}

pub fn modifier_release() -> Duration {
    Duration::from_millis(MODIFIER_RELEASE_MS)
}

pub fn key_settle_delay() -> Duration {
    Duration::from_millis(KEY_SETTLE_DELAY_MS)
}

pub fn command_timeout() -> Duration {
    Duration::from_secs(COMMAND_TIMEOUT_SECS)
}

pub fn app_settle_delay() -> Duration {
    Duration::from_millis(APP_SETTLE_DELAY_MS)
}

/// User settings persisted as JSON.
///
/// Every field has a default, so a partially written file still loads and
/// only the missing keys fall back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    /// When off, no subscriber is installed and nothing is logged.
    pub logging_enabled: bool,
    /// Log file; defaults to `pcremote.log` under the local data dir.
    pub log_file: Option<PathBuf>,
    pub session_timeout_minutes: u64,
    pub max_requests_per_minute: usize,
    /// Default speaker device name (first word is enough).
    pub playback_device_1: String,
    /// Headphone device name; also used to detect whether headphones are active.
    pub playback_device_2: String,
    /// Binary used to inject key events.
    pub key_tool: String,
    pub screenshot_dir: Option<PathBuf>,
    pub apps: BTreeMap<String, AppDescriptor>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: "password".into(),
            host: "0.0.0.0".into(),
            port: 5000,
            debug: false,
            logging_enabled: true,
            log_file: None,
            session_timeout_minutes: 30,
            max_requests_per_minute: 120,
            playback_device_1: "Speakers".into(),
            playback_device_2: "HeadPhone".into(),
            key_tool: "xdotool".into(),
            screenshot_dir: None,
            apps: default_apps(),
        }
    }
}

fn default_apps() -> BTreeMap<String, AppDescriptor> {
    let entries = [
        ("discord", "Discord", "discord", "discord", true),
        ("steam", "steam", "steam", "steam", true),
        ("chrome", "chrome", "chrome", "google-chrome", true),
        ("editor", "gedit", "gedit", "gedit", true),
        ("mediaplayer", "vlc", "vlc", "vlc", true),
        (
            "task_manager",
            "gnome-system-monitor",
            "gnome-system-monitor",
            "gnome-system-monitor",
            false,
        ),
    ];
    entries
        .into_iter()
        .map(|(key, exe, process, cmd, closable)| {
            (
                key.to_string(),
                AppDescriptor {
                    executable_name: exe.into(),
                    process_name: process.into(),
                    launch_command: cmd.into(),
                    closable,
                },
            )
        })
        .collect()
}

impl Settings {
    /// Load settings from `path`, writing the defaults there first if the file is missing.
    ///
    /// The flag is `true` when the defaults were just written. Nothing is
    /// logged here because this runs before the subscriber is installed.
    pub fn load_or_init(path: &Path) -> anyhow::Result<(Self, bool)> {
        let created = !path.exists();
        if created {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating config dir {}", parent.display()))?;
            }
            let defaults = serde_json::to_string_pretty(&Settings::default())?;
            std::fs::write(path, defaults)
                .with_context(|| format!("writing default config to {}", path.display()))?;
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok((settings, created))
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    /// Directory screenshots are written to.
    pub fn screenshot_dir(&self) -> PathBuf {
        self.screenshot_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Remote Screenshots")
        })
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pcremote")
                .join("pcremote.log")
        })
    }
}

/// Default location of the settings file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pcremote")
        .join("config.json")
}
