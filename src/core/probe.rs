//! System Probe: process enumeration and audio endpoint state.
//!
//! Process names come from `sysinfo`; audio state is read from and written to
//! PulseAudio through `pactl`. Callers treat every failure as a transient
//! degradation and fall back to a last-known or default value.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::time::Duration;

use sysinfo::{ProcessRefreshKind, RefreshKind, System};

use crate::core::executor::{run_with_deadline, CommandError};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0} unavailable")]
    Unavailable(String),

    #[error("unexpected {what} output: {output:?}")]
    Parse { what: &'static str, output: String },
}

pub trait SystemProbe: Send + Sync {
    /// Lowercased names of every running process.
    fn process_names(&self) -> Result<HashSet<String>, ProbeError>;

    /// Master output volume in percent.
    fn volume(&self) -> Result<u8, ProbeError>;

    fn set_volume(&self, percent: u8) -> Result<(), ProbeError>;

    fn speaker_muted(&self) -> Result<bool, ProbeError>;

    fn mic_muted(&self) -> Result<bool, ProbeError>;

    /// Name of the current default output device.
    fn default_output(&self) -> Result<String, ProbeError>;

    fn output_devices(&self) -> Result<Vec<String>, ProbeError>;
}

/// Probe backed by `sysinfo` and `pactl`. Every `pactl` call is bounded by
/// the same timeout as host commands.
pub struct HostProbe {
    /// Program (and leading arguments) standing in for `pactl`.
    pactl: Vec<String>,
    timeout: Duration,
}

impl HostProbe {
    pub fn new(timeout: Duration) -> Self {
        Self::with_pactl(vec!["pactl".to_string()], timeout)
    }

    pub fn with_pactl(command: Vec<String>, timeout: Duration) -> Self {
        Self {
            pactl: command,
            timeout,
        }
    }

    fn pactl(&self, args: &[&str]) -> Result<String, ProbeError> {
        let subcommand = args.first().copied().unwrap_or_default();
        let mut argv = self.pactl.clone();
        argv.extend(args.iter().map(|a| a.to_string()));
        run_with_deadline(&argv, self.timeout, true).map_err(|e| match e {
            CommandError::Timeout { after, .. } => {
                tracing::warn!("pactl {subcommand} timed out after {after:?}");
                ProbeError::Unavailable(format!("pactl {subcommand} (timed out)"))
            }
            CommandError::Spawn { source, .. } => {
                ProbeError::Unavailable(format!("pactl ({source})"))
            }
            CommandError::ExitStatus { .. } => {
                ProbeError::Unavailable(format!("pactl {subcommand}"))
            }
        })
    }
}

impl SystemProbe for HostProbe {
    fn process_names(&self) -> Result<HashSet<String>, ProbeError> {
        let sys = System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::new()),
        );
        let names: HashSet<String> = sys
            .processes()
            .values()
            .map(|p| OsStr::new(p.name()).to_string_lossy().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return Err(ProbeError::Unavailable("process table".into()));
        }
        Ok(names)
    }

    fn volume(&self) -> Result<u8, ProbeError> {
        let out = self.pactl(&["get-sink-volume", "@DEFAULT_SINK@"])?;
        parse_volume_percent(&out)
    }

    fn set_volume(&self, percent: u8) -> Result<(), ProbeError> {
        let value = format!("{percent}%");
        self.pactl(&["set-sink-volume", "@DEFAULT_SINK@", &value])?;
        Ok(())
    }

    fn speaker_muted(&self) -> Result<bool, ProbeError> {
        let out = self.pactl(&["get-sink-mute", "@DEFAULT_SINK@"])?;
        parse_mute(&out)
    }

    fn mic_muted(&self) -> Result<bool, ProbeError> {
        let out = self.pactl(&["get-source-mute", "@DEFAULT_SOURCE@"])?;
        parse_mute(&out)
    }

    fn default_output(&self) -> Result<String, ProbeError> {
        let out = self.pactl(&["get-default-sink"])?;
        let name = out.trim();
        if name.is_empty() {
            return Err(ProbeError::Parse {
                what: "default sink",
                output: out,
            });
        }
        Ok(name.to_string())
    }

    fn output_devices(&self) -> Result<Vec<String>, ProbeError> {
        let out = self.pactl(&["list", "short", "sinks"])?;
        Ok(parse_short_sinks(&out))
    }
}

/// First `NN%` figure in `pactl get-sink-volume` output.
pub fn parse_volume_percent(output: &str) -> Result<u8, ProbeError> {
    output
        .split_whitespace()
        .find_map(|tok| tok.strip_suffix('%').and_then(|n| n.parse::<u32>().ok()))
        .map(|v| v.min(100) as u8)
        .ok_or_else(|| ProbeError::Parse {
            what: "volume",
            output: output.to_string(),
        })
}

/// `Mute: yes` / `Mute: no`.
pub fn parse_mute(output: &str) -> Result<bool, ProbeError> {
    match output.trim().strip_prefix("Mute:").map(str::trim) {
        Some("yes") => Ok(true),
        Some("no") => Ok(false),
        _ => Err(ProbeError::Parse {
            what: "mute",
            output: output.to_string(),
        }),
    }
}

/// Sink names from the tab-separated `pactl list short sinks` table.
pub fn parse_short_sinks(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
