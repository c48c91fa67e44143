//! Command Executor: runs host-level commands with a bounded timeout.
//!
//! Callers describe *what* should happen as a [`HostCommand`]; the
//! [`ShellExecutor`] decides how to realize it on this host. Everything that
//! goes wrong (spawn failure, non-zero exit, timeout) comes back as a
//! [`CommandError`] so the dispatcher can fold it into a `success: false` reply.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::core::keys::{Key, KeyChord, Modifier};

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Sleep,
    Hibernate,
    Shutdown,
    Restart,
    Lock,
}

/// A host-level effect requested by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    KeyPress(KeyChord),
    KeyDown(Modifier),
    KeyUp(Modifier),
    Power(PowerAction),
    ToggleSpeakerMute,
    ToggleMicMute,
    SetDefaultOutput(String),
    /// Terminate every process with this executable name.
    Kill { executable: String },
    /// Start a program without waiting for it to exit.
    Launch { command: String },
    Screenshot { path: PathBuf },
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::KeyPress(chord) => write!(f, "key press {chord}"),
            HostCommand::KeyDown(m) => write!(f, "key down {m}"),
            HostCommand::KeyUp(m) => write!(f, "key up {m}"),
            HostCommand::Power(action) => write!(f, "power {action:?}"),
            HostCommand::ToggleSpeakerMute => f.write_str("speaker mute"),
            HostCommand::ToggleMicMute => f.write_str("microphone mute"),
            HostCommand::SetDefaultOutput(device) => write!(f, "set output {device}"),
            HostCommand::Kill { executable } => write!(f, "kill {executable}"),
            HostCommand::Launch { command } => write!(f, "launch {command}"),
            HostCommand::Screenshot { path } => write!(f, "screenshot {}", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("{program} exited with status {code:?}")]
    ExitStatus { program: String, code: Option<i32> },
}

/// Capability to run a host command. Implementations must bound every call
/// by a timeout and never panic on command failure.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, command: &HostCommand) -> Result<(), CommandError>;
}

/// Realizes [`HostCommand`]s by spawning processes (X11 key injection,
/// systemd power actions, PulseAudio control).
pub struct ShellExecutor {
    key_tool: String,
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new(key_tool: impl Into<String>, timeout: Duration) -> Self {
        Self {
            key_tool: key_tool.into(),
            timeout,
        }
    }

    /// Program and arguments for a command.
    pub fn argv(&self, command: &HostCommand) -> Vec<String> {
        match command {
            HostCommand::KeyPress(chord) => {
                let mut combo: Vec<&str> =
                    chord.modifiers.iter().map(|m| modifier_keysym(*m)).collect();
                combo.push(keysym(chord.key));
                vec![self.key_tool.clone(), "key".into(), combo.join("+")]
            }
            HostCommand::KeyDown(m) => {
                vec![self.key_tool.clone(), "keydown".into(), modifier_keysym(*m).into()]
            }
            HostCommand::KeyUp(m) => {
                vec![self.key_tool.clone(), "keyup".into(), modifier_keysym(*m).into()]
            }
            HostCommand::Power(action) => match action {
                PowerAction::Sleep => owned(&["systemctl", "suspend"]),
                PowerAction::Hibernate => owned(&["systemctl", "hibernate"]),
                PowerAction::Shutdown => owned(&["systemctl", "poweroff"]),
                PowerAction::Restart => owned(&["systemctl", "reboot"]),
                PowerAction::Lock => owned(&["loginctl", "lock-session"]),
            },
            HostCommand::ToggleSpeakerMute => {
                owned(&["pactl", "set-sink-mute", "@DEFAULT_SINK@", "toggle"])
            }
            HostCommand::ToggleMicMute => {
                owned(&["pactl", "set-source-mute", "@DEFAULT_SOURCE@", "toggle"])
            }
            HostCommand::SetDefaultOutput(device) => {
                vec!["pactl".into(), "set-default-sink".into(), device.clone()]
            }
            HostCommand::Kill { executable } => {
                vec!["pkill".into(), "-x".into(), executable.clone()]
            }
            HostCommand::Launch { command } => vec!["sh".into(), "-c".into(), command.clone()],
            HostCommand::Screenshot { path } => vec![
                "import".into(),
                "-window".into(),
                "root".into(),
                path.to_string_lossy().into_owned(),
            ],
        }
    }

    /// Run to completion, killing the child if it outlives the timeout.
    fn run_bounded(&self, argv: &[String]) -> Result<(), CommandError> {
        run_with_deadline(argv, self.timeout, false).map(|_| ())
    }

    /// Start and detach; a reaper thread collects the exit status.
    fn run_detached(&self, argv: &[String]) -> Result<(), CommandError> {
        let mut child = spawn(argv, Stdio::null())?;
        let spawned = std::thread::Builder::new()
            .name("launch-reaper".into())
            .spawn(move || {
                let _ = child.wait();
            });
        if let Err(e) = spawned {
            tracing::warn!("Could not spawn reaper thread: {e}");
        }
        Ok(())
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command: &HostCommand) -> Result<(), CommandError> {
        let argv = self.argv(command);
        tracing::debug!("Executing {command}: {argv:?}");
        let result = match command {
            HostCommand::Launch { .. } => self.run_detached(&argv),
            _ => self.run_bounded(&argv),
        };
        if let Err(e) = &result {
            tracing::warn!("Command failed ({command}): {e}");
        }
        result
    }
}

fn spawn(argv: &[String], stdout: Stdio) -> Result<Child, CommandError> {
    let program = argv.first().cloned().unwrap_or_default();
    Command::new(&program)
        .args(argv.get(1..).unwrap_or(&[]))
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| CommandError::Spawn { program, source })
}

/// Run `argv` to completion within `timeout`, killing the child once the
/// deadline passes. With `capture` set, stdout is drained on a helper thread
/// and returned; otherwise it is discarded and the result is empty.
pub(crate) fn run_with_deadline(
    argv: &[String],
    timeout: Duration,
    capture: bool,
) -> Result<String, CommandError> {
    let program = argv.first().cloned().unwrap_or_default();
    let stdout = if capture { Stdio::piped() } else { Stdio::null() };
    let mut child = spawn(argv, stdout)?;

    // A child blocked on a full pipe never exits, so the reader runs alongside the poll.
    let reader = match child.stdout.take() {
        Some(mut pipe) => {
            let spawned = std::thread::Builder::new()
                .name("command-output".into())
                .spawn(move || {
                    let mut buf = String::new();
                    let _ = pipe.read_to_string(&mut buf);
                    buf
                });
            match spawned {
                Ok(handle) => Some(handle),
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::Spawn { program, source });
                }
            }
        }
        None => None,
    };
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => {
                return Ok(reader
                    .and_then(|handle| handle.join().ok())
                    .unwrap_or_default())
            }
            Ok(Some(status)) => {
                return Err(CommandError::ExitStatus {
                    program,
                    code: status.code(),
                })
            }
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                // The reader is left detached; a surviving grandchild may still hold the pipe.
                return Err(CommandError::Timeout {
                    program,
                    after: timeout,
                });
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(source) => return Err(CommandError::Spawn { program, source }),
        }
    }
}

fn owned(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn modifier_keysym(m: Modifier) -> &'static str {
    match m {
        Modifier::Alt => "alt",
        Modifier::Ctrl => "ctrl",
        Modifier::Shift => "shift",
    }
}

fn keysym(key: Key) -> &'static str {
    match key {
        Key::Left => "Left",
        Key::Up => "Up",
        Key::Right => "Right",
        Key::Down => "Down",
        Key::Enter => "Return",
        Key::Space => "space",
        Key::Escape => "Escape",
        Key::Backspace => "BackSpace",
        Key::Super => "super",
        Key::Tab => "Tab",
        Key::Delete => "Delete",
        Key::F4 => "F4",
        Key::F5 => "F5",
        Key::Z => "z",
        Key::Y => "y",
        Key::MediaPlayPause => "XF86AudioPlay",
        Key::MediaNext => "XF86AudioNext",
        Key::MediaPrevious => "XF86AudioPrev",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(timeout: Duration) -> ShellExecutor {
        ShellExecutor::new("xdotool", timeout)
    }

    #[test]
    fn test_chord_renders_as_single_key_invocation() {
        let exec = executor(Duration::from_secs(1));
        let argv = exec.argv(&HostCommand::KeyPress(KeyChord::with(
            [Modifier::Ctrl, Modifier::Alt],
            Key::Delete,
        )));
        assert_eq!(argv, vec!["xdotool", "key", "ctrl+alt+Delete"]);
    }

    #[test]
    fn test_modifier_down_and_up() {
        let exec = executor(Duration::from_secs(1));
        assert_eq!(
            exec.argv(&HostCommand::KeyDown(Modifier::Shift)),
            vec!["xdotool", "keydown", "shift"]
        );
        assert_eq!(
            exec.argv(&HostCommand::KeyUp(Modifier::Alt)),
            vec!["xdotool", "keyup", "alt"]
        );
    }

    #[test]
    fn test_kill_matches_exact_name() {
        let exec = executor(Duration::from_secs(1));
        let argv = exec.argv(&HostCommand::Kill {
            executable: "steam".into(),
        });
        assert_eq!(argv, vec!["pkill", "-x", "steam"]);
    }

    #[test]
    fn test_missing_program_reports_spawn_error() {
        let exec = executor(Duration::from_secs(1));
        let err = exec
            .run_bounded(&["pcremote-no-such-binary".to_string()])
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_reported() {
        let exec = executor(Duration::from_secs(5));
        let argv: Vec<String> = vec!["sh".into(), "-c".into(), "exit 3".into()];
        match exec.run_bounded(&argv) {
            Err(CommandError::ExitStatus { code, .. }) => assert_eq!(code, Some(3)),
            other => panic!("expected exit status error, got {other:?}"),
        }
        let ok: Vec<String> = vec!["sh".into(), "-c".into(), "exit 0".into()];
        assert!(exec.run_bounded(&ok).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_command_times_out() {
        let exec = executor(Duration::from_millis(100));
        let argv: Vec<String> = vec!["sleep".into(), "5".into()];
        let started = Instant::now();
        let err = exec.run_bounded(&argv).unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_captured_output_is_returned() {
        let argv: Vec<String> = vec!["sh".into(), "-c".into(), "echo 'Mute: no'".into()];
        let out = run_with_deadline(&argv, Duration::from_secs(5), true).unwrap();
        assert_eq!(out.trim(), "Mute: no");
    }

    #[cfg(unix)]
    #[test]
    fn test_capturing_run_is_bounded() {
        let argv: Vec<String> = vec!["sleep".into(), "5".into()];
        let started = Instant::now();
        let err = run_with_deadline(&argv, Duration::from_millis(100), true).unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
