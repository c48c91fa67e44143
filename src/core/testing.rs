//! In-memory executor and probe for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::executor::{CommandError, CommandExecutor, HostCommand};
use crate::core::keys::Modifier;
use crate::core::probe::{ProbeError, SystemProbe};

/// Records every command; optionally fails them all.
#[derive(Default)]
pub struct RecordingExecutor {
    commands: Mutex<Vec<HostCommand>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every command take this long.
    pub fn slow(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn commands(&self) -> Vec<HostCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn key_presses(&self) -> Vec<HostCommand> {
        self.commands()
            .into_iter()
            .filter(|c| matches!(c, HostCommand::KeyPress(_)))
            .collect()
    }

    pub fn key_ups(&self) -> Vec<Modifier> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                HostCommand::KeyUp(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&HostCommand) -> bool) -> usize {
        self.commands().iter().filter(|c| pred(c)).count()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, command: &HostCommand) -> Result<(), CommandError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.commands.lock().unwrap().push(command.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(CommandError::ExitStatus {
                program: "fake".into(),
                code: Some(1),
            });
        }
        Ok(())
    }
}

/// Mutable stand-in for the host's process table and audio endpoints.
pub struct FakeProbe {
    processes: Mutex<HashSet<String>>,
    volume: Mutex<u8>,
    speaker_muted: AtomicBool,
    mic_muted: AtomicBool,
    output: Mutex<String>,
    failing: AtomicBool,
    process_calls: AtomicUsize,
    process_delay: Mutex<Option<Duration>>,
}

impl FakeProbe {
    pub fn with_processes(names: &[&str]) -> Self {
        Self {
            processes: Mutex::new(names.iter().map(|n| n.to_lowercase()).collect()),
            volume: Mutex::new(30),
            speaker_muted: AtomicBool::new(false),
            mic_muted: AtomicBool::new(false),
            output: Mutex::new("Speakers".into()),
            failing: AtomicBool::new(false),
            process_calls: AtomicUsize::new(0),
            process_delay: Mutex::new(None),
        }
    }

    pub fn set_processes(&self, names: &[&str]) {
        *self.processes.lock().unwrap() = names.iter().map(|n| n.to_lowercase()).collect();
    }

    pub fn set_output(&self, name: &str) {
        *self.output.lock().unwrap() = name.to_string();
    }

    pub fn set_muted(&self, speaker: bool, mic: bool) {
        self.speaker_muted.store(speaker, Ordering::SeqCst);
        self.mic_muted.store(mic, Ordering::SeqCst);
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Later process listings are taken immediately but returned after `delay`.
    pub fn slow_processes(&self, delay: Option<Duration>) {
        *self.process_delay.lock().unwrap() = delay;
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }

    pub fn current_volume(&self) -> u8 {
        *self.volume.lock().unwrap()
    }

    fn check(&self, what: &str) -> Result<(), ProbeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProbeError::Unavailable(what.into()));
        }
        Ok(())
    }
}

impl SystemProbe for FakeProbe {
    fn process_names(&self) -> Result<HashSet<String>, ProbeError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        self.check("process table")?;
        let names = self.processes.lock().unwrap().clone();
        let delay = *self.process_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        Ok(names)
    }

    fn volume(&self) -> Result<u8, ProbeError> {
        self.check("volume")?;
        Ok(*self.volume.lock().unwrap())
    }

    fn set_volume(&self, percent: u8) -> Result<(), ProbeError> {
        self.check("volume")?;
        *self.volume.lock().unwrap() = percent;
        Ok(())
    }

    fn speaker_muted(&self) -> Result<bool, ProbeError> {
        self.check("speaker")?;
        Ok(self.speaker_muted.load(Ordering::SeqCst))
    }

    fn mic_muted(&self) -> Result<bool, ProbeError> {
        self.check("microphone")?;
        Ok(self.mic_muted.load(Ordering::SeqCst))
    }

    fn default_output(&self) -> Result<String, ProbeError> {
        self.check("output device")?;
        Ok(self.output.lock().unwrap().clone())
    }

    fn output_devices(&self) -> Result<Vec<String>, ProbeError> {
        self.check("output devices")?;
        Ok(vec![self.output.lock().unwrap().clone()])
    }
}
