//! Pure decision functions used by the dispatcher.
//!
//! These take plain parameters and have no host dependency, so they can be
//! unit-tested without an executor or probe.

/// What toggling an app should do given its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTransition {
    /// Running but not closable: leave it alone.
    Refuse,
    Terminate,
    Launch,
}

pub fn plan_app_toggle(running: bool, closable: bool) -> AppTransition {
    match (running, closable) {
        (true, false) => AppTransition::Refuse,
        (true, true) => AppTransition::Terminate,
        (false, _) => AppTransition::Launch,
    }
}

/// Running flag to report after a toggle attempt: flipped on success,
/// unchanged on failure.
pub fn running_after_toggle(was_running: bool, success: bool) -> bool {
    if success {
        !was_running
    } else {
        was_running
    }
}

pub fn clamp_volume(value: u32) -> u8 {
    value.min(100) as u8
}

fn name_matches(device: &str, fragment: &str) -> bool {
    !fragment.is_empty() && device.to_lowercase().contains(&fragment.to_lowercase())
}

/// Output to switch to: the headphones when the speakers are current,
/// otherwise back to the speakers.
pub fn next_output_device<'a>(current: &str, speakers: &'a str, headphones: &'a str) -> &'a str {
    if name_matches(current, speakers) {
        headphones
    } else {
        speakers
    }
}

/// Full device name for a configured name fragment, if one is present.
pub fn resolve_device<'a>(devices: &'a [String], fragment: &str) -> Option<&'a str> {
    devices
        .iter()
        .find(|d| name_matches(d, fragment))
        .map(String::as_str)
}

pub fn is_headphone_active(current: &str, headphones: &str) -> bool {
    name_matches(current, headphones)
}

pub fn screenshot_file_name(unix_secs: u64) -> String {
    format!("screenshot_{unix_secs}.png")
}
