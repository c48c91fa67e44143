//! The closed set of actions the remote exposes.

use crate::core::executor::{HostCommand, PowerAction};
use crate::core::keys::{Key, KeyChord, Modifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run a fixed command and report `message` on success.
    Direct {
        command: HostCommand,
        message: &'static str,
    },
    ModifierToggle(Modifier),
    /// A key press that picks up any held modifiers.
    ModifierKey(Key),
    AppToggle(String),
    SetVolume(u32),
    AudioDeviceToggle,
    Screenshot,
}

impl Action {
    /// Resolve a name from `/api/action/{name}`.
    pub fn from_name(name: &str) -> Option<Action> {
        let direct = |command: HostCommand, message: &'static str| {
            Some(Action::Direct { command, message })
        };
        let chord = |modifier: Modifier, key: Key| {
            HostCommand::KeyPress(KeyChord::with([modifier], key))
        };
        let press = |key: Key| HostCommand::KeyPress(KeyChord::plain(key));

        match name {
            "media_play_pause" => direct(press(Key::MediaPlayPause), "Media play/pause toggled"),
            "media_next" => direct(press(Key::MediaNext), "Skipped to next track"),
            "media_previous" => direct(press(Key::MediaPrevious), "Skipped to previous track"),
            "undo" => direct(chord(Modifier::Ctrl, Key::Z), "Undo (Ctrl+Z)"),
            "redo" => direct(chord(Modifier::Ctrl, Key::Y), "Redo (Ctrl+Y)"),
            "sleep" => direct(HostCommand::Power(PowerAction::Sleep), "System sleep initiated"),
            "hard_sleep" => direct(
                HostCommand::Power(PowerAction::Hibernate),
                "System hard sleep initiated",
            ),
            "shutdown" => direct(
                HostCommand::Power(PowerAction::Shutdown),
                "System shutdown initiated",
            ),
            "restart" => direct(
                HostCommand::Power(PowerAction::Restart),
                "System restart initiated",
            ),
            "lock" => direct(HostCommand::Power(PowerAction::Lock), "Workstation locked"),
            "mute_toggle_sound" => direct(HostCommand::ToggleSpeakerMute, "System volume mute toggled"),
            "mute_toggle_mic" => direct(HostCommand::ToggleMicMute, "Microphone mute toggled"),

            "arrow_left" => Some(Action::ModifierKey(Key::Left)),
            "arrow_up" => Some(Action::ModifierKey(Key::Up)),
            "arrow_right" => Some(Action::ModifierKey(Key::Right)),
            "arrow_down" => Some(Action::ModifierKey(Key::Down)),
            "press_enter" => Some(Action::ModifierKey(Key::Enter)),
            "press_space" => Some(Action::ModifierKey(Key::Space)),
            "press_esc" => Some(Action::ModifierKey(Key::Escape)),
            "press_backspace" => Some(Action::ModifierKey(Key::Backspace)),
            "press_win" => Some(Action::ModifierKey(Key::Super)),
            "press_tab" => Some(Action::ModifierKey(Key::Tab)),
            "press_del" => Some(Action::ModifierKey(Key::Delete)),
            "press_f4" => Some(Action::ModifierKey(Key::F4)),
            "press_f5" => Some(Action::ModifierKey(Key::F5)),

            "press_alt" => Some(Action::ModifierToggle(Modifier::Alt)),
            "press_ctrl" => Some(Action::ModifierToggle(Modifier::Ctrl)),
            "press_shift" => Some(Action::ModifierToggle(Modifier::Shift)),

            "screenshot" => Some(Action::Screenshot),
            "audio_device_toggle" => Some(Action::AudioDeviceToggle),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_is_none() {
        assert_eq!(Action::from_name("format_c"), None);
        assert_eq!(Action::from_name(""), None);
    }

    #[test]
    fn test_undo_is_a_fixed_chord_not_modifier_aware() {
        match Action::from_name("undo") {
            Some(Action::Direct {
                command: HostCommand::KeyPress(chord),
                message,
            }) => {
                assert_eq!(chord, KeyChord::with([Modifier::Ctrl], Key::Z));
                assert_eq!(message, "Undo (Ctrl+Z)");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_modifier_actions() {
        assert_eq!(
            Action::from_name("press_shift"),
            Some(Action::ModifierToggle(Modifier::Shift))
        );
        assert_eq!(
            Action::from_name("press_del"),
            Some(Action::ModifierKey(Key::Delete))
        );
    }

    #[test]
    fn test_app_toggle_and_volume_are_not_named_actions() {
        assert_eq!(Action::from_name("app_toggle"), None);
        assert_eq!(Action::from_name("volume"), None);
    }
}
