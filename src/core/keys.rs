//! Key vocabulary shared by the modifier state machine and the executor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A modifier key that can be held across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Alt,
    Ctrl,
    Shift,
}

impl Modifier {
    #[cfg(test)]
    pub const ALL: [Modifier; 3] = [Modifier::Alt, Modifier::Ctrl, Modifier::Shift];

    /// Capitalized label used in feedback messages.
    pub fn label(self) -> &'static str {
        match self {
            Modifier::Alt => "Alt",
            Modifier::Ctrl => "Ctrl",
            Modifier::Shift => "Shift",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Non-modifier keys the remote can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Up,
    Right,
    Down,
    Enter,
    Space,
    Escape,
    Backspace,
    Super,
    Tab,
    Delete,
    F4,
    F5,
    Z,
    Y,
    MediaPlayPause,
    MediaNext,
    MediaPrevious,
}

impl Key {
    pub fn label(self) -> &'static str {
        match self {
            Key::Left => "Left",
            Key::Up => "Up",
            Key::Right => "Right",
            Key::Down => "Down",
            Key::Enter => "Enter",
            Key::Space => "Space",
            Key::Escape => "Esc",
            Key::Backspace => "Backspace",
            Key::Super => "Window",
            Key::Tab => "Tab",
            Key::Delete => "Delete",
            Key::F4 => "F4",
            Key::F5 => "F5",
            Key::Z => "Z",
            Key::Y => "Y",
            Key::MediaPlayPause => "Play/Pause",
            Key::MediaNext => "Next",
            Key::MediaPrevious => "Previous",
        }
    }
}

/// One key press with any number of modifiers held for its duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Vec<Modifier>,
    pub key: Key,
}

impl KeyChord {
    pub fn plain(key: Key) -> Self {
        Self {
            modifiers: Vec::new(),
            key,
        }
    }

    pub fn with(modifiers: impl IntoIterator<Item = Modifier>, key: Key) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key,
        }
    }
}

/// Renders as `Ctrl+Alt+Delete`.
impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.label())?;
        }
        f.write_str(self.key.label())
    }
}
