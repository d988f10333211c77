//! Global shortcut detection
//!
//! The shortcut is a set of modifiers plus one key, parsed from a string
//! such as `"CMD+SHIFT+C"`. It is bound once at startup and stays fixed
//! for the lifetime of the process.
//!
//! Detection uses rdev's global event listener:
//! - macOS: requires Accessibility permission
//! - Linux: requires access to the X server or input devices

pub mod rdev_listener;

use crate::config::HotkeyConfig;
use crate::error::HotkeyError;
use crate::keystroke::SyntheticKeys;
use rdev::Key;
use tokio::sync::mpsc;

/// Events emitted by the hotkey listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The shortcut was pressed
    Triggered,
}

/// Trait for hotkey detection implementations
pub trait HotkeyListener: Send {
    /// Start listening; events arrive on the returned channel
    fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError>;

    /// Stop emitting events
    fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Modifier keys that must be held for a shortcut
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Command on macOS, Super/Windows elsewhere
    pub meta: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A parsed global shortcut
#[derive(Debug, Clone, PartialEq)]
pub struct Shortcut {
    pub modifiers: Modifiers,
    pub key: Key,
    key_name: String,
}

impl Shortcut {
    /// Parse a `+`-separated shortcut string (case-insensitive)
    pub fn parse(spec: &str) -> Result<Self, HotkeyError> {
        let invalid = |reason: &str| HotkeyError::InvalidShortcut(spec.to_string(), reason.into());

        let mut modifiers = Modifiers::default();
        let mut key: Option<(Key, String)> = None;

        for token in spec.split('+').map(|t| t.trim().to_uppercase()) {
            if token.is_empty() {
                return Err(invalid("empty key name"));
            }

            match token.as_str() {
                "CMD" | "COMMAND" | "META" | "SUPER" | "WIN" => modifiers.meta = true,
                "SHIFT" => modifiers.shift = true,
                "CTRL" | "CONTROL" => modifiers.ctrl = true,
                "ALT" | "OPT" | "OPTION" => modifiers.alt = true,
                name => {
                    if key.is_some() {
                        return Err(invalid("more than one non-modifier key"));
                    }
                    let parsed =
                        parse_key_name(name).ok_or_else(|| HotkeyError::UnknownKey(name.into()))?;
                    key = Some((parsed, name.to_string()));
                }
            }
        }

        let (key, key_name) = key.ok_or_else(|| invalid("missing a non-modifier key"))?;

        Ok(Self {
            modifiers,
            key,
            key_name,
        })
    }

    /// Compact symbol form used in menus, e.g. "⇧⌘C"
    pub fn symbols(&self) -> String {
        let mut out = String::new();
        // Apple's canonical order: Control, Option, Shift, Command
        if self.modifiers.ctrl {
            out.push('⌃');
        }
        if self.modifiers.alt {
            out.push('⌥');
        }
        if self.modifiers.shift {
            out.push('⇧');
        }
        if self.modifiers.meta {
            out.push('⌘');
        }
        out.push_str(&self.key_name);
        out
    }
}

impl std::fmt::Display for Shortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.modifiers;
        for (held, name) in [
            (m.meta, "CMD"),
            (m.ctrl, "CTRL"),
            (m.alt, "ALT"),
            (m.shift, "SHIFT"),
        ] {
            if held {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key_name)
    }
}

impl std::str::FromStr for Shortcut {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Create the hotkey listener for the configured shortcut
///
/// `synthetic` is the marker capture sets while posting its copy shortcut.
pub fn create_listener(
    config: &HotkeyConfig,
    synthetic: SyntheticKeys,
) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    let shortcut = Shortcut::parse(&config.shortcut)?;
    Ok(Box::new(rdev_listener::RdevListener::new(shortcut, synthetic)))
}

/// Parse a non-modifier key name to an rdev Key
fn parse_key_name(name: &str) -> Option<Key> {
    let key = match name {
        "A" => Key::KeyA,
        "B" => Key::KeyB,
        "C" => Key::KeyC,
        "D" => Key::KeyD,
        "E" => Key::KeyE,
        "F" => Key::KeyF,
        "G" => Key::KeyG,
        "H" => Key::KeyH,
        "I" => Key::KeyI,
        "J" => Key::KeyJ,
        "K" => Key::KeyK,
        "L" => Key::KeyL,
        "M" => Key::KeyM,
        "N" => Key::KeyN,
        "O" => Key::KeyO,
        "P" => Key::KeyP,
        "Q" => Key::KeyQ,
        "R" => Key::KeyR,
        "S" => Key::KeyS,
        "T" => Key::KeyT,
        "U" => Key::KeyU,
        "V" => Key::KeyV,
        "W" => Key::KeyW,
        "X" => Key::KeyX,
        "Y" => Key::KeyY,
        "Z" => Key::KeyZ,

        "0" => Key::Num0,
        "1" => Key::Num1,
        "2" => Key::Num2,
        "3" => Key::Num3,
        "4" => Key::Num4,
        "5" => Key::Num5,
        "6" => Key::Num6,
        "7" => Key::Num7,
        "8" => Key::Num8,
        "9" => Key::Num9,

        "F1" => Key::F1,
        "F2" => Key::F2,
        "F3" => Key::F3,
        "F4" => Key::F4,
        "F5" => Key::F5,
        "F6" => Key::F6,
        "F7" => Key::F7,
        "F8" => Key::F8,
        "F9" => Key::F9,
        "F10" => Key::F10,
        "F11" => Key::F11,
        "F12" => Key::F12,

        "SPACE" => Key::Space,
        "ENTER" | "RETURN" => Key::Return,
        "TAB" => Key::Tab,
        "ESC" | "ESCAPE" => Key::Escape,
        "INSERT" => Key::Insert,
        "DELETE" => Key::Delete,
        "HOME" => Key::Home,
        "END" => Key::End,
        "PAGEUP" => Key::PageUp,
        "PAGEDOWN" => Key::PageDown,
        "UP" => Key::UpArrow,
        "DOWN" => Key::DownArrow,
        "LEFT" => Key::LeftArrow,
        "RIGHT" => Key::RightArrow,

        _ => return None,
    };
    Some(key)
}
