//! rdev-based global shortcut listener
//!
//! rdev delivers raw key presses and releases from a process-wide event
//! tap. Held modifiers are tracked from those events, and the shortcut
//! fires when its key goes down while exactly the required modifiers are
//! held. Auto-repeat and bounce within 100 ms are ignored.
//!
//! The tap also sees the copy shortcut clipai posts during capture. While
//! [`SyntheticKeys`] is marked, presses are taken as ours and never fire;
//! releases pair off against them, and only an unpaired release changes
//! the held state.
//!
//! If the event tap cannot be installed (on macOS: Accessibility permission
//! missing) the failure is logged and the process keeps running, so the
//! menu and `clipai trigger` still work.

use super::{HotkeyEvent, HotkeyListener, Modifiers, Shortcut};
use crate::error::HotkeyError;
use crate::keystroke::SyntheticKeys;
use rdev::{listen, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Tracks modifier state and decides when the shortcut fires
#[derive(Debug)]
pub(crate) struct ShortcutMatcher {
    shortcut: Shortcut,
    synthetic: SyntheticKeys,
    held: Vec<Key>,
    /// Keys pressed while our own copy shortcut was being posted
    echoes: Vec<Key>,
    key_down: bool,
    last_fired: Option<Instant>,
}

impl ShortcutMatcher {
    pub(crate) fn new(shortcut: Shortcut, synthetic: SyntheticKeys) -> Self {
        Self {
            shortcut,
            synthetic,
            held: Vec::new(),
            echoes: Vec::new(),
            key_down: false,
            last_fired: None,
        }
    }

    fn modifiers(&self) -> Modifiers {
        let held = |keys: &[Key]| keys.iter().any(|k| self.held.contains(k));
        Modifiers {
            meta: held(&[Key::MetaLeft, Key::MetaRight]),
            shift: held(&[Key::ShiftLeft, Key::ShiftRight]),
            ctrl: held(&[Key::ControlLeft, Key::ControlRight]),
            alt: held(&[Key::Alt, Key::AltGr]),
        }
    }

    /// Feed one key event; returns true when the shortcut fires
    pub(crate) fn handle(&mut self, event: &EventType, now: Instant) -> bool {
        let (key, pressed) = match *event {
            EventType::KeyPress(key) => (key, true),
            EventType::KeyRelease(key) => (key, false),
            _ => return false,
        };

        if self.synthetic.active(now) {
            self.absorb(key, pressed);
            return false;
        }
        self.echoes.clear();

        match (key, pressed) {
            (key, true) if is_modifier(key) => {
                if !self.held.contains(&key) {
                    self.held.push(key);
                }
                false
            }
            (key, false) if is_modifier(key) => {
                self.held.retain(|k| *k != key);
                false
            }
            (key, true) if key == self.shortcut.key => {
                // Auto-repeat delivers presses without releases
                if self.key_down {
                    return false;
                }
                self.key_down = true;

                if self.modifiers() != self.shortcut.modifiers {
                    return false;
                }
                if let Some(last) = self.last_fired {
                    if now.duration_since(last) < DEBOUNCE {
                        return false;
                    }
                }

                self.last_fired = Some(now);
                true
            }
            (key, false) if key == self.shortcut.key => {
                self.key_down = false;
                false
            }
            _ => false,
        }
    }

    fn absorb(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.echoes.push(key);
        } else if let Some(i) = self.echoes.iter().position(|k| *k == key) {
            self.echoes.swap_remove(i);
        } else if is_modifier(key) {
            self.held.retain(|k| *k != key);
        } else if key == self.shortcut.key {
            self.key_down = false;
        }
    }
}

fn is_modifier(key: Key) -> bool {
    matches!(
        key,
        Key::MetaLeft
            | Key::MetaRight
            | Key::ShiftLeft
            | Key::ShiftRight
            | Key::ControlLeft
            | Key::ControlRight
            | Key::Alt
            | Key::AltGr
    )
}

/// Global shortcut listener running rdev on a background thread
pub struct RdevListener {
    shortcut: Shortcut,
    synthetic: SyntheticKeys,
    running: Arc<AtomicBool>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl RdevListener {
    pub fn new(shortcut: Shortcut, synthetic: SyntheticKeys) -> Self {
        Self {
            shortcut,
            synthetic,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

impl HotkeyListener for RdevListener {
    fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError> {
        if self.thread_handle.is_some() {
            return Err(HotkeyError::Listen("listener already started".into()));
        }

        let (tx, rx) = mpsc::channel(32);
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        let shortcut = self.shortcut.clone();
        let synthetic = self.synthetic.clone();
        tracing::info!("Listening for {} ({})", shortcut, shortcut.symbols());

        let thread_handle = std::thread::Builder::new()
            .name("clipai-hotkey".into())
            .spawn(move || {
                let mut matcher = ShortcutMatcher::new(shortcut, synthetic);

                let callback = move |event: Event| {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }

                    if matcher.handle(&event.event_type, Instant::now()) {
                        tracing::debug!("Shortcut pressed");
                        if tx.try_send(HotkeyEvent::Triggered).is_err() {
                            tracing::debug!("Hotkey channel full or closed, dropping event");
                        }
                    }
                };

                // Blocks until the event tap fails or the process exits
                if let Err(e) = listen(callback) {
                    tracing::error!("rdev listen error: {:?}", e);
                    tracing::warn!(
                        "Global shortcut unavailable. On macOS grant Accessibility permission in \
                         System Settings > Privacy & Security > Accessibility, then restart clipai. \
                         The menu and 'clipai trigger' still work."
                    );
                }
            })
            .map_err(|e| HotkeyError::Listen(e.to_string()))?;

        self.thread_handle = Some(thread_handle);
        Ok(rx)
    }

    fn stop(&mut self) -> Result<(), HotkeyError> {
        // rdev's listen() cannot be interrupted; the thread goes quiet and
        // ends with the process
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> ShortcutMatcher {
        matcher_with(SyntheticKeys::default())
    }

    fn matcher_with(synthetic: SyntheticKeys) -> ShortcutMatcher {
        ShortcutMatcher::new(Shortcut::parse("CMD+SHIFT+C").unwrap(), synthetic)
    }

    fn press(m: &mut ShortcutMatcher, key: Key, at: Instant) -> bool {
        m.handle(&EventType::KeyPress(key), at)
    }

    fn release(m: &mut ShortcutMatcher, key: Key, at: Instant) -> bool {
        m.handle(&EventType::KeyRelease(key), at)
    }

    #[test]
    fn test_fires_with_exact_modifiers() {
        let mut m = matcher();
        let t = Instant::now();
        assert!(!press(&mut m, Key::MetaLeft, t));
        assert!(!press(&mut m, Key::ShiftRight, t));
        assert!(press(&mut m, Key::KeyC, t));
    }

    #[test]
    fn test_ignores_plain_copy_and_extra_modifiers() {
        let mut m = matcher();
        let t = Instant::now();
        press(&mut m, Key::MetaLeft, t);
        assert!(!press(&mut m, Key::KeyC, t));
        release(&mut m, Key::KeyC, t);

        press(&mut m, Key::ShiftLeft, t);
        press(&mut m, Key::Alt, t);
        assert!(!press(&mut m, Key::KeyC, t));
    }

    #[test]
    fn test_autorepeat_fires_once() {
        let mut m = matcher();
        let t = Instant::now();
        press(&mut m, Key::MetaLeft, t);
        press(&mut m, Key::ShiftLeft, t);
        assert!(press(&mut m, Key::KeyC, t));
        assert!(!press(&mut m, Key::KeyC, t + Duration::from_millis(500)));
    }

    #[test]
    fn test_debounce_then_refire() {
        let mut m = matcher();
        let t = Instant::now();
        press(&mut m, Key::MetaLeft, t);
        press(&mut m, Key::ShiftLeft, t);
        assert!(press(&mut m, Key::KeyC, t));
        release(&mut m, Key::KeyC, t);

        assert!(!press(&mut m, Key::KeyC, t + Duration::from_millis(50)));
        release(&mut m, Key::KeyC, t + Duration::from_millis(60));

        assert!(press(&mut m, Key::KeyC, t + Duration::from_millis(300)));
    }

    #[test]
    fn test_released_modifier_is_forgotten() {
        let mut m = matcher();
        let t = Instant::now();
        press(&mut m, Key::MetaLeft, t);
        press(&mut m, Key::ShiftLeft, t);
        release(&mut m, Key::ShiftLeft, t);
        assert!(!press(&mut m, Key::KeyC, t));
    }

    #[test]
    fn test_posted_copy_neither_fires_nor_drops_held_modifiers() {
        let keys = SyntheticKeys::default();
        let mut m = matcher_with(keys.clone());
        let t = Instant::now();

        press(&mut m, Key::MetaLeft, t);
        press(&mut m, Key::ShiftLeft, t);
        assert!(press(&mut m, Key::KeyC, t));
        release(&mut m, Key::KeyC, t + Duration::from_millis(30));

        // Cmd+C posted by capture while the user still holds Cmd+Shift
        let posting = keys.begin();
        let at = t + Duration::from_millis(150);
        assert!(!press(&mut m, Key::MetaLeft, at));
        assert!(!press(&mut m, Key::KeyC, at));
        assert!(!release(&mut m, Key::KeyC, at));
        assert!(!release(&mut m, Key::MetaLeft, at));
        drop(posting);

        assert!(press(&mut m, Key::KeyC, t + Duration::from_secs(1)));
    }

    #[test]
    fn test_user_release_during_posted_copy_is_kept() {
        let keys = SyntheticKeys::default();
        let mut m = matcher_with(keys.clone());
        let t = Instant::now();

        press(&mut m, Key::MetaLeft, t);
        press(&mut m, Key::ShiftLeft, t);
        assert!(press(&mut m, Key::KeyC, t));

        let posting = keys.begin();
        let at = t + Duration::from_millis(20);
        press(&mut m, Key::MetaLeft, at);
        release(&mut m, Key::KeyC, at);
        release(&mut m, Key::ShiftLeft, at);
        release(&mut m, Key::MetaLeft, at);
        drop(posting);

        // Cmd is still held; Shift was let go by the user
        assert!(!press(&mut m, Key::KeyC, t + Duration::from_secs(1)));
        release(&mut m, Key::KeyC, t + Duration::from_secs(1));
        press(&mut m, Key::ShiftRight, t + Duration::from_secs(2));
        assert!(press(&mut m, Key::KeyC, t + Duration::from_secs(2)));
    }
}
