//! Synthesized copy keystroke
//!
//! Posts the platform's "copy" shortcut to the focused application so the
//! current selection lands on the clipboard.
//!
//! - macOS: Cmd+C via CGEvent (requires Accessibility permission)
//! - Linux: Ctrl+C via ydotool (requires the ydotoold daemon)

#[cfg(target_os = "macos")]
pub mod cgevent;
#[cfg(not(target_os = "macos"))]
pub mod ydotool;

use crate::error::CaptureError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How long after posting the copy shortcut its events may still arrive at
/// the global event tap
const SETTLE: Duration = Duration::from_millis(100);

/// Trait for copy keystroke implementations
#[async_trait::async_trait]
pub trait KeystrokeSimulator: Send + Sync {
    /// Send the copy shortcut to the focused application
    async fn simulate_copy(&self) -> Result<(), CaptureError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Marks when our own copy shortcut is being posted
///
/// The global shortcut listener sees synthesized events exactly like
/// physical ones. It consults this marker so that the Cmd+C (or Ctrl+C)
/// posted during capture neither fires the shortcut again nor clears a
/// modifier the user is still holding.
#[derive(Debug, Clone, Default)]
pub struct SyntheticKeys {
    window: Arc<Mutex<Window>>,
}

#[derive(Debug, Default)]
struct Window {
    posting: usize,
    settle_until: Option<Instant>,
}

impl SyntheticKeys {
    /// Mark keystrokes as ours until the returned guard is dropped, plus a
    /// short settle period
    pub fn begin(&self) -> Posting<'_> {
        self.lock().posting += 1;
        Posting { keys: self }
    }

    /// Whether key events seen at `now` may be ours
    pub fn active(&self, now: Instant) -> bool {
        let window = self.lock();
        window.posting > 0 || window.settle_until.is_some_and(|until| now < until)
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Guard returned by [`SyntheticKeys::begin`]
#[must_use]
pub struct Posting<'a> {
    keys: &'a SyntheticKeys,
}

impl Drop for Posting<'_> {
    fn drop(&mut self) {
        let mut window = self.keys.lock();
        window.posting = window.posting.saturating_sub(1);
        window.settle_until = Some(Instant::now() + SETTLE);
    }
}

/// Factory function returning the keystroke simulator for this platform
pub fn create_simulator() -> Box<dyn KeystrokeSimulator> {
    #[cfg(target_os = "macos")]
    {
        Box::new(cgevent::CGEventCopy::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Box::new(ydotool::YdotoolCopy::new())
    }
}

/// Ask the OS for input-simulation permission, once, at startup
///
/// Only macOS gates synthesized events behind a permission prompt.
pub fn request_permission() -> bool {
    #[cfg(target_os = "macos")]
    {
        cgevent::request_accessibility_permission()
    }

    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}
