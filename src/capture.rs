//! Selection capture
//!
//! Copies the current selection by synthesizing the copy shortcut, then
//! waits for the clipboard to change. There is no completion signal for a
//! synthesized copy, so readiness is detected by polling the clipboard
//! stamp a bounded number of times with a little jitter. If the stamp
//! never moves (nothing selected, the app ignored the shortcut, or the
//! selection equals the old clipboard) the current clipboard text is used
//! as a best effort and may be stale.
//!
//! While the copy shortcut is posted, [`SyntheticKeys`] is marked so the
//! global shortcut listener can tell those events from the user's.

use crate::clipboard::Clipboard;
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::keystroke::{KeystrokeSimulator, SyntheticKeys};
use std::sync::Arc;
use std::time::Duration;

/// Text read from the clipboard for rephrasing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub text: String,
    /// Whether the clipboard was seen changing after the copy keystroke
    pub confirmed: bool,
}

/// Captures the current selection through the clipboard
pub struct SelectionCapture {
    clipboard: Arc<dyn Clipboard>,
    keystroke: Arc<dyn KeystrokeSimulator>,
    synthetic: SyntheticKeys,
    poll_interval: Duration,
    max_attempts: u32,
    jitter_ms: u64,
}

impl SelectionCapture {
    pub fn new(
        clipboard: Arc<dyn Clipboard>,
        keystroke: Arc<dyn KeystrokeSimulator>,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            clipboard,
            keystroke,
            synthetic: SyntheticKeys::default(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_attempts.max(1),
            jitter_ms: config.jitter_ms,
        }
    }

    /// Marker set while the copy shortcut is being posted
    pub fn synthetic_keys(&self) -> &SyntheticKeys {
        &self.synthetic
    }

    /// Simulate a copy and read the resulting clipboard text
    pub async fn capture(&self) -> Result<Captured, CaptureError> {
        let before = self.clipboard.stamp().await?;

        {
            let _posting = self.synthetic.begin();
            self.keystroke.simulate_copy().await?;
        }

        let mut confirmed = false;
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.poll_interval + jitter(self.jitter_ms)).await;

            if self.clipboard.stamp().await? != before {
                tracing::debug!("Clipboard changed after {} poll(s)", attempt);
                confirmed = true;
                break;
            }
        }

        if !confirmed {
            tracing::warn!(
                "Clipboard did not change after {} polls; using current contents (may be stale)",
                self.max_attempts
            );
        }

        let text = self.read_non_blank().await?;
        Ok(Captured { text, confirmed })
    }

    /// Read whatever is on the clipboard without copying first
    pub async fn read_existing(&self) -> Result<Captured, CaptureError> {
        let text = self.read_non_blank().await?;
        Ok(Captured {
            text,
            confirmed: true,
        })
    }

    async fn read_non_blank(&self) -> Result<String, CaptureError> {
        match self.clipboard.read_text().await? {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(CaptureError::NoSelection),
        }
    }
}

/// Pseudo-random delay in `[0, max_ms)`
fn jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;

    Duration::from_millis(nanos % max_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClipboardError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedClipboard {
        content: Mutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl Clipboard for ScriptedClipboard {
        async fn read_text(&self) -> Result<Option<String>, ClipboardError> {
            Ok(self.content.lock().unwrap().clone())
        }

        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            *self.content.lock().unwrap() = Some(text.to_string());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    struct CopyInto {
        clipboard: Arc<ScriptedClipboard>,
        selection: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl KeystrokeSimulator for CopyInto {
        async fn simulate_copy(&self) -> Result<(), CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref selection) = self.selection {
                *self.clipboard.content.lock().unwrap() = Some(selection.clone());
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "copy-into"
        }
    }

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            poll_interval_ms: 1,
            max_attempts: 3,
            jitter_ms: 0,
        }
    }

    fn setup(initial: Option<&str>, selection: Option<&str>) -> (SelectionCapture, Arc<CopyInto>) {
        let clipboard = Arc::new(ScriptedClipboard {
            content: Mutex::new(initial.map(str::to_string)),
        });
        let keystroke = Arc::new(CopyInto {
            clipboard: clipboard.clone(),
            selection: selection.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        let capture = SelectionCapture::new(clipboard, keystroke.clone(), &fast_config());
        (capture, keystroke)
    }

    #[tokio::test]
    async fn test_capture_confirms_changed_clipboard() {
        let (capture, keystroke) = setup(Some("old"), Some("selected text"));
        let captured = capture.capture().await.unwrap();

        assert_eq!(captured.text, "selected text");
        assert!(captured.confirmed);
        assert_eq!(keystroke.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capture_falls_back_to_stale_content() {
        let (capture, _) = setup(Some("already here"), None);
        let captured = capture.capture().await.unwrap();

        assert_eq!(captured.text, "already here");
        assert!(!captured.confirmed);
    }

    #[tokio::test]
    async fn test_capture_empty_clipboard_is_no_selection() {
        let (capture, _) = setup(None, None);
        assert!(matches!(
            capture.capture().await,
            Err(CaptureError::NoSelection)
        ));
    }

    #[tokio::test]
    async fn test_capture_whitespace_is_no_selection() {
        let (capture, _) = setup(Some("x"), Some("   \n"));
        assert!(matches!(
            capture.capture().await,
            Err(CaptureError::NoSelection)
        ));
    }

    #[tokio::test]
    async fn test_read_existing_skips_keystroke() {
        let (capture, keystroke) = setup(Some("on the clipboard"), Some("never copied"));
        let captured = capture.read_existing().await.unwrap();

        assert_eq!(captured.text, "on the clipboard");
        assert_eq!(keystroke.calls.load(Ordering::SeqCst), 0);
    }

    /// Records whether the synthetic marker was set while copying
    #[derive(Default)]
    struct WatchMarker {
        keys: Mutex<Option<SyntheticKeys>>,
        marked: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl KeystrokeSimulator for WatchMarker {
        async fn simulate_copy(&self) -> Result<(), CaptureError> {
            if let Some(ref keys) = *self.keys.lock().unwrap() {
                self.marked
                    .store(keys.active(std::time::Instant::now()), Ordering::SeqCst);
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "watch-marker"
        }
    }

    #[tokio::test]
    async fn test_copy_keystroke_is_marked_synthetic() {
        let clipboard = Arc::new(ScriptedClipboard {
            content: Mutex::new(Some("text".to_string())),
        });
        let keystroke = Arc::new(WatchMarker::default());
        let capture = SelectionCapture::new(clipboard, keystroke.clone(), &fast_config());
        *keystroke.keys.lock().unwrap() = Some(capture.synthetic_keys().clone());

        capture.capture().await.unwrap();

        assert!(keystroke.marked.load(Ordering::SeqCst));
        let later = std::time::Instant::now() + Duration::from_secs(1);
        assert!(!capture.synthetic_keys().active(later));
    }

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(jitter(0), Duration::ZERO);
        for _ in 0..20 {
            assert!(jitter(5) < Duration::from_millis(5));
        }
    }
}
