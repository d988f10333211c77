//! Wayland clipboard via wl-copy / wl-paste
//!
//! Requires: wl-clipboard package installed

use super::{payload_from_bytes, Clipboard};
use crate::error::ClipboardError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Wayland clipboard using wl-clipboard
#[derive(Debug, Default)]
pub struct WaylandClipboard;

impl WaylandClipboard {
    pub fn new() -> Self {
        Self
    }
}

/// wl-paste exits non-zero when the clipboard is empty or holds no text
/// type; the wording differs between wl-clipboard releases
fn reports_empty(stderr: &str) -> bool {
    ["Nothing is copied", "No selection", "No suitable type"]
        .iter()
        .any(|m| stderr.contains(m))
}

#[async_trait::async_trait]
impl Clipboard for WaylandClipboard {
    async fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        let output = Command::new("wl-paste")
            .args(["--no-newline", "--type", "text/plain"])
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipboardError::ToolNotFound("wl-paste")
                } else {
                    ClipboardError::ReadFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if reports_empty(&stderr) {
                return Ok(None);
            }
            return Err(ClipboardError::ReadFailed(stderr.trim().to_string()));
        }

        Ok(payload_from_bytes(output.stdout))
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new("wl-copy")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipboardError::ToolNotFound("wl-copy")
                } else {
                    ClipboardError::WriteFailed(e.to_string())
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ClipboardError::WriteFailed(e.to_string()))?;
            drop(stdin);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ClipboardError::WriteFailed(e.to_string()))?;

        if !status.success() {
            return Err(ClipboardError::WriteFailed(
                "wl-copy exited with error".to_string(),
            ));
        }

        tracing::debug!("Clipboard replaced via wl-copy ({} chars)", text.chars().count());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clipboard (wl-copy)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_clipboard_messages() {
        assert!(reports_empty("Nothing is copied\n"));
        assert!(reports_empty("No selection"));
        assert!(reports_empty("No suitable type of content copied"));
        assert!(!reports_empty("Failed to connect to a Wayland server"));
    }
}
