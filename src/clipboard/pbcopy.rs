//! macOS clipboard via pbcopy / pbpaste
//!
//! Uses the native macOS commands for clipboard access. pbcopy replaces
//! the whole pasteboard, so a write is also a clear.

use super::{payload_from_bytes, Clipboard};
use crate::error::ClipboardError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// macOS clipboard using pbcopy / pbpaste
#[derive(Debug, Default)]
pub struct PbcopyClipboard;

impl PbcopyClipboard {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Clipboard for PbcopyClipboard {
    async fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        let output = Command::new("pbpaste")
            .args(["-Prefer", "txt"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipboardError::ToolNotFound("pbpaste")
                } else {
                    ClipboardError::ReadFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(ClipboardError::ReadFailed(
                "pbpaste exited with error".to_string(),
            ));
        }

        Ok(payload_from_bytes(output.stdout))
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        // Spawn pbcopy with stdin pipe
        let mut child = Command::new("pbcopy")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipboardError::ToolNotFound("pbcopy")
                } else {
                    ClipboardError::WriteFailed(e.to_string())
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ClipboardError::WriteFailed(e.to_string()))?;

            // Close stdin to signal EOF
            drop(stdin);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ClipboardError::WriteFailed(e.to_string()))?;

        if !status.success() {
            return Err(ClipboardError::WriteFailed(
                "pbcopy exited with error".to_string(),
            ));
        }

        tracing::debug!("Clipboard replaced via pbcopy ({} chars)", text.chars().count());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clipboard (pbcopy)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(PbcopyClipboard::new().name(), "clipboard (pbcopy)");
    }
}
