//! Linux copy keystroke via ydotool
//!
//! Requires:
//! - ydotool installed
//! - ydotoold daemon running (systemctl --user start ydotool)

use super::KeystrokeSimulator;
use crate::error::CaptureError;
use std::process::Stdio;
use tokio::process::Command;

// Linux input event codes: 29 = KEY_LEFTCTRL, 46 = KEY_C,
// 42/54 = shifts, 56/100 = alts, 125/126 = metas
// Format: key_code:1 (press) then key_code:0 (release)
//
// Shift, Alt and Meta are released first so a shortcut still held by the
// user does not turn this into Ctrl+Shift+C.
const CTRL_C_SEQUENCE: [&str; 10] = [
    "42:0", "54:0", "56:0", "100:0", "125:0", "126:0", "29:1", "46:1", "46:0", "29:0",
];

/// Ctrl+C via ydotool
#[derive(Debug, Default)]
pub struct YdotoolCopy;

impl YdotoolCopy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl KeystrokeSimulator for YdotoolCopy {
    async fn simulate_copy(&self) -> Result<(), CaptureError> {
        let output = Command::new("ydotool")
            .arg("key")
            .args(CTRL_C_SEQUENCE)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CaptureError::Keystroke(
                        "ydotool not found in PATH. Install via your package manager.".into(),
                    )
                } else {
                    CaptureError::Keystroke(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon")
            {
                return Err(CaptureError::Keystroke(
                    "ydotool daemon not running.\n  Start with: systemctl --user start ydotool"
                        .into(),
                ));
            }

            return Err(CaptureError::Keystroke(stderr.trim().to_string()));
        }

        tracing::trace!("Sent Ctrl+C via ydotool");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ydotool"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_releases_ctrl_last() {
        assert_eq!(CTRL_C_SEQUENCE[CTRL_C_SEQUENCE.len() - 4..], ["29:1", "46:1", "46:0", "29:0"]);
        assert_eq!(CTRL_C_SEQUENCE.last(), Some(&"29:0"));
    }

    #[test]
    fn test_other_modifiers_released_before_ctrl() {
        let ctrl_down = CTRL_C_SEQUENCE.iter().position(|k| *k == "29:1").unwrap();
        for shift in ["42:0", "54:0"] {
            let at = CTRL_C_SEQUENCE.iter().position(|k| *k == shift).unwrap();
            assert!(at < ctrl_down);
        }
        assert!(CTRL_C_SEQUENCE[..ctrl_down].iter().all(|k| k.ends_with(":0")));
    }
}
