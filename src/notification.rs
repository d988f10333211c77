//! Platform-specific desktop notifications
//!
//! - Linux: notify-send (libnotify)
//! - macOS: terminal-notifier, falling back to osascript (AppleScript)
//!
//! Notifications are best-effort. Delivery failures are logged at debug
//! level and never reach the caller.

use crate::config::NotificationConfig;
use std::process::Stdio;
use tokio::process::Command;

/// Trait for notification sinks
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Show a notification with the given title and message
    async fn notify(&self, title: &str, message: &str);
}

/// Desktop notifications through the platform's notification tool
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, message: &str) {
        if !self.enabled {
            tracing::debug!("Notification suppressed: {}: {}", title, message);
            return;
        }
        send(title, message).await;
    }
}

/// Send a desktop notification with the given title and body
pub async fn send(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    send_linux(title, body).await;

    #[cfg(target_os = "macos")]
    send_macos(title, body).await;

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        tracing::debug!("Notifications not supported on this platform");
        let _ = (title, body);
    }
}

#[cfg(target_os = "linux")]
async fn send_linux(title: &str, body: &str) {
    let result = Command::new("notify-send")
        .args(["--app-name=ClipAI", "--expire-time=3000", title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

#[cfg(target_os = "macos")]
async fn send_macos(title: &str, body: &str) {
    let result = Command::new("terminal-notifier")
        .args(["-title", title, "-message", body, "-group", "clipai"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if matches!(result, Ok(status) if status.success()) {
        return;
    }

    let result = Command::new("osascript")
        .args(["-e", &applescript(title, body)])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

/// Send a notification synchronously (blocking)
///
/// Used before the runtime is up, e.g. for startup warnings.
pub fn send_sync(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    {
        let _ = std::process::Command::new("notify-send")
            .args(["--app-name=ClipAI", "--expire-time=5000", title, body])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
    }

    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("osascript")
            .args(["-e", &applescript(title, body)])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = (title, body);
    }
}

/// `display notification` script with both strings escaped
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript(title: &str, body: &str) -> String {
    format!(
        r#"display notification "{}" with title "{}""#,
        escape(body),
        escape(title)
    )
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applescript_escaping() {
        let script = applescript(r#"Rephrasing "Failed""#, r"C:\path");
        assert_eq!(
            script,
            r#"display notification "C:\\path" with title "Rephrasing \"Failed\"""#
        );
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_silent() {
        let notifier = DesktopNotifier::new(&NotificationConfig { enabled: false });
        notifier.notify("Rephrasing...", "Processing your text").await;
    }
}
