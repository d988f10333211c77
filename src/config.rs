//! Configuration loading and types for clipai
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/clipai/config.toml)
//! 3. Environment variables (CLIPAI_*)
//! 4. CLI arguments (highest priority)
//!
//! The selected tone is not part of this file. It lives in the preferences
//! store so the menu can change it without rewriting user-edited config.

use crate::error::ClipaiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# ClipAI Configuration
#
# Location: ~/.config/clipai/config.toml
# All settings can be overridden via CLI flags

[hotkey]
# Global shortcut that copies the selection and rephrases it.
# Modifiers: CMD, SHIFT, CTRL, ALT (OPTION). Key: a letter, digit or F1-F12.
# Bound once at startup; restart clipai after changing it.
# Default: CMD+SHIFT+C on macOS, CTRL+SHIFT+C elsewhere
# shortcut = "CMD+SHIFT+C"

[capture]
# After the copy keystroke, the clipboard is polled until its contents
# change. Each poll waits poll_interval_ms plus a random 0..jitter_ms.
# If nothing changed after max_attempts polls, the current clipboard
# contents are used anyway (they may be stale).
poll_interval_ms = 50
max_attempts = 8
jitter_ms = 20

[gemini]
# Generative Language API endpoint and model
endpoint = "https://generativelanguage.googleapis.com"
model = "gemini-2.0-flash"

# Name of the environment variable holding the API key.
# The key is read each time a request is made, never at startup.
api_key_env = "GEMINI_API_KEY"

# Sampling parameters
temperature = 1.0
top_p = 0.95
top_k = 40
max_output_tokens = 8192

# Request timeout in seconds
timeout_secs = 30

[guard]
# Extra phrases that mark clipboard text as one of our own error messages.
# Matching is case-insensitive and by substring.
# denylist = ["something went wrong"]

[notification]
# Show desktop notifications while rephrasing
enabled = true

[feedback]
# Play a short tone when there is nothing to rephrase or a request fails
enabled = true
volume = 0.7
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub hotkey: HotkeyConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub notification: NotificationConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,
}

/// Global shortcut configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Shortcut string, e.g. "CMD+SHIFT+C"
    #[serde(default = "default_shortcut")]
    pub shortcut: String,

    /// Enable built-in hotkey detection (default: true)
    /// When disabled, use the menu or `clipai trigger` instead
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_shortcut() -> String {
    if cfg!(target_os = "macos") {
        "CMD+SHIFT+C".to_string()
    } else {
        "CTRL+SHIFT+C".to_string()
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            shortcut: default_shortcut(),
            enabled: true,
        }
    }
}

/// Selection capture timing
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CaptureConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_jitter")]
    pub jitter_ms: u64,
}

fn default_poll_interval() -> u64 {
    50
}

fn default_max_attempts() -> u32 {
    8
}

fn default_jitter() -> u64 {
    20
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            jitter_ms: default_jitter(),
        }
    }
}

/// Rephrasing service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable that holds the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Error-loop guard configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GuardConfig {
    /// Additional denylisted phrases (case-insensitive substrings)
    #[serde(default)]
    pub denylist: Vec<String>,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Audible cue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Volume level (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    0.7
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "clipai")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the preferences file path
    pub fn preferences_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("preferences.toml")
    }

    /// Get the runtime directory for ephemeral files (state, pid, locks)
    pub fn runtime_dir() -> PathBuf {
        // XDG_RUNTIME_DIR on Linux; macOS has none, so use the temp dir
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("clipai")
    }

    /// Path of the state file read by the menu bar
    pub fn state_file() -> PathBuf {
        Self::runtime_dir().join("state")
    }

    /// Path of the PID file used by `clipai trigger`
    pub fn pid_file() -> PathBuf {
        Self::runtime_dir().join("pid")
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, ClipaiError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ClipaiError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| ClipaiError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    Ok(config)
}

/// Override config values from environment variables
fn apply_env_overrides(config: &mut Config, get: impl Fn(&str) -> Option<String>) {
    if let Some(shortcut) = get("CLIPAI_HOTKEY") {
        config.hotkey.shortcut = shortcut;
    }
    if let Some(model) = get("CLIPAI_MODEL") {
        config.gemini.model = model;
    }
    if let Some(endpoint) = get("CLIPAI_ENDPOINT") {
        config.gemini.endpoint = endpoint;
    }
}

/// Write the documented default config if no config file exists yet
pub fn write_default_config(path: &Path) -> Result<bool, ClipaiError> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ClipaiError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| ClipaiError::Config(format!("Failed to write config: {}", e)))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.hotkey.enabled);
        assert_eq!(config.capture.max_attempts, 8);
        assert_eq!(config.gemini.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.gemini.top_k, 40);
        assert_eq!(config.gemini.max_output_tokens, 8192);
        assert!(config.notification.enabled);
        assert!(config.guard.denylist.is_empty());
    }

    #[test]
    fn test_default_config_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.hotkey.shortcut, default_shortcut());
        assert_eq!(config.capture, CaptureConfig::default());
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.gemini.top_p, 0.95);
        assert_eq!(config.feedback.volume, 0.7);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [gemini]
            model = "gemini-1.5-pro"
            timeout_secs = 10

            [guard]
            denylist = ["Oops"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert_eq!(config.gemini.timeout_secs, 10);
        assert_eq!(config.gemini.temperature, 1.0); // default
        assert_eq!(config.guard.denylist, vec!["Oops"]);
        assert!(config.feedback.enabled); // default
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CLIPAI_HOTKEY", "CTRL+ALT+R"),
            ("CLIPAI_ENDPOINT", "http://127.0.0.1:9999"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.hotkey.shortcut, "CTRL+ALT+R");
        assert_eq!(config.gemini.endpoint, "http://127.0.0.1:9999");
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config.capture.poll_interval_ms, 50);
    }

    #[test]
    fn test_load_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gemini\nmodel = ").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn test_write_default_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipai/config.toml");

        assert!(write_default_config(&path).unwrap());
        assert!(!write_default_config(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}
