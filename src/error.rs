//! Error types for clipai
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the clipai application
#[derive(Error, Debug)]
pub enum ClipaiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Rephrase error: {0}")]
    Rephrase(#[from] RephraseError),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to global shortcut registration
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Unknown key name: '{0}'. Use a letter, digit, or F1-F12 (e.g. CMD+SHIFT+C).")]
    UnknownKey(String),

    #[error("Invalid shortcut '{0}': {1}")]
    InvalidShortcut(String, String),

    #[error("Global hotkey capture failed: {0}")]
    Listen(String),
}

/// Errors related to reading or writing the system clipboard
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("{0} not found in PATH. Install it via your package manager.")]
    ToolNotFound(&'static str),

    #[error("Clipboard read failed: {0}")]
    ReadFailed(String),

    #[error("Clipboard write failed: {0}")]
    WriteFailed(String),
}

/// Errors that end the capture stage of an invocation
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No text selected (clipboard is empty or holds no text)")]
    NoSelection,

    #[error("Copy keystroke simulation failed: {0}")]
    Keystroke(String),

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// Errors returned by the rephrasing service client
///
/// Transport, authentication, quota and malformed-response failures are
/// collapsed into `Service`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RephraseError {
    #[error("Missing API key: set the {0} environment variable")]
    MissingCredential(String),

    #[error("No response received from the rephrasing service")]
    EmptyResponse,

    #[error("Rephrase request failed: {0}")]
    Service(String),
}

/// Result type alias using ClipaiError
pub type Result<T> = std::result::Result<T, ClipaiError>;
