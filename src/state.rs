//! Daemon activity state
//!
//! Idle → Capturing → Rephrasing → Idle
//!
//! The current state is mirrored to a file in the runtime directory so the
//! menu bar (and scripts) can show progress without talking to the daemon.

use std::path::Path;

/// What the daemon is doing right now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Waiting for a trigger
    #[default]
    Idle,
    /// Copying the selection and reading the clipboard
    Capturing,
    /// Waiting for the rephrasing service
    Rephrasing,
}

impl State {
    /// Name written to the state file
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Capturing => "capturing",
            State::Rephrasing => "rephrasing",
        }
    }

    /// Parse a state file's contents; unknown values read as idle
    pub fn from_file_contents(contents: &str) -> Self {
        match contents.trim() {
            "capturing" => State::Capturing,
            "rephrasing" => State::Rephrasing,
            _ => State::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }

    /// Read the state published by a running daemon
    pub fn read(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .map(|contents| Self::from_file_contents(&contents))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Capturing => write!(f, "Capturing"),
            State::Rephrasing => write!(f, "Rephrasing"),
        }
    }
}

/// Write state to file for external integrations
pub fn write_state_file(path: &Path, state: State) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    if let Err(e) = std::fs::write(path, state.as_str()) {
        tracing::warn!("Failed to write state file: {}", e);
    } else {
        tracing::trace!("State file updated: {}", state.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert!(State::default().is_idle());
        assert!(!State::Rephrasing.is_idle());
    }

    #[test]
    fn test_file_contents() {
        for state in [State::Idle, State::Capturing, State::Rephrasing] {
            assert_eq!(State::from_file_contents(state.as_str()), state);
        }
        assert_eq!(State::from_file_contents("rephrasing\n"), State::Rephrasing);
        assert_eq!(State::from_file_contents("recording"), State::Idle);
    }

    #[test]
    fn test_write_and_read_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/state");

        assert_eq!(State::read(&path), State::Idle);
        write_state_file(&path, State::Capturing);
        assert_eq!(State::read(&path), State::Capturing);
    }
}
