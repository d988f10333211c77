//! Persisted user preferences
//!
//! Holds the single user-facing preference, the rephrasing tone. It is
//! stored in `preferences.toml` next to the config file and survives
//! restarts. A missing file, a missing key, or an unrecognized value all
//! resolve to the default tone.

use crate::error::ClipaiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Writing tone requested from the rephrasing service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Concise,
    Formal,
    Casual,
}

impl Tone {
    /// All tones, in menu order
    pub const ALL: [Tone; 5] = [
        Tone::Professional,
        Tone::Friendly,
        Tone::Concise,
        Tone::Formal,
        Tone::Casual,
    ];

    /// Lowercase name, as embedded in prompts and stored on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Concise => "concise",
            Tone::Formal => "formal",
            Tone::Casual => "casual",
        }
    }

    /// Capitalized name for menus and CLI output
    pub fn label(&self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Friendly => "Friendly",
            Tone::Concise => "Concise",
            Tone::Formal => "Formal",
            Tone::Casual => "Casual",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown tone '{}' (expected one of: {})",
                    s,
                    Tone::ALL.map(|t| t.as_str()).join(", ")
                )
            })
    }
}

/// On-disk layout of the preferences file
///
/// The tone is read as a plain string so a hand-edited typo degrades to
/// the default instead of failing the whole load.
#[derive(Debug, Default, Deserialize, Serialize)]
struct PreferencesFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tone: Option<String>,
}

/// Durable key-value store for user preferences
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
    tone: Tone,
}

impl PreferencesStore {
    /// Load preferences from `path`, falling back to defaults
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ClipaiError> {
        let path = path.into();

        let tone = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                ClipaiError::Config(format!("Failed to read preferences: {}", e))
            })?;
            let file: PreferencesFile = toml::from_str(&contents).map_err(|e| {
                ClipaiError::Config(format!("Invalid preferences file: {}", e))
            })?;

            match file.tone.as_deref().map(Tone::from_str) {
                Some(Ok(tone)) => tone,
                Some(Err(e)) => {
                    tracing::warn!("Ignoring stored tone: {}", e);
                    Tone::default()
                }
                None => Tone::default(),
            }
        } else {
            tracing::debug!("No preferences at {:?}, using defaults", path);
            Tone::default()
        };

        Ok(Self { path, tone })
    }

    /// Currently selected tone
    pub fn tone(&self) -> Tone {
        self.tone
    }

    /// Select a tone and persist it immediately
    ///
    /// The in-memory tone only changes once the file is written.
    pub fn set_tone(&mut self, tone: Tone) -> Result<(), ClipaiError> {
        self.save(tone)?;
        self.tone = tone;
        tracing::info!("Tone set to {}", tone);
        Ok(())
    }

    /// Use `tone` for this process without touching the file
    pub fn override_tone(&mut self, tone: Tone) {
        tracing::debug!("Tone overridden to {} for this session", tone);
        self.tone = tone;
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, tone: Tone) -> Result<(), ClipaiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClipaiError::Config(format!("Failed to create preferences dir: {}", e))
            })?;
        }

        let file = PreferencesFile {
            tone: Some(tone.as_str().to_string()),
        };
        let contents = toml::to_string_pretty(&file).map_err(|e| {
            ClipaiError::Config(format!("Failed to serialize preferences: {}", e))
        })?;

        std::fs::write(&self.path, contents)
            .map_err(|e| ClipaiError::Config(format!("Failed to write preferences: {}", e)))
    }
}
