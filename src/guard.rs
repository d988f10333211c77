//! Error-loop guard
//!
//! Failure notifications put error text in front of the user, and that
//! text can end up selected or copied. Feeding it back into the rephraser
//! would produce another failure, and so on. The guard rejects captured
//! text that is blank, contains a denylisted phrase, or contains a failure
//! message this process has already surfaced.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Phrases produced by clipai's own failure paths (lowercase)
///
/// These are exact prefixes of our messages, not plain English, so that
/// ordinary prose mentioning a failed request still gets through.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "rephrasing failed",
    "no response received from the rephrasing service",
    "missing api key:",
    "gemini_api_key",
    "rephrase request failed:",
    "api returned status",
];

/// Surfaced failure messages kept for matching; the oldest go first
const MAX_SURFACED: usize = 32;

/// Why captured text was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    /// Nothing but whitespace
    Empty,
    /// Looks like one of our own error messages
    ErrorLoop { matched: String },
}

impl std::fmt::Display for GuardRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardRejection::Empty => write!(f, "captured text is empty"),
            GuardRejection::ErrorLoop { matched } => {
                write!(f, "captured text looks like an error message ({:?})", matched)
            }
        }
    }
}

/// Filter applied to captured text before it is sent for rephrasing
#[derive(Debug)]
pub struct Guard {
    denylist: Vec<String>,
    /// Failure messages surfaced by this process (lowercase)
    surfaced: Mutex<VecDeque<String>>,
}

impl Guard {
    /// Create a guard with the built-in denylist plus `extra` phrases
    pub fn new(extra: &[String]) -> Self {
        let denylist = DEFAULT_DENYLIST
            .iter()
            .map(|p| p.to_string())
            .chain(extra.iter().map(|p| p.trim().to_lowercase()))
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            denylist,
            surfaced: Mutex::new(VecDeque::new()),
        }
    }

    /// Accept or reject captured text
    pub fn check(&self, text: &str) -> Result<(), GuardRejection> {
        if text.trim().is_empty() {
            return Err(GuardRejection::Empty);
        }

        let haystack = text.to_lowercase();

        if let Some(phrase) = self.denylist.iter().find(|p| haystack.contains(p.as_str())) {
            return Err(GuardRejection::ErrorLoop {
                matched: phrase.clone(),
            });
        }

        let surfaced = self.surfaced.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(message) = surfaced.iter().find(|m| haystack.contains(m.as_str())) {
            return Err(GuardRejection::ErrorLoop {
                matched: message.clone(),
            });
        }

        Ok(())
    }

    /// Record a failure message shown to the user
    pub fn remember_surfaced(&self, message: &str) {
        let message = message.trim().to_lowercase();
        if message.is_empty() {
            return;
        }

        let mut surfaced = self.surfaced.lock().unwrap_or_else(|e| e.into_inner());
        if surfaced.contains(&message) {
            return;
        }
        if surfaced.len() == MAX_SURFACED {
            surfaced.pop_front();
        }
        surfaced.push_back(message);
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank() {
        let guard = Guard::default();
        assert_eq!(guard.check(""), Err(GuardRejection::Empty));
        assert_eq!(guard.check("  \n\t "), Err(GuardRejection::Empty));
    }

    #[test]
    fn test_accepts_ordinary_text() {
        let guard = Guard::default();
        assert_eq!(guard.check("ill be there at 5"), Ok(()));
    }

    #[test]
    fn test_denylist_is_case_insensitive() {
        let guard = Guard::default();
        let rejection = guard.check("Rephrasing Failed: timeout").unwrap_err();
        assert_eq!(
            rejection,
            GuardRejection::ErrorLoop {
                matched: "rephrasing failed".to_string()
            }
        );
        assert!(guard.check("NO RESPONSE RECEIVED from the rephrasing service").is_err());
    }

    #[test]
    fn test_prose_about_failures_is_accepted() {
        let guard = Guard::default();
        assert_eq!(guard.check("The request failed because the server was down."), Ok(()));
        assert_eq!(guard.check("We got an empty response from the vendor."), Ok(()));
        assert!(guard
            .check("Rephrase request failed: API returned status 503")
            .is_err());
    }

    #[test]
    fn test_extra_phrases() {
        let guard = Guard::new(&["  Something Broke ".to_string(), "   ".to_string()]);
        assert!(guard.check("oh no, something broke again").is_err());
        assert!(guard.check("a perfectly fine sentence").is_ok());
    }

    #[test]
    fn test_remembered_failures_are_rejected() {
        let guard = Guard::default();
        let message = "Server says: quota exhausted for project 42";
        assert!(guard.check(message).is_ok());

        guard.remember_surfaced(message);
        guard.remember_surfaced(message);

        assert!(guard.check(&format!("copied: {}", message.to_uppercase())).is_err());
        assert_eq!(guard.surfaced.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_surfaced_failures_are_capped() {
        let guard = Guard::default();
        for i in 0..MAX_SURFACED + 8 {
            guard.remember_surfaced(&format!("backend error number {}", i));
        }

        assert_eq!(guard.surfaced.lock().unwrap().len(), MAX_SURFACED);
        assert!(guard.check("backend error number 0").is_ok());
        let newest = format!("backend error number {}", MAX_SURFACED + 7);
        assert!(guard.check(&newest).is_err());
    }
}
