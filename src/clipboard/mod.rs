//! System clipboard access
//!
//! - macOS: pbcopy / pbpaste
//! - Linux: wl-copy / wl-paste (Wayland)
//!
//! Neither tool exposes the pasteboard change counter, so changes are
//! detected with a [`ClipboardStamp`], a fingerprint of the current text
//! payload sampled before and after a copy.

#[cfg(target_os = "macos")]
pub mod pbcopy;
#[cfg(not(target_os = "macos"))]
pub mod wayland;

use crate::error::ClipboardError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Version marker for the clipboard's text payload
///
/// Two stamps compare equal when the text payload is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipboardStamp(u64);

impl ClipboardStamp {
    /// Stamp for the given text payload (`None` = no text on the clipboard)
    pub fn of(text: Option<&str>) -> Self {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Trait for clipboard implementations
#[async_trait::async_trait]
pub trait Clipboard: Send + Sync {
    /// Read the text payload, `None` if the clipboard holds no text
    async fn read_text(&self) -> Result<Option<String>, ClipboardError>;

    /// Replace the clipboard contents with `text`
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Sample the current version marker
    async fn stamp(&self) -> Result<ClipboardStamp, ClipboardError> {
        let text = self.read_text().await?;
        Ok(ClipboardStamp::of(text.as_deref()))
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function returning the clipboard for this platform
pub fn create_clipboard() -> Box<dyn Clipboard> {
    #[cfg(target_os = "macos")]
    {
        Box::new(pbcopy::PbcopyClipboard::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Box::new(wayland::WaylandClipboard::new())
    }
}

/// Convert raw tool output into an optional text payload
pub(crate) fn payload_from_bytes(bytes: Vec<u8>) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_equality_follows_content() {
        assert_eq!(ClipboardStamp::of(Some("a")), ClipboardStamp::of(Some("a")));
        assert_ne!(ClipboardStamp::of(Some("a")), ClipboardStamp::of(Some("b")));
        assert_ne!(ClipboardStamp::of(None), ClipboardStamp::of(Some("")));
    }

    #[test]
    fn test_payload_from_bytes() {
        assert_eq!(payload_from_bytes(Vec::new()), None);
        assert_eq!(
            payload_from_bytes(b"hello".to_vec()),
            Some("hello".to_string())
        );
    }
}
