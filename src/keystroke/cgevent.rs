//! macOS copy keystroke via the CGEvent API
//!
//! Requires Accessibility permissions:
//!   System Settings > Privacy & Security > Accessibility

use super::KeystrokeSimulator;
use crate::error::CaptureError;
use core_foundation::base::TCFType;
use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

// macOS virtual key codes (from Carbon HIToolbox Events.h)
const KEYCODE_C: CGKeyCode = 0x08;
const KEYCODE_COMMAND: CGKeyCode = 0x37;

/// Cmd+C via CGEvent
#[derive(Debug, Default)]
pub struct CGEventCopy;

impl CGEventCopy {
    pub fn new() -> Self {
        Self
    }

    /// Post Cmd down, C down, C up, Cmd up (blocking, for use in spawn_blocking)
    fn post_cmd_c() -> Result<(), CaptureError> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| CaptureError::Keystroke("Failed to create CGEventSource".into()))?;

        let sequence = [
            (KEYCODE_COMMAND, true, CGEventFlags::CGEventFlagCommand),
            (KEYCODE_C, true, CGEventFlags::CGEventFlagCommand),
            (KEYCODE_C, false, CGEventFlags::CGEventFlagCommand),
            (KEYCODE_COMMAND, false, CGEventFlags::empty()),
        ];

        for (keycode, key_down, flags) in sequence {
            let event = CGEvent::new_keyboard_event(source.clone(), keycode, key_down)
                .map_err(|_| CaptureError::Keystroke("Failed to create keyboard event".into()))?;

            // Always set flags explicitly so a held Shift from the hotkey
            // does not turn this into Cmd+Shift+C
            event.set_flags(flags);
            event.post(CGEventTapLocation::HID);
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl KeystrokeSimulator for CGEventCopy {
    async fn simulate_copy(&self) -> Result<(), CaptureError> {
        if !check_accessibility_permission() {
            return Err(CaptureError::Keystroke(
                "Accessibility permission required.\n\
                 Grant access in: System Settings > Privacy & Security > Accessibility\n\
                 Then restart clipai."
                    .into(),
            ));
        }

        // CGEventSource is not Send, so do all CGEvent work in spawn_blocking
        tokio::task::spawn_blocking(Self::post_cmd_c)
            .await
            .map_err(|e| CaptureError::Keystroke(format!("Task join error: {}", e)))??;

        tracing::trace!("Posted Cmd+C");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cgevent (macOS native)"
    }
}

/// Check if Accessibility permissions are granted
fn check_accessibility_permission() -> bool {
    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
    }
    unsafe { AXIsProcessTrusted() }
}

/// Check Accessibility permission, showing the system dialog if missing
pub fn request_accessibility_permission() -> bool {
    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrustedWithOptions(options: core_foundation::base::CFTypeRef) -> bool;
    }

    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = CFBoolean::true_value();
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as _) }
}
