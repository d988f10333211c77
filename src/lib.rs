//! ClipAI: rephrase selected text from anywhere
//!
//! This library provides the core functionality for:
//! - Detecting a global shortcut via rdev
//! - Capturing the selection by synthesizing the copy shortcut
//! - Guarding against feeding our own error messages back in
//! - Rephrasing text in a chosen tone with Google Gemini
//! - Replacing the clipboard with the result and notifying the user
//!
//! # Architecture
//!
//! ```text
//!          ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!          │    Hotkey    │   │  Menu bar /  │   │   Signals    │
//!          │    (rdev)    │   │   commands   │   │ (USR1/USR2)  │
//!          └──────────────┘   └──────────────┘   └──────────────┘
//!                   │                 │                  │
//!                   └─────────────────┼──────────────────┘
//!                                     ▼
//!                            ┌─────────────────┐
//!                            │     Daemon      │  one task per trigger,
//!                            │  (tokio loop)   │  newest supersedes
//!                            └─────────────────┘
//!                                     │ Trigger
//!                                     ▼
//!          ┌──────────────────────────────────────────────────────┐
//!          │                      Pipeline                        │
//!          │                                                      │
//!          │  Capture ──▶ Guard ──▶ Rephrase ──▶ Clipboard write  │
//!          │  (Cmd+C,     (deny-    (Gemini,     (pbcopy /        │
//!          │   poll)       list)     tone)        wl-copy)        │
//!          └──────────────────────────────────────────────────────┘
//!                   │                 │                  │
//!                   ▼                 ▼                  ▼
//!          ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!          │   Feedback   │   │ Preferences  │   │ Notification │
//!          │   (rodio)    │   │    (tone)    │   │              │
//!          └──────────────┘   └──────────────┘   └──────────────┘
//! ```

pub mod capture;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod daemon;
pub mod error;
pub mod feedback;
pub mod guard;
pub mod hotkey;
pub mod keystroke;
#[cfg(target_os = "macos")]
pub mod menubar;
pub mod notification;
pub mod pipeline;
pub mod preferences;
pub mod rephrase;
pub mod setup;
pub mod state;

pub use cli::{Cli, Commands, ToneAction, TriggerAction};
pub use config::Config;
pub use daemon::{Daemon, DaemonCommand};
pub use error::{ClipaiError, Result};
pub use pipeline::{Outcome, Pipeline, Services, Trigger};
pub use preferences::{PreferencesStore, Tone};
