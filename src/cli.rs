// Command-line interface definitions for clipai
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

/// Tone names accepted on the command line
pub const TONE_NAMES: [&str; 5] = ["professional", "friendly", "concise", "formal", "casual"];

#[derive(Parser)]
#[command(name = "clipai")]
#[command(author, version, about = "Rephrase the selected text in your tone of choice")]
#[command(long_about = "
ClipAI rewrites selected text with Google Gemini and puts the result on the
clipboard, ready to paste.

SETUP:
  1. Export your API key: export GEMINI_API_KEY=<key>
  2. Run: clipai setup (to write the config and check dependencies)
  3. macOS: grant Accessibility permission when prompted
  4. Run: clipai (to start the daemon and menu bar)

USAGE:
  Select text anywhere and press Cmd+Shift+C (Ctrl+Shift+C on Linux).
  When the \"Rephrasing Complete\" notification appears, paste.
  Change the tone from the menu bar or with: clipai tone set casual
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Use this tone for this run without saving it
    #[arg(long, value_name = "TONE", value_parser = TONE_NAMES, ignore_case = true)]
    pub tone: Option<String>,

    /// Override the global shortcut (e.g., CMD+SHIFT+C, CTRL+ALT+R)
    #[arg(long, value_name = "SHORTCUT")]
    pub hotkey: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon {
        /// Do not show the menu bar icon (macOS)
        #[arg(long)]
        no_menubar: bool,
    },

    /// Rephrase text once and print the result
    Rephrase {
        /// Text to rephrase (reads the clipboard if omitted)
        text: Option<String>,

        /// Tone to use instead of the saved one
        #[arg(long, value_name = "TONE", value_parser = TONE_NAMES, ignore_case = true)]
        tone: Option<String>,

        /// Read the text from stdin
        #[arg(long, conflicts_with = "text")]
        stdin: bool,

        /// Also copy the result to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Show or change the saved tone
    Tone {
        #[command(subcommand)]
        action: Option<ToneAction>,
    },

    /// Ask a running daemon to rephrase (for scripts and compositor keybindings)
    Trigger {
        #[command(subcommand)]
        action: TriggerAction,
    },

    /// Show current configuration
    Config,

    /// Write the default config and check dependencies
    Setup,
}

#[derive(Subcommand)]
pub enum ToneAction {
    /// Print the saved tone (default)
    Get,
    /// Save a new tone
    Set {
        #[arg(value_parser = TONE_NAMES, ignore_case = true)]
        tone: String,
    },
    /// List available tones
    List,
}

#[derive(Subcommand)]
pub enum TriggerAction {
    /// Copy the selection and rephrase it (send SIGUSR1 to daemon)
    Copy,
    /// Rephrase the current clipboard (send SIGUSR2 to daemon)
    Clipboard,
}
