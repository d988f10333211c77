//! Environment checks for `clipai setup`
//!
//! Writes the default config if there is none, then reports on the tools
//! clipai shells out to, the input permission, and the API key.

use crate::config::{self, Config};
use std::path::{Path, PathBuf};
#[cfg(not(target_os = "macos"))]
use std::process::Stdio;
#[cfg(not(target_os = "macos"))]
use tokio::process::Command;

/// An external command clipai depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tool {
    pub name: &'static str,
    pub purpose: &'static str,
    /// Missing optional tools only degrade behavior
    pub required: bool,
    pub install_hint: &'static str,
}

/// Tools used on this platform
pub fn platform_tools() -> &'static [Tool] {
    #[cfg(target_os = "macos")]
    {
        &[
            Tool {
                name: "pbpaste",
                purpose: "read the clipboard",
                required: true,
                install_hint: "ships with macOS",
            },
            Tool {
                name: "pbcopy",
                purpose: "write the clipboard",
                required: true,
                install_hint: "ships with macOS",
            },
            Tool {
                name: "terminal-notifier",
                purpose: "notifications (osascript is used otherwise)",
                required: false,
                install_hint: "brew install terminal-notifier",
            },
        ]
    }

    #[cfg(not(target_os = "macos"))]
    {
        &[
            Tool {
                name: "wl-paste",
                purpose: "read the clipboard",
                required: true,
                install_hint: "install wl-clipboard",
            },
            Tool {
                name: "wl-copy",
                purpose: "write the clipboard",
                required: true,
                install_hint: "install wl-clipboard",
            },
            Tool {
                name: "ydotool",
                purpose: "send the copy shortcut",
                required: true,
                install_hint: "install ydotool and run: systemctl --user enable --now ydotool",
            },
            Tool {
                name: "notify-send",
                purpose: "notifications",
                required: false,
                install_hint: "install libnotify",
            },
        ]
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("  \x1b[32m✓\x1b[0m {}", msg);
}

/// Print a failure message
pub fn print_failure(msg: &str) {
    println!("  \x1b[31m✗\x1b[0m {}", msg);
}

/// Print an info message
pub fn print_info(msg: &str) {
    println!("  \x1b[34mℹ\x1b[0m {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  \x1b[33m⚠\x1b[0m {}", msg);
}

/// Get the path to a command if it exists
pub fn get_command_path(cmd: &str) -> Option<PathBuf> {
    which::which(cmd).ok()
}

/// Whether the API key variable holds a non-blank value
pub fn api_key_present(var: &str, lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup(var).is_some_and(|value| !value.trim().is_empty())
}

/// Check if the ydotool daemon is running
#[cfg(not(target_os = "macos"))]
async fn is_ydotool_daemon_running() -> bool {
    let systemctl_check = Command::new("systemctl")
        .args(["--user", "is-active", "ydotool"])
        .output()
        .await;

    if let Ok(output) = systemctl_check {
        if output.status.success() {
            return true;
        }
    }

    // Fallback: a no-op ydotool command fails without the daemon
    Command::new("ydotool")
        .args(["type", ""])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Write the default config (if missing) and run all checks
pub async fn run_setup(config: &Config, config_path: Option<&Path>) -> anyhow::Result<bool> {
    println!("ClipAI Setup\n");

    println!("Configuration:");
    match config_path.map(PathBuf::from).or_else(Config::default_path) {
        Some(path) => {
            if config::write_default_config(&path)? {
                print_success(&format!("Created config file: {:?}", path));
            } else {
                print_success(&format!("Config file: {:?}", path));
            }
        }
        None => print_warning("Could not determine config directory, using defaults"),
    }
    print_info(&format!("Preferences: {:?}", Config::preferences_path()));
    println!();

    run_checks(config).await
}

/// Report on dependencies; returns true when everything required is present
pub async fn run_checks(config: &Config) -> anyhow::Result<bool> {
    let mut all_ok = true;

    println!("Tools:");
    for tool in platform_tools() {
        match get_command_path(tool.name) {
            Some(path) => print_success(&format!("{} ({}): {}", tool.name, tool.purpose, path.display())),
            None if tool.required => {
                print_failure(&format!("{} not found ({})", tool.name, tool.purpose));
                println!("       {}", tool.install_hint);
                all_ok = false;
            }
            None => {
                print_warning(&format!("{} not found ({})", tool.name, tool.purpose));
                println!("       {}", tool.install_hint);
            }
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        if get_command_path("ydotool").is_some() {
            if is_ydotool_daemon_running().await {
                print_success("ydotool daemon is running");
            } else {
                print_failure("ydotool daemon is not running");
                println!("       Start with: systemctl --user start ydotool");
                all_ok = false;
            }
        }
    }

    println!("\nPermissions:");
    if crate::keystroke::request_permission() {
        print_success("Input simulation allowed");
    } else {
        print_failure("Accessibility permission not granted");
        println!("       System Settings > Privacy & Security > Accessibility");
        all_ok = false;
    }

    println!("\nRephrasing service:");
    print_info(&format!("Model: {} at {}", config.gemini.model, config.gemini.endpoint));
    if api_key_present(&config.gemini.api_key_env, |var| std::env::var(var).ok()) {
        print_success(&format!("{} is set", config.gemini.api_key_env));
    } else {
        // Not fatal: the key is read per request and can be exported later
        print_warning(&format!("{} is not set", config.gemini.api_key_env));
        println!(
            "       export {}=<your key> before starting clipai",
            config.gemini.api_key_env
        );
    }

    println!("\nShortcut:");
    match crate::hotkey::Shortcut::parse(&config.hotkey.shortcut) {
        Ok(shortcut) => print_success(&format!("{} ({})", shortcut, shortcut.symbols())),
        Err(e) => {
            print_failure(&e.to_string());
            all_ok = false;
        }
    }

    println!("\n---");
    if all_ok {
        println!("\x1b[32m✓ All checks passed!\x1b[0m");
    } else {
        println!("\x1b[31m✗ Some checks failed.\x1b[0m Please fix the issues above.");
    }

    Ok(all_ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_present() {
        assert!(api_key_present("GEMINI_API_KEY", |_| Some("abc".into())));
        assert!(!api_key_present("GEMINI_API_KEY", |_| Some("   ".into())));
        assert!(!api_key_present("GEMINI_API_KEY", |_| None));
    }

    #[test]
    fn test_platform_tools_cover_clipboard() {
        let tools = platform_tools();
        assert!(tools.iter().filter(|t| t.required).count() >= 2);
        assert!(tools.iter().any(|t| t.purpose == "read the clipboard"));
        assert!(tools.iter().any(|t| t.purpose == "write the clipboard"));
    }
}
