//! macOS menu bar integration
//!
//! The tray icon and its event loop own the main thread. The daemon runs
//! on a background thread with its own tokio runtime and receives menu
//! selections as [`DaemonCommand`]s. The title reflects the daemon state
//! published in the state file.

use crate::config::Config;
use crate::daemon::{Daemon, DaemonCommand};
use crate::error::{ClipaiError, Result};
use crate::hotkey::Shortcut;
use crate::pipeline::{Pipeline, Trigger};
use crate::preferences::{PreferencesStore, Tone};
use crate::state::State;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tao::event_loop::{ControlFlow, EventLoopBuilder};
use tokio::sync::mpsc;
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu},
    TrayIconBuilder,
};

/// Menu item IDs
mod menu_ids {
    pub const COPY_AND_REPHRASE: &str = "copy_and_rephrase";
    pub const REPHRASE_CLIPBOARD: &str = "rephrase_clipboard";

    // Tone prefix (actual ID is tone_<name>)
    pub const TONE_PREFIX: &str = "tone_";

    pub const PREFERENCES: &str = "preferences";
    pub const OPEN_CONFIG: &str = "open_config";
    pub const QUIT: &str = "quit";
}

fn icon(state: State) -> &'static str {
    match state {
        State::Idle => "📋",
        State::Capturing | State::Rephrasing => "⏳",
    }
}

fn status_text(state: State) -> &'static str {
    match state {
        State::Idle => "Status: Ready",
        State::Capturing => "Status: Copying...",
        State::Rephrasing => "Status: Rephrasing...",
    }
}

fn menu_error(e: impl std::fmt::Display) -> ClipaiError {
    ClipaiError::Config(format!("Failed to build menu: {}", e))
}

/// Open a file with the default application
fn open_path(path: &Path) {
    if let Err(e) = std::process::Command::new("open").arg(path).spawn() {
        tracing::warn!("Failed to open {:?}: {}", path, e);
    }
}

/// Menu items that change after the menu is built
struct MenuHandles {
    status: MenuItem,
    tones: Vec<(Tone, CheckMenuItem)>,
}

fn build_menu(shortcut_label: &str, current: Tone) -> Result<(Menu, MenuHandles)> {
    let menu = Menu::new();

    let copy_item = MenuItem::with_id(
        menu_ids::COPY_AND_REPHRASE,
        format!("Copy & Rephrase ({})", shortcut_label),
        true,
        None,
    );
    let clipboard_item = MenuItem::with_id(
        menu_ids::REPHRASE_CLIPBOARD,
        "Rephrase Clipboard",
        true,
        None,
    );
    menu.append(&copy_item).map_err(menu_error)?;
    menu.append(&clipboard_item).map_err(menu_error)?;
    menu.append(&PredefinedMenuItem::separator()).map_err(menu_error)?;

    let tone_menu = Submenu::new("Tone", true);
    let mut tones = Vec::with_capacity(Tone::ALL.len());
    for tone in Tone::ALL {
        let item = CheckMenuItem::with_id(
            format!("{}{}", menu_ids::TONE_PREFIX, tone.as_str()),
            tone.label(),
            true,
            tone == current,
            None,
        );
        tone_menu.append(&item).map_err(menu_error)?;
        tones.push((tone, item));
    }
    menu.append(&tone_menu).map_err(menu_error)?;

    menu.append(&PredefinedMenuItem::separator()).map_err(menu_error)?;

    // Status (disabled, just for display)
    let status = MenuItem::new(status_text(State::Idle), false, None);
    menu.append(&status).map_err(menu_error)?;

    menu.append(&PredefinedMenuItem::separator()).map_err(menu_error)?;

    let prefs_item = MenuItem::with_id(menu_ids::PREFERENCES, "Preferences…", true, None);
    let config_item = MenuItem::with_id(menu_ids::OPEN_CONFIG, "Edit Config File…", true, None);
    menu.append(&prefs_item).map_err(menu_error)?;
    menu.append(&config_item).map_err(menu_error)?;

    menu.append(&PredefinedMenuItem::separator()).map_err(menu_error)?;

    let quit_item = MenuItem::with_id(menu_ids::QUIT, "Quit", true, None);
    menu.append(&quit_item).map_err(menu_error)?;

    Ok((menu, MenuHandles { status, tones }))
}

/// Open the preferences file, writing it first if it does not exist yet
fn open_preferences(preferences: &Mutex<PreferencesStore>) {
    let mut store = preferences.lock().unwrap_or_else(|e| e.into_inner());
    if !store.path().exists() {
        let tone = store.tone();
        if let Err(e) = store.set_tone(tone) {
            tracing::warn!("Failed to create preferences file: {}", e);
            return;
        }
    }
    open_path(store.path());
}

/// Run the menu bar with the daemon on a background thread
///
/// Must be called from the main thread. Does not return until Quit is
/// chosen or the daemon stops (e.g. on SIGTERM).
pub fn run(config: Config, pipeline: Pipeline) -> Result<()> {
    let preferences = pipeline.preferences().clone();
    let state_file = Config::state_file();

    let shortcut_label = Shortcut::parse(&config.hotkey.shortcut)
        .map(|s| s.symbols())
        .unwrap_or_else(|_| config.hotkey.shortcut.clone());
    let current_tone = preferences
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .tone();

    let (menu, handles) = build_menu(&shortcut_label, current_tone)?;

    let (cmd_tx, cmd_rx) = mpsc::channel::<DaemonCommand>(16);
    let mut daemon = Daemon::new(config, pipeline).with_commands(cmd_rx);

    let daemon_thread = std::thread::Builder::new()
        .name("clipai-daemon".into())
        .spawn(move || -> Result<()> {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(daemon.run())
        })?;

    let tray = TrayIconBuilder::new()
        .with_tooltip("ClipAI")
        .with_title(icon(State::Idle))
        .with_menu(Box::new(menu))
        .build()
        .map_err(|e| ClipaiError::Config(format!("Failed to create tray icon: {}", e)))?;

    tracing::info!("Menu bar is running");

    let mut daemon_thread = Some(daemon_thread);
    let mut last_state = State::Idle;
    let mut last_update = Instant::now();
    let update_interval = Duration::from_millis(250);
    let menu_channel = MenuEvent::receiver();
    let event_loop = EventLoopBuilder::new().build();

    event_loop.run(move |_event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + Duration::from_millis(100));

        let send = |command: DaemonCommand| {
            if cmd_tx.try_send(command).is_err() {
                tracing::warn!("Daemon is busy or gone, dropping {:?}", command);
            }
        };

        if let Ok(event) = menu_channel.try_recv() {
            let id = event.id().0.as_str();

            match id {
                menu_ids::COPY_AND_REPHRASE => {
                    send(DaemonCommand::Trigger(Trigger::CopyAndRephrase));
                }
                menu_ids::REPHRASE_CLIPBOARD => {
                    send(DaemonCommand::Trigger(Trigger::RephraseClipboard));
                }
                menu_ids::PREFERENCES => open_preferences(&preferences),
                menu_ids::OPEN_CONFIG => {
                    if let Some(path) = Config::default_path() {
                        if let Err(e) = crate::config::write_default_config(&path) {
                            tracing::warn!("{}", e);
                        }
                        open_path(&path);
                    }
                }
                menu_ids::QUIT => send(DaemonCommand::Quit),
                _ => {
                    if let Some(tone) = id
                        .strip_prefix(menu_ids::TONE_PREFIX)
                        .and_then(|name| name.parse::<Tone>().ok())
                    {
                        send(DaemonCommand::SetTone(tone));

                        // Check items toggle themselves; keep exactly one checked
                        for (item_tone, item) in &handles.tones {
                            item.set_checked(*item_tone == tone);
                        }
                    }
                }
            }
        }

        if last_update.elapsed() >= update_interval {
            let state = State::read(&state_file);
            if state != last_state {
                let _ = tray.set_title(Some(icon(state)));
                handles.status.set_text(status_text(state));
                last_state = state;
            }
            last_update = Instant::now();
        }

        let finished = daemon_thread
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true);
        if finished {
            if let Some(handle) = daemon_thread.take() {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!("Daemon error: {}", e),
                    Err(_) => tracing::error!("Daemon thread panicked"),
                }
            }
            *control_flow = ControlFlow::Exit;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_reflects_state() {
        assert_eq!(icon(State::Idle), "📋");
        assert_eq!(icon(State::Rephrasing), "⏳");
        assert_eq!(icon(State::Capturing), icon(State::Rephrasing));
    }
}
