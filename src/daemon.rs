//! Daemon module - main event loop
//!
//! Merges the global shortcut, menu commands and Unix signals into pipeline
//! runs. Each trigger runs in its own task; its [`Outcome`] comes back on a
//! channel. A trigger that arrives while a run is in flight supersedes it:
//! the old task is aborted and the new one starts. An aborted run may
//! already have written the clipboard.
//!
//! External control:
//! - SIGUSR1: copy & rephrase
//! - SIGUSR2: rephrase clipboard
//! - SIGINT / SIGTERM: shut down

use crate::config::Config;
use crate::error::{ClipaiError, Result};
use crate::hotkey::{self, HotkeyEvent, HotkeyListener};
use crate::pipeline::{Outcome, Pipeline, Trigger};
use crate::preferences::Tone;
use crate::state::{write_state_file, State};
use pidlock::Pidlock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Commands sent to a running daemon (from the menu bar)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonCommand {
    Trigger(Trigger),
    SetTone(Tone),
    Quit,
}

/// Remove a runtime file on shutdown
fn cleanup_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

/// Write PID file for external control via signals
fn write_pid_file(pid_path: &Path) -> Option<PathBuf> {
    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path.to_path_buf())
}

/// Read a PID written by [`write_pid_file`]
fn read_pid(pid_path: &Path) -> Option<i32> {
    std::fs::read_to_string(pid_path)
        .ok()?
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|pid| *pid > 0)
}

/// Ask a running daemon to start `trigger` (SIGUSR1 / SIGUSR2)
pub fn signal_daemon(pid_path: &Path, trigger: Trigger) -> Result<i32> {
    let pid = read_pid(pid_path).ok_or_else(|| {
        ClipaiError::Config(format!(
            "clipai daemon is not running (no PID file at {:?})",
            pid_path
        ))
    })?;

    let signal = match trigger {
        Trigger::CopyAndRephrase => libc::SIGUSR1,
        Trigger::RephraseClipboard => libc::SIGUSR2,
    };

    if unsafe { libc::kill(pid, signal) } != 0 {
        return Err(ClipaiError::Io(std::io::Error::last_os_error()));
    }

    tracing::debug!("Sent {} to daemon (pid={})", trigger, pid);
    Ok(pid)
}

/// Acquire the single-instance lock in the runtime directory
fn acquire_instance_lock() -> Result<Pidlock> {
    let runtime_dir = Config::runtime_dir();
    std::fs::create_dir_all(&runtime_dir)?;

    let lock_path = runtime_dir.join("clipai.lock");
    let mut lock = Pidlock::new(&lock_path.to_string_lossy());
    lock.acquire().map_err(|_| {
        ClipaiError::Config(format!(
            "Another clipai daemon is already running (lock: {})",
            lock_path.display()
        ))
    })?;

    Ok(lock)
}

/// A pipeline run in progress
struct InFlight {
    id: u64,
    trigger: Trigger,
    handle: JoinHandle<()>,
}

/// Clear `in_flight` when run `id` is the current one
///
/// A superseded run can finish before it is aborted; its outcome must not
/// clear the run that replaced it.
fn finish_run(in_flight: &mut Option<InFlight>, id: u64) -> bool {
    if in_flight.as_ref().map(|run| run.id) == Some(id) {
        *in_flight = None;
        true
    } else {
        false
    }
}

/// Main daemon that owns the event loop
pub struct Daemon {
    config: Config,
    pipeline: Arc<Pipeline>,
    state_file_path: PathBuf,
    pid_file_path: PathBuf,
    commands: Option<mpsc::Receiver<DaemonCommand>>,
    single_instance: bool,
}

impl Daemon {
    /// Create a daemon around a fully wired pipeline
    pub fn new(config: Config, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            state_file_path: Config::state_file(),
            pid_file_path: Config::pid_file(),
            commands: None,
            single_instance: true,
        }
    }

    /// Accept commands from the menu bar (or any other in-process caller)
    pub fn with_commands(mut self, commands: mpsc::Receiver<DaemonCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Use custom state and PID file locations, skipping the instance lock
    pub fn with_runtime_files(mut self, state_file: PathBuf, pid_file: PathBuf) -> Self {
        self.state_file_path = state_file;
        self.pid_file_path = pid_file;
        self.single_instance = false;
        self
    }

    /// Start a run for `trigger`, aborting any run still in flight
    fn start_run(
        &self,
        trigger: Trigger,
        in_flight: &mut Option<InFlight>,
        next_id: &mut u64,
        outcome_tx: &mpsc::Sender<(u64, Outcome)>,
    ) {
        if let Some(previous) = in_flight.take() {
            if !previous.handle.is_finished() {
                tracing::info!(
                    "New {} supersedes in-flight {}",
                    trigger,
                    previous.trigger
                );
                previous.handle.abort();
            }
        }

        *next_id += 1;
        let id = *next_id;
        let pipeline = self.pipeline.clone();
        let state_file = self.state_file_path.clone();
        let tx = outcome_tx.clone();

        let handle = tokio::spawn(async move {
            let outcome = pipeline
                .run_observed(trigger, |state| write_state_file(&state_file, state))
                .await;
            let _ = tx.send((id, outcome)).await;
        });

        *in_flight = Some(InFlight {
            id,
            trigger,
            handle,
        });
    }

    fn set_tone(&self, tone: Tone) {
        let mut preferences = self
            .pipeline
            .preferences()
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        if let Err(e) = preferences.set_tone(tone) {
            tracing::error!("Failed to save tone: {}", e);
        }
    }

    /// Run the daemon main loop until a shutdown signal or Quit command
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting clipai daemon");

        let instance_lock = if self.single_instance {
            Some(acquire_instance_lock()?)
        } else {
            None
        };

        let pid_file = write_pid_file(&self.pid_file_path);

        let mut sigusr1 = signal(SignalKind::user_defined1())
            .map_err(|e| ClipaiError::Config(format!("Failed to set up SIGUSR1 handler: {}", e)))?;
        let mut sigusr2 = signal(SignalKind::user_defined2())
            .map_err(|e| ClipaiError::Config(format!("Failed to set up SIGUSR2 handler: {}", e)))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| ClipaiError::Config(format!("Failed to set up SIGTERM handler: {}", e)))?;

        tracing::info!("State file: {:?}", self.state_file_path);
        {
            let preferences = self
                .pipeline
                .preferences()
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            tracing::info!(
                "Tone: {} (preferences: {:?})",
                preferences.tone(),
                preferences.path()
            );
        }

        // A broken shortcut never takes the daemon down; the menu and
        // signals keep working without it
        let mut hotkey_listener: Option<Box<dyn HotkeyListener>> = None;
        let mut hotkey_rx = None;
        if self.config.hotkey.enabled {
            match hotkey::create_listener(
                &self.config.hotkey,
                self.pipeline.synthetic_keys().clone(),
            ) {
                Ok(mut listener) => match listener.start() {
                    Ok(rx) => {
                        hotkey_rx = Some(rx);
                        hotkey_listener = Some(listener);
                    }
                    Err(e) => tracing::warn!("Hotkey unavailable: {}", e),
                },
                Err(e) => tracing::warn!("Hotkey unavailable: {}", e),
            }
        } else {
            tracing::info!("Built-in hotkey disabled, use the menu or 'clipai trigger' instead");
        }

        let (outcome_tx, mut outcome_rx) = mpsc::channel::<(u64, Outcome)>(8);
        let mut in_flight: Option<InFlight> = None;
        let mut next_id = 0u64;

        write_state_file(&self.state_file_path, State::Idle);

        loop {
            tokio::select! {
                Some(event) = async {
                    match &mut hotkey_rx {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match event {
                        HotkeyEvent::Triggered => {
                            self.start_run(Trigger::CopyAndRephrase, &mut in_flight, &mut next_id, &outcome_tx);
                        }
                    }
                }

                command = async {
                    match &mut self.commands {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match command {
                        Some(DaemonCommand::Trigger(trigger)) => {
                            self.start_run(trigger, &mut in_flight, &mut next_id, &outcome_tx);
                        }
                        Some(DaemonCommand::SetTone(tone)) => self.set_tone(tone),
                        Some(DaemonCommand::Quit) => {
                            tracing::info!("Quit requested, shutting down...");
                            break;
                        }
                        None => {
                            tracing::debug!("Command channel closed");
                            self.commands = None;
                        }
                    }
                }

                Some((id, outcome)) = outcome_rx.recv() => {
                    if !finish_run(&mut in_flight, id) {
                        tracing::debug!("Outcome of superseded run {} arrived late", id);
                    }
                    match &outcome {
                        Outcome::Replaced(text) => {
                            tracing::info!("Done: clipboard holds {} chars", text.chars().count());
                        }
                        other => tracing::debug!("Run ended: {:?}", other),
                    }
                }

                _ = sigusr1.recv() => {
                    tracing::debug!("Received SIGUSR1 (copy & rephrase)");
                    self.start_run(Trigger::CopyAndRephrase, &mut in_flight, &mut next_id, &outcome_tx);
                }

                _ = sigusr2.recv() => {
                    tracing::debug!("Received SIGUSR2 (rephrase clipboard)");
                    self.start_run(Trigger::RephraseClipboard, &mut in_flight, &mut next_id, &outcome_tx);
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        if let Some(run) = in_flight.take() {
            tracing::debug!("Aborting in-flight {}", run.trigger);
            run.handle.abort();
        }

        if let Some(mut listener) = hotkey_listener {
            listener.stop()?;
        }

        cleanup_file(&self.state_file_path);
        if let Some(ref path) = pid_file {
            cleanup_file(path);
        }
        if let Some(mut lock) = instance_lock {
            if lock.release().is_err() {
                tracing::warn!("Failed to release instance lock");
            }
        }

        tracing::info!("Daemon stopped");
        Ok(())
    }
}
