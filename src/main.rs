//! ClipAI - rephrase the selected text with a global shortcut
//!
//! Run with `clipai` or `clipai daemon` to start the daemon (and the menu
//! bar on macOS). Use `clipai setup` to write the config and check
//! dependencies. Use `clipai rephrase <text>` for a one-off rephrase.

use clap::Parser;
use clipai::cli::{Cli, Commands, ToneAction, TriggerAction};
use clipai::clipboard::{self, Clipboard};
use clipai::config::{self, Config};
use clipai::guard::Guard;
use clipai::pipeline::{Pipeline, Services, Trigger};
use clipai::preferences::{PreferencesStore, Tone};
use clipai::rephrase::{self, RephraseRequest, Rephraser};
use clipai::{daemon, keystroke, notification, setup};
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("clipai={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(hotkey) = cli.hotkey {
        config.hotkey.shortcut = hotkey;
    }
    let tone_override = cli
        .tone
        .as_deref()
        .map(str::parse::<Tone>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    // The menu bar needs the main thread, so the runtime is built here
    // rather than with #[tokio::main]
    match cli.command.unwrap_or(Commands::Daemon { no_menubar: false }) {
        Commands::Daemon { no_menubar } => run_daemon(config, tone_override, no_menubar)?,

        Commands::Rephrase {
            text,
            tone,
            stdin,
            copy,
        } => {
            let tone = tone
                .as_deref()
                .map(str::parse::<Tone>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(rephrase_once(&config, text, tone.or(tone_override), stdin, copy))?;
        }

        Commands::Tone { action } => run_tone(action.unwrap_or(ToneAction::Get))?,

        Commands::Trigger { action } => {
            let trigger = match action {
                TriggerAction::Copy => Trigger::CopyAndRephrase,
                TriggerAction::Clipboard => Trigger::RephraseClipboard,
            };
            let pid = daemon::signal_daemon(&Config::pid_file(), trigger)?;
            tracing::debug!("Sent {} to daemon (pid={})", trigger, pid);
        }

        Commands::Config => show_config(&config)?,

        Commands::Setup => {
            let runtime = tokio::runtime::Runtime::new()?;
            let ok = runtime.block_on(setup::run_setup(&config, cli.config.as_deref()))?;
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Build the pipeline and run the daemon until it is told to stop
fn run_daemon(config: Config, tone_override: Option<Tone>, no_menubar: bool) -> anyhow::Result<()> {
    let mut preferences = PreferencesStore::load(Config::preferences_path())?;
    if let Some(tone) = tone_override {
        preferences.override_tone(tone);
    }
    tracing::info!("Tone: {}", preferences.tone());

    if !setup::api_key_present(&config.gemini.api_key_env, |var| std::env::var(var).ok()) {
        tracing::warn!(
            "{} is not set; rephrase requests will fail until it is exported",
            config.gemini.api_key_env
        );
        if config.notification.enabled {
            notification::send_sync(
                "ClipAI",
                &format!("{} is not set. Rephrasing will fail until it is.", config.gemini.api_key_env),
            );
        }
    }

    if !keystroke::request_permission() {
        tracing::warn!("Input simulation is not permitted; Copy & Rephrase will not work");
    }

    let services = Services::from_config(&config);
    let pipeline = Pipeline::new(services, Arc::new(Mutex::new(preferences)), &config);

    #[cfg(target_os = "macos")]
    {
        if !no_menubar {
            clipai::menubar::run(config, pipeline)?;
            return Ok(());
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        if no_menubar {
            tracing::debug!("--no-menubar has no effect on this platform");
        }
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let mut daemon = daemon::Daemon::new(config, pipeline);
    runtime.block_on(daemon.run())?;
    Ok(())
}

/// Rephrase text once and print the result
async fn rephrase_once(
    config: &Config,
    text: Option<String>,
    tone: Option<Tone>,
    from_stdin: bool,
    copy: bool,
) -> anyhow::Result<()> {
    let clipboard = clipboard::create_clipboard();

    let text = match text {
        Some(text) => text,
        None if from_stdin => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        None => clipboard.read_text().await?.unwrap_or_default(),
    };

    let guard = Guard::new(&config.guard.denylist);
    if let Err(rejection) = guard.check(&text) {
        anyhow::bail!("Nothing to rephrase: {}", rejection);
    }

    let tone = match tone {
        Some(tone) => tone,
        None => PreferencesStore::load(Config::preferences_path())?.tone(),
    };

    let rephraser = rephrase::create_rephraser(&config.gemini);
    tracing::debug!("Rephrasing with {} in a {} tone", rephraser.name(), tone);
    let result = rephraser.rephrase(&RephraseRequest::new(text, tone)).await?;

    println!("{}", result);

    if copy {
        clipboard.write_text(&result).await?;
        tracing::info!("Copied to clipboard");
    }

    Ok(())
}

/// Show or change the saved tone
fn run_tone(action: ToneAction) -> anyhow::Result<()> {
    let mut store = PreferencesStore::load(Config::preferences_path())?;

    match action {
        ToneAction::Get => println!("{}", store.tone().as_str()),
        ToneAction::Set { tone } => {
            let tone: Tone = tone.parse().map_err(anyhow::Error::msg)?;
            store.set_tone(tone)?;
            println!("Tone set to {}", tone);
        }
        ToneAction::List => {
            let current = store.tone();
            for tone in Tone::ALL {
                let marker = if tone == current { "*" } else { " " };
                println!("{} {}", marker, tone.as_str());
            }
        }
    }

    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[hotkey]");
    println!("  shortcut = {:?}", config.hotkey.shortcut);
    println!("  enabled = {}", config.hotkey.enabled);

    println!("\n[capture]");
    println!("  poll_interval_ms = {}", config.capture.poll_interval_ms);
    println!("  max_attempts = {}", config.capture.max_attempts);
    println!("  jitter_ms = {}", config.capture.jitter_ms);

    println!("\n[gemini]");
    println!("  endpoint = {:?}", config.gemini.endpoint);
    println!("  model = {:?}", config.gemini.model);
    println!(
        "  api_key_env = {:?} ({})",
        config.gemini.api_key_env,
        if setup::api_key_present(&config.gemini.api_key_env, |var| std::env::var(var).ok()) {
            "set"
        } else {
            "not set"
        }
    );
    println!("  temperature = {}", config.gemini.temperature);
    println!("  top_p = {}", config.gemini.top_p);
    println!("  top_k = {}", config.gemini.top_k);
    println!("  max_output_tokens = {}", config.gemini.max_output_tokens);
    println!("  timeout_secs = {}", config.gemini.timeout_secs);

    println!("\n[guard]");
    println!("  denylist = {:?}", config.guard.denylist);

    println!("\n[notification]");
    println!("  enabled = {}", config.notification.enabled);

    println!("\n[feedback]");
    println!("  enabled = {}", config.feedback.enabled);
    println!("  volume = {}", config.feedback.volume);

    println!("\n---");
    println!(
        "Config file: {:?}",
        Config::default_path().unwrap_or_else(|| PathBuf::from("(not found)"))
    );
    println!("Preferences: {:?}", Config::preferences_path());
    println!("State file: {:?}", Config::state_file());
    println!("PID file: {:?}", Config::pid_file());

    Ok(())
}
