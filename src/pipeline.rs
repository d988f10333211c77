//! Capture → guard → rephrase → clipboard
//!
//! One [`Pipeline::run`] call handles one trigger from start to finish and
//! reports what happened as an [`Outcome`]. All collaborators are injected
//! so the daemon, the CLI and the tests can wire their own.
//!
//! Nothing in here panics or exits on a failed request or missing
//! configuration: every failure becomes a notification, an audible cue and
//! an `Outcome`.

use crate::capture::SelectionCapture;
use crate::clipboard::{self, Clipboard};
use crate::config::Config;
use crate::error::{CaptureError, RephraseError};
use crate::feedback::{self, FeedbackCue};
use crate::guard::{Guard, GuardRejection};
use crate::keystroke::{self, KeystrokeSimulator, SyntheticKeys};
use crate::notification::{DesktopNotifier, Notifier};
use crate::preferences::PreferencesStore;
use crate::rephrase::{self, preview, RephraseRequest, Rephraser};
use crate::state::State;
use std::sync::{Arc, Mutex};

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Copy the current selection, then rephrase it (shortcut, menu)
    CopyAndRephrase,
    /// Rephrase whatever is already on the clipboard
    RephraseClipboard,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::CopyAndRephrase => write!(f, "copy & rephrase"),
            Trigger::RephraseClipboard => write!(f, "rephrase clipboard"),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to rephrase
    NoSelection,
    /// The copy keystroke or clipboard read failed
    CaptureFailed(String),
    /// The guard refused the captured text
    Rejected(GuardRejection),
    /// The clipboard now holds the rephrased text
    Replaced(String),
    /// The rephrasing service failed
    Failed(RephraseError),
    /// The rephrased text could not be written to the clipboard
    WriteFailed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Replaced(_))
    }
}

/// Services a pipeline talks to
#[derive(Clone)]
pub struct Services {
    pub clipboard: Arc<dyn Clipboard>,
    pub keystroke: Arc<dyn KeystrokeSimulator>,
    pub rephraser: Arc<dyn Rephraser>,
    pub notifier: Arc<dyn Notifier>,
    pub feedback: Arc<dyn FeedbackCue>,
}

impl Services {
    /// Platform implementations for the given configuration
    pub fn from_config(config: &Config) -> Self {
        let clipboard: Arc<dyn Clipboard> = Arc::from(clipboard::create_clipboard());
        let keystroke: Arc<dyn KeystrokeSimulator> = Arc::from(keystroke::create_simulator());
        let rephraser: Arc<dyn Rephraser> = Arc::from(rephrase::create_rephraser(&config.gemini));

        tracing::debug!(
            "Services: clipboard={}, keystroke={}, rephraser={}",
            clipboard.name(),
            keystroke.name(),
            rephraser.name()
        );

        Self {
            clipboard,
            keystroke,
            rephraser,
            notifier: Arc::new(DesktopNotifier::new(&config.notification)),
            feedback: feedback::create_feedback(&config.feedback),
        }
    }
}

/// Orchestrates one rephrase per trigger
pub struct Pipeline {
    capture: SelectionCapture,
    clipboard: Arc<dyn Clipboard>,
    rephraser: Arc<dyn Rephraser>,
    notifier: Arc<dyn Notifier>,
    feedback: Arc<dyn FeedbackCue>,
    preferences: Arc<Mutex<PreferencesStore>>,
    guard: Guard,
}

impl Pipeline {
    pub fn new(
        services: Services,
        preferences: Arc<Mutex<PreferencesStore>>,
        config: &Config,
    ) -> Self {
        Self {
            capture: SelectionCapture::new(
                services.clipboard.clone(),
                services.keystroke,
                &config.capture,
            ),
            clipboard: services.clipboard,
            rephraser: services.rephraser,
            notifier: services.notifier,
            feedback: services.feedback,
            preferences,
            guard: Guard::new(&config.guard.denylist),
        }
    }

    /// Shared preferences (tone is read from here on every run)
    pub fn preferences(&self) -> &Arc<Mutex<PreferencesStore>> {
        &self.preferences
    }

    /// Marker set while the copy shortcut is posted, for the shortcut listener
    pub fn synthetic_keys(&self) -> &SyntheticKeys {
        self.capture.synthetic_keys()
    }

    /// Handle one trigger
    pub async fn run(&self, trigger: Trigger) -> Outcome {
        self.run_observed(trigger, |_| {}).await
    }

    /// Handle one trigger, reporting each stage to `observe`
    pub async fn run_observed<F>(&self, trigger: Trigger, observe: F) -> Outcome
    where
        F: Fn(State) + Send + Sync,
    {
        tracing::info!("Triggered: {}", trigger);

        observe(State::Capturing);
        let outcome = self.process(trigger, &observe).await;
        observe(State::Idle);

        outcome
    }

    async fn process<F>(&self, trigger: Trigger, observe: &F) -> Outcome
    where
        F: Fn(State) + Send + Sync,
    {
        let captured = match trigger {
            Trigger::CopyAndRephrase => self.capture.capture().await,
            Trigger::RephraseClipboard => self.capture.read_existing().await,
        };

        let captured = match captured {
            Ok(captured) => captured,
            Err(CaptureError::NoSelection) => {
                tracing::info!("Nothing selected, skipping");
                self.feedback.error();
                return Outcome::NoSelection;
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("Capture failed: {}", message);
                self.fail("Copy Failed", &message).await;
                return Outcome::CaptureFailed(message);
            }
        };

        if let Err(rejection) = self.guard.check(&captured.text) {
            tracing::warn!("Not rephrasing: {}", rejection);
            self.feedback.error();
            return Outcome::Rejected(rejection);
        }

        tracing::debug!(
            "Captured {} chars{}: {:?}",
            captured.text.chars().count(),
            if captured.confirmed { "" } else { " (unconfirmed)" },
            preview(&captured.text)
        );

        observe(State::Rephrasing);
        self.notifier
            .notify("Rephrasing...", "Processing your text")
            .await;

        let tone = self
            .preferences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .tone();
        let request = RephraseRequest::new(captured.text, tone);

        match self.rephraser.rephrase(&request).await {
            Ok(text) => {
                if let Err(e) = self.clipboard.write_text(&text).await {
                    let message = e.to_string();
                    tracing::error!("Failed to update clipboard: {}", message);
                    self.fail("Rephrasing Failed", &message).await;
                    return Outcome::WriteFailed(message);
                }

                tracing::info!("Clipboard replaced with {} rephrase", tone.as_str());
                self.notifier
                    .notify("Rephrasing Complete", "Ready to paste!")
                    .await;
                Outcome::Replaced(text)
            }
            Err(e) => {
                tracing::error!("Rephrase failed: {}", e);
                self.fail("Rephrasing Failed", &e.to_string()).await;
                Outcome::Failed(e)
            }
        }
    }

    /// Surface a failure and remember its text so it is never resubmitted
    async fn fail(&self, title: &str, message: &str) {
        self.guard.remember_surfaced(message);
        self.feedback.error();
        self.notifier.notify(title, message).await;
    }
}
