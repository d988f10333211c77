//! Pipeline integration tests with in-memory collaborators
//!
//! Every platform service is replaced by a fake so the full
//! capture → guard → rephrase → clipboard flow runs without a desktop,
//! a network or a real clipboard.

use async_trait::async_trait;
use clipai::clipboard::Clipboard;
use clipai::config::{CaptureConfig, Config};
use clipai::error::{CaptureError, ClipboardError, RephraseError};
use clipai::feedback::FeedbackCue;
use clipai::guard::GuardRejection;
use clipai::keystroke::KeystrokeSimulator;
use clipai::notification::Notifier;
use clipai::pipeline::{Outcome, Pipeline, Services, Trigger};
use clipai::preferences::{PreferencesStore, Tone};
use clipai::rephrase::{RephraseRequest, Rephraser};
use clipai::state::State;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct MemoryClipboard {
    text: Mutex<Option<String>>,
    fail_next_write: AtomicBool,
}

impl MemoryClipboard {
    fn holding(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: Mutex::new(Some(text.to_string())),
            ..Default::default()
        })
    }

    fn set(&self, text: &str) {
        *self.text.lock().unwrap() = Some(text.to_string());
    }

    fn get(&self) -> Option<String> {
        self.text.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        Ok(self.get())
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(ClipboardError::WriteFailed("pasteboard locked".into()));
        }
        self.set(text);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Copies a fixed "selection" onto the clipboard when asked to copy
struct FakeSelection {
    clipboard: Arc<MemoryClipboard>,
    selection: Option<String>,
}

#[async_trait]
impl KeystrokeSimulator for FakeSelection {
    async fn simulate_copy(&self) -> Result<(), CaptureError> {
        if let Some(ref selection) = self.selection {
            self.clipboard.set(selection);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Records requests and answers from a script
struct ScriptedRephraser {
    requests: Mutex<Vec<RephraseRequest>>,
    reply: Result<String, RephraseError>,
}

impl ScriptedRephraser {
    fn replying(reply: Result<&str, RephraseError>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: reply.map(str::to_string),
        })
    }

    fn requests(&self) -> Vec<RephraseRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rephraser for ScriptedRephraser {
    async fn rephrase(&self, request: &RephraseRequest) -> Result<String, RephraseError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone().map(|text| text.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn titles(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, message: &str) {
        self.seen
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Default)]
struct CountingCue(AtomicUsize);

impl FeedbackCue for CountingCue {
    fn error(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    pipeline: Pipeline,
    clipboard: Arc<MemoryClipboard>,
    rephraser: Arc<ScriptedRephraser>,
    notifier: Arc<RecordingNotifier>,
    cue: Arc<CountingCue>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(
        clipboard: Arc<MemoryClipboard>,
        selection: Option<&str>,
        rephraser: Arc<ScriptedRephraser>,
        tone: Tone,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut preferences = PreferencesStore::load(dir.path().join("preferences.toml")).unwrap();
        preferences.set_tone(tone).unwrap();

        let mut config = Config::default();
        config.capture = CaptureConfig {
            poll_interval_ms: 1,
            max_attempts: 3,
            jitter_ms: 0,
        };
        config.guard.denylist = vec!["Do Not Send".to_string()];

        let notifier = Arc::new(RecordingNotifier::default());
        let cue = Arc::new(CountingCue::default());
        let services = Services {
            clipboard: clipboard.clone(),
            keystroke: Arc::new(FakeSelection {
                clipboard: clipboard.clone(),
                selection: selection.map(str::to_string),
            }),
            rephraser: rephraser.clone(),
            notifier: notifier.clone(),
            feedback: cue.clone(),
        };

        Self {
            pipeline: Pipeline::new(services, Arc::new(Mutex::new(preferences)), &config),
            clipboard,
            rephraser,
            notifier,
            cue,
            _dir: dir,
        }
    }

    fn cues(&self) -> usize {
        self.cue.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Guarded input
// ============================================================================

#[tokio::test]
async fn whitespace_selection_is_never_sent() {
    let clipboard = MemoryClipboard::holding("   \n\t ");
    let rephraser = ScriptedRephraser::replying(Ok("unused"));
    let h = Harness::new(clipboard, None, rephraser, Tone::Professional);

    let outcome = h.pipeline.run(Trigger::RephraseClipboard).await;

    assert_eq!(outcome, Outcome::NoSelection);
    assert!(h.rephraser.requests().is_empty());
    assert_eq!(h.cues(), 1);
    assert_eq!(h.clipboard.get().as_deref(), Some("   \n\t "));
}

#[tokio::test]
async fn empty_clipboard_after_copy_is_no_selection() {
    let clipboard = Arc::new(MemoryClipboard::default());
    let rephraser = ScriptedRephraser::replying(Ok("unused"));
    let h = Harness::new(clipboard, None, rephraser, Tone::Professional);

    let outcome = h.pipeline.run(Trigger::CopyAndRephrase).await;

    assert_eq!(outcome, Outcome::NoSelection);
    assert!(h.rephraser.requests().is_empty());
    assert!(h.notifier.titles().is_empty());
}

#[tokio::test]
async fn denylisted_text_is_rejected_case_insensitively() {
    let clipboard = MemoryClipboard::holding("Rephrasing FAILED: try again");
    let rephraser = ScriptedRephraser::replying(Ok("unused"));
    let h = Harness::new(clipboard, None, rephraser, Tone::Professional);

    let outcome = h.pipeline.run(Trigger::RephraseClipboard).await;

    assert!(matches!(outcome, Outcome::Rejected(GuardRejection::ErrorLoop { .. })));
    assert!(h.rephraser.requests().is_empty());
    assert_eq!(h.cues(), 1);
}

#[tokio::test]
async fn configured_denylist_entries_apply() {
    let clipboard = MemoryClipboard::holding("please do not send this");
    let rephraser = ScriptedRephraser::replying(Ok("unused"));
    let h = Harness::new(clipboard, None, rephraser, Tone::Professional);

    let outcome = h.pipeline.run(Trigger::RephraseClipboard).await;

    assert_eq!(
        outcome,
        Outcome::Rejected(GuardRejection::ErrorLoop {
            matched: "do not send".into()
        })
    );
}

#[tokio::test]
async fn surfaced_failure_is_not_resubmitted() {
    let clipboard = MemoryClipboard::holding("ship it friday");
    clipboard.fail_next_write.store(true, Ordering::SeqCst);
    let rephraser = ScriptedRephraser::replying(Ok("We will ship on Friday."));
    let h = Harness::new(clipboard, None, rephraser, Tone::Professional);

    let first = h.pipeline.run(Trigger::RephraseClipboard).await;
    let Outcome::WriteFailed(message) = first else {
        panic!("expected a write failure, got {:?}", first);
    };
    assert!(h.notifier.titles().contains(&"Rephrasing Failed".to_string()));

    // The user copies the notification text and triggers again
    h.clipboard.set(&message);
    let second = h.pipeline.run(Trigger::RephraseClipboard).await;

    assert!(matches!(second, Outcome::Rejected(GuardRejection::ErrorLoop { .. })));
    assert_eq!(h.rephraser.requests().len(), 1);
}

// ============================================================================
// Successful runs
// ============================================================================

#[tokio::test]
async fn copy_and_rephrase_replaces_clipboard() {
    let clipboard = MemoryClipboard::holding("old clipboard");
    let rephraser = ScriptedRephraser::replying(Ok("  I will be there at 5 PM.\n"));
    let h = Harness::new(
        clipboard,
        Some("ill be there at 5"),
        rephraser,
        Tone::Professional,
    );

    let outcome = h.pipeline.run(Trigger::CopyAndRephrase).await;

    assert_eq!(outcome, Outcome::Replaced("I will be there at 5 PM.".into()));
    assert_eq!(h.clipboard.get().as_deref(), Some("I will be there at 5 PM."));

    let requests = h.rephraser.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].text, "ill be there at 5");
    assert_eq!(requests[0].tone, Tone::Professional);

    assert_eq!(
        h.notifier.titles(),
        vec!["Rephrasing...".to_string(), "Rephrasing Complete".to_string()]
    );
    assert_eq!(h.cues(), 0);
}

#[tokio::test]
async fn repeated_triggers_issue_separate_requests() {
    let clipboard = MemoryClipboard::holding("same text");
    let rephraser = ScriptedRephraser::replying(Ok("Same text."));
    let h = Harness::new(clipboard, None, rephraser, Tone::Concise);

    // Restore the input between runs so both see identical text
    h.pipeline.run(Trigger::RephraseClipboard).await;
    h.clipboard.set("same text");
    h.pipeline.run(Trigger::RephraseClipboard).await;

    let requests = h.rephraser.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
}

#[tokio::test]
async fn tone_is_read_at_call_time() {
    let clipboard = MemoryClipboard::holding("hey whats up");
    let rephraser = ScriptedRephraser::replying(Ok("Hello."));
    let h = Harness::new(clipboard, None, rephraser, Tone::Casual);

    h.pipeline.run(Trigger::RephraseClipboard).await;

    h.pipeline
        .preferences()
        .lock()
        .unwrap()
        .set_tone(Tone::Formal)
        .unwrap();
    h.clipboard.set("hey whats up");
    h.pipeline.run(Trigger::RephraseClipboard).await;

    let tones: Vec<Tone> = h.rephraser.requests().iter().map(|r| r.tone).collect();
    assert_eq!(tones, vec![Tone::Casual, Tone::Formal]);
    assert!(h.rephraser.requests()[1].prompt().contains("formal"));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn service_failure_leaves_clipboard_and_notifies() {
    let clipboard = MemoryClipboard::holding("keep me");
    let rephraser =
        ScriptedRephraser::replying(Err(RephraseError::Service("API returned status 429".into())));
    let h = Harness::new(clipboard, None, rephraser, Tone::Friendly);

    let outcome = h.pipeline.run(Trigger::RephraseClipboard).await;

    assert!(matches!(outcome, Outcome::Failed(RephraseError::Service(_))));
    assert_eq!(h.clipboard.get().as_deref(), Some("keep me"));
    assert_eq!(
        h.notifier.titles(),
        vec!["Rephrasing...".to_string(), "Rephrasing Failed".to_string()]
    );
    assert_eq!(h.cues(), 1);
}

#[tokio::test]
async fn missing_credential_is_reported_per_call() {
    let clipboard = MemoryClipboard::holding("hello");
    let rephraser = ScriptedRephraser::replying(Err(RephraseError::MissingCredential(
        "GEMINI_API_KEY".into(),
    )));
    let h = Harness::new(clipboard, None, rephraser, Tone::Friendly);

    for _ in 0..2 {
        h.clipboard.set("hello");
        let outcome = h.pipeline.run(Trigger::RephraseClipboard).await;
        assert!(matches!(
            outcome,
            Outcome::Failed(RephraseError::MissingCredential(_))
        ));
    }
    assert_eq!(h.cues(), 2);
}

#[tokio::test]
async fn observer_sees_each_stage() {
    let clipboard = MemoryClipboard::holding("observe me");
    let rephraser = ScriptedRephraser::replying(Ok("Observed."));
    let h = Harness::new(clipboard, None, rephraser, Tone::Professional);

    let states = Mutex::new(Vec::new());
    h.pipeline
        .run_observed(Trigger::RephraseClipboard, |state| {
            states.lock().unwrap().push(state)
        })
        .await;

    assert_eq!(
        states.into_inner().unwrap(),
        vec![State::Capturing, State::Rephrasing, State::Idle]
    );
}
