//! Tone-adjusted rephrasing
//!
//! Turns captured text plus the selected tone into a single instruction,
//! sends it to a generative-text service, and returns the rewritten text.
//! One request per call: no retries, no streaming, no caching.
//!
//! # Backends
//!
//! - **Gemini**: Google Generative Language API (`generateContent`)

pub mod gemini;

use crate::config::GeminiConfig;
use crate::error::RephraseError;
use crate::preferences::Tone;

pub use gemini::GeminiRephraser;

/// Text to rephrase and the tone to rephrase it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RephraseRequest {
    pub text: String,
    pub tone: Tone,
}

impl RephraseRequest {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    /// Instruction sent to the service
    pub fn prompt(&self) -> String {
        build_prompt(&self.text, self.tone)
    }
}

/// Trait for rephrasing backends
#[async_trait::async_trait]
pub trait Rephraser: Send + Sync {
    /// Rephrase the request text, returning the trimmed, non-empty reply
    async fn rephrase(&self, request: &RephraseRequest) -> Result<String, RephraseError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Build the instruction that asks for a single rewrite in `tone`
pub fn build_prompt(text: &str, tone: Tone) -> String {
    format!(
        "Please rephrase the following text in a {} manner. \
         Just return the rephrased text, no other text or comment. \
         Only return one option, no other options. Don't return an array. \
         Here is the text to rephrase: {}",
        tone.as_str(),
        text
    )
}

/// Create the configured rephraser
pub fn create_rephraser(config: &GeminiConfig) -> Box<dyn Rephraser> {
    Box::new(GeminiRephraser::new(config))
}

/// Short single-line preview for logs
pub(crate) fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() > 50 {
        format!("{}...", flat.chars().take(50).collect::<String>())
    } else {
        flat
    }
}
