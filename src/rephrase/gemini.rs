//! Rephrasing via the Google Generative Language API
//!
//! Sends a single-turn `generateContent` request and joins the text parts
//! of the first candidate. The API key is looked up on every call, so a
//! missing key is reported as an error for that call and never stops the
//! process.

use super::{preview, RephraseRequest, Rephraser};
use crate::config::GeminiConfig;
use crate::error::RephraseError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

type KeyLookup = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiRephraser {
    /// Base endpoint URL (e.g., "https://generativelanguage.googleapis.com")
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: KeyLookup,
    generation: GenerationConfig,
    timeout: Duration,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl GeminiRephraser {
    /// Create a client reading its key from the configured environment variable
    pub fn new(config: &GeminiConfig) -> Self {
        let api_key_env = config.api_key_env.clone();
        let lookup_var = api_key_env.clone();

        if config.endpoint.starts_with("http://")
            && !config.endpoint.contains("localhost")
            && !config.endpoint.contains("127.0.0.1")
        {
            tracing::warn!("Rephrase endpoint uses HTTP without TLS. Text and API key are sent unencrypted!");
        }

        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key_env,
            api_key: Arc::new(move || std::env::var(&lookup_var).ok()),
            generation: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
            },
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Replace the key lookup (the environment by default)
    pub fn with_api_key_source<F>(mut self, lookup: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.api_key = Arc::new(lookup);
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    fn api_key(&self) -> Result<String, RephraseError> {
        (self.api_key)()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RephraseError::MissingCredential(self.api_key_env.clone()))
    }

    /// Perform the HTTP call (blocking, for use in spawn_blocking)
    fn call_blocking(&self, prompt: &str, api_key: &str) -> Result<String, RephraseError> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();

        let body = GenerateRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: self.generation,
        };

        let response = agent
            .post(&self.url())
            .set("x-goog-api-key", api_key)
            .set("Content-Type", "application/json")
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                        .map(|env| env.error.message)
                        .unwrap_or(body);
                    RephraseError::Service(format!("API returned status {}: {}", code, message.trim()))
                }
                ureq::Error::Transport(t) => RephraseError::Service(t.to_string()),
            })?;

        let parsed: GenerateResponse = response
            .into_json()
            .map_err(|e| RephraseError::Service(format!("Failed to parse response: {}", e)))?;

        extract_text(parsed)
    }
}

/// Join the text parts of the first candidate and trim
fn extract_text(response: GenerateResponse) -> Result<String, RephraseError> {
    if let Some(error) = response.error {
        return Err(RephraseError::Service(error.message));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(RephraseError::EmptyResponse);
    }

    Ok(text.to_string())
}

#[async_trait::async_trait]
impl Rephraser for GeminiRephraser {
    async fn rephrase(&self, request: &RephraseRequest) -> Result<String, RephraseError> {
        let api_key = self.api_key()?;
        let prompt = request.prompt();

        tracing::debug!(
            "Requesting {} rephrase from {} ({} chars): {:?}",
            request.tone.as_str(),
            self.model,
            request.text.chars().count(),
            preview(&request.text)
        );

        let start = std::time::Instant::now();
        let client = self.clone();
        let text = tokio::task::spawn_blocking(move || client.call_blocking(&prompt, &api_key))
            .await
            .map_err(|e| RephraseError::Service(format!("Task join error: {}", e)))??;

        tracing::info!(
            "Rephrase completed in {:.2}s: {:?}",
            start.elapsed().as_secs_f32(),
            preview(&text)
        );

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

impl std::fmt::Debug for GeminiRephraser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiRephraser")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key_env", &self.api_key_env)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
