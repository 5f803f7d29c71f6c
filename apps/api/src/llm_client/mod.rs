/// LLM Client — the single point of entry for all generative-language API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All LLM interactions MUST go through a `GenerativeModel`.
///
/// Model: gemini-1.5-flash (hardcoded — do not make configurable to prevent drift)
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all LLM calls.
pub const MODEL: &str = "gemini-1.5-flash";

/// Finish reasons that mean the provider refused to produce content.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Blocked by provider: {reason}")]
    Blocked { reason: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Request model (provider independent)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Raw bytes sent alongside the prompt, e.g. an uploaded PDF for remote OCR.
    InlineData { mime_type: String, data: Bytes },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Option<Role>,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some(Role::User),
            parts,
        }
    }
}

/// Which provider-side content filters to request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SafetyProfile {
    /// Provider defaults.
    #[default]
    Default,
    /// Block harassment and hate speech at low probability and above.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub safety: SafetyProfile,
}

impl GenerateRequest {
    /// A single-turn request made of the given segments, in order.
    pub fn single_turn(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content::user(parts)],
            safety: SafetyProfile::Default,
        }
    }
}

/// A "generate content" capable model. Implemented by `GeminiClient`;
/// tests substitute scripted implementations.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiBlob>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl From<&GenerateRequest> for GeminiRequest {
    fn from(request: &GenerateRequest) -> Self {
        let contents = request
            .contents
            .iter()
            .map(|content| GeminiContent {
                role: content.role,
                parts: content.parts.iter().map(GeminiPart::from).collect(),
            })
            .collect();

        let safety_settings = match request.safety {
            SafetyProfile::Default => Vec::new(),
            SafetyProfile::Strict => vec![
                GeminiSafetySetting {
                    category: "HARM_CATEGORY_HARASSMENT",
                    threshold: "BLOCK_LOW_AND_ABOVE",
                },
                GeminiSafetySetting {
                    category: "HARM_CATEGORY_HATE_SPEECH",
                    threshold: "BLOCK_LOW_AND_ABOVE",
                },
            ],
        };

        Self {
            contents,
            safety_settings,
        }
    }
}

impl From<&Part> for GeminiPart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => GeminiPart {
                text: Some(text.clone()),
                inline_data: None,
            },
            Part::InlineData { mime_type, data } => GeminiPart {
                text: None,
                inline_data: Some(GeminiBlob {
                    mime_type: mime_type.clone(),
                    data: BASE64.encode(data),
                }),
            },
        }
    }
}

/// Pulls the generated text out of a response, surfacing provider refusals as `Blocked`.
fn response_text(response: GeminiResponse) -> Result<String, LlmError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::Blocked { reason });
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyContent)?;

    if let Some(reason) = candidate
        .finish_reason
        .filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str()))
    {
        return Err(LlmError::Blocked { reason });
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(text)
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Gemini `generateContent` endpoint. No retries: callers decide.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        let url = format!("{GEMINI_API_BASE}/{MODEL}:generateContent");
        let body = GeminiRequest::from(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        if let Some(usage) = &gemini_response.usage_metadata {
            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        response_text(gemini_response)
    }
}
