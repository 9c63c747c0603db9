//! Client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! OpenAI, Together AI and DeepInfra all speak this dialect; only the base URL,
//! credential and model differ.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::ChatMessage;

use crate::error::ProviderError;
use crate::http::{base_url, ensure_success, read_json};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
pub const DEEPINFRA_BASE_URL: &str = "https://api.deepinfra.com/v1/openai";

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Sampling parameters for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    /// Ask the provider for a JSON object reply
    pub json_output: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 1.0,
            json_output: false,
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────

pub struct ChatCompletionsClient {
    http: Client,
    provider: &'static str,
    auth_token: String,
    model: String,
    base_url: String,
}

impl ChatCompletionsClient {
    pub fn new(
        http: Client,
        provider: &'static str,
        auth_token: &str,
        model: &str,
        base: Option<&str>,
        default_base: &str,
    ) -> Self {
        Self {
            http,
            provider,
            auth_token: auth_token.to_string(),
            model: model.to_string(),
            base_url: base_url(base, default_base),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` and return the first choice's text.
    ///
    /// A reply with no text is an [`ProviderError::EmptyResponse`].
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            response_format: options.json_output.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };
        tracing::debug!(
            provider = self.provider,
            model = %self.model,
            messages = messages.len(),
            "chat completion request"
        );
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await?;
        let resp = ensure_success(resp, self.provider).await?;
        let body: ChatCompletionResponse = read_json(resp, self.provider).await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse(format!(
                "{} returned an empty response.",
                self.provider
            )));
        }
        Ok(text)
    }
}
