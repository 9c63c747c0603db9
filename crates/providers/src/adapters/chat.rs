use reqwest::Client;
use shared::history;
use shared::settings::{ChatBackend, ModelProvider};
use shared::{ChatMessage, ConversationHistory, Mode, ModeRequest, ProviderResult};

use super::{wrong_mode, ModeAdapter};
use crate::error::ProviderError;
use crate::openai::{
    ChatCompletionsClient, CompletionOptions, DEEPINFRA_BASE_URL, OPENAI_BASE_URL,
    TOGETHER_BASE_URL,
};
use crate::prompts::{chat_blob_prompt, CHAT_SYSTEM_PROMPT};

/// How prior turns are presented to the chat provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStyle {
    /// Flattened into the single user message
    Blob,
    /// Rebuilt into role-tagged messages
    Structured,
}

impl From<ChatBackend> for HistoryStyle {
    fn from(backend: ChatBackend) -> Self {
        match backend {
            ChatBackend::OpenAI => HistoryStyle::Blob,
            ChatBackend::Together | ChatBackend::DeepInfra => HistoryStyle::Structured,
        }
    }
}

/// General chat against the configured backend
pub struct ChatAdapter {
    backend: ChatBackend,
    /// None when the backend's credential is missing
    client: Option<ChatCompletionsClient>,
}

impl ChatAdapter {
    pub fn from_settings(http: Client, model: &ModelProvider) -> Self {
        let backend = model.chat_backend;
        let client = model.chat_auth().key().map(|key| {
            let (provider, model_name, base, default_base) = match backend {
                ChatBackend::OpenAI => (
                    "OpenAI",
                    &model.openai_chat_model,
                    model.openai_base_url.as_deref(),
                    OPENAI_BASE_URL,
                ),
                ChatBackend::Together => (
                    "Together AI",
                    &model.together_chat_model,
                    model.together_base_url.as_deref(),
                    TOGETHER_BASE_URL,
                ),
                ChatBackend::DeepInfra => (
                    "DeepInfra",
                    &model.deepinfra_chat_model,
                    model.deepinfra_base_url.as_deref(),
                    DEEPINFRA_BASE_URL,
                ),
            };
            ChatCompletionsClient::new(http, provider, key, model_name, base, default_base)
        });
        Self { backend, client }
    }

    pub fn history_style(&self) -> HistoryStyle {
        self.backend.into()
    }

    fn build_messages(&self, history: &ConversationHistory, message: &str) -> Vec<ChatMessage> {
        match self.history_style() {
            HistoryStyle::Blob => vec![
                ChatMessage::system(CHAT_SYSTEM_PROMPT),
                ChatMessage::user(chat_blob_prompt(&history.to_blob(), message)),
            ],
            HistoryStyle::Structured => {
                let mut messages = vec![ChatMessage::system(CHAT_SYSTEM_PROMPT)];
                messages.extend(history::to_messages(&history.to_blob()));
                messages.push(ChatMessage::user(message));
                messages
            }
        }
    }
}

#[async_trait::async_trait]
impl ModeAdapter for ChatAdapter {
    fn mode(&self) -> Mode {
        Mode::General
    }

    fn name(&self) -> &str {
        self.backend.display_name()
    }

    async fn execute(
        &self,
        request: &ModeRequest,
        history: &ConversationHistory,
    ) -> Result<ProviderResult, ProviderError> {
        let ModeRequest::General { message } = request else {
            return Err(wrong_mode(self, request));
        };
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ProviderError::missing_key(self.backend.key_var()))?;

        let messages = self.build_messages(history, message);
        let text = client
            .complete(&messages, &CompletionOptions::default())
            .await?;
        Ok(ProviderResult::Chat { text })
    }
}
