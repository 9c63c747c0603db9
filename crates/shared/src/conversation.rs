//! Conversation types shared by the adapters and the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::language::infer_language;

/// User-selected capability that decides which adapter handles a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    General,
    Code,
    Image,
    Speech,
}

impl Mode {
    pub fn all() -> &'static [Mode] {
        &[Mode::General, Mode::Code, Mode::Image, Mode::Speech]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::General => "Chat",
            Mode::Code => "Code",
            Mode::Image => "Image",
            Mode::Speech => "Speech",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What a displayed turn represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnKind {
    Message,
    /// Interim turn shown while a slow request is running
    Placeholder,
    Error,
}

pub type TurnId = Uuid;

/// One message in the displayed transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
    pub mode: Mode,
    pub timestamp: DateTime<Utc>,
    /// Label of the capability (or "System Error") that produced an assistant turn
    pub model_used: Option<String>,
    /// Synthesized speech attached to an assistant turn
    pub audio_data_uri: Option<String>,
    pub kind: TurnKind,
}

impl Turn {
    pub fn user(content: impl Into<String>, mode: Mode) -> Self {
        Self::new(Role::User, content, mode, TurnKind::Message, None)
    }

    pub fn assistant(content: impl Into<String>, mode: Mode) -> Self {
        Self::new(
            Role::Assistant,
            content,
            mode,
            TurnKind::Message,
            Some(mode.display_name().to_string()),
        )
    }

    pub fn placeholder(content: impl Into<String>, mode: Mode) -> Self {
        Self::new(
            Role::Assistant,
            content,
            mode,
            TurnKind::Placeholder,
            Some(mode.display_name().to_string()),
        )
    }

    pub fn error(content: impl Into<String>, mode: Mode) -> Self {
        Self::new(
            Role::Assistant,
            content,
            mode,
            TurnKind::Error,
            Some("System Error".to_string()),
        )
    }

    fn new(
        role: Role,
        content: impl Into<String>,
        mode: Mode,
        kind: TurnKind,
        model_used: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            mode,
            timestamp: Utc::now(),
            model_used,
            audio_data_uri: None,
            kind,
        }
    }

    pub fn with_audio(mut self, audio_data_uri: impl Into<String>) -> Self {
        self.audio_data_uri = Some(audio_data_uri.into());
        self
    }
}

/// Structured message sent to chat-completions style providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Nothing to send: the {mode} request text is empty")]
    EmptyInput { mode: Mode },
}

/// A validated request for one mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ModeRequest {
    General {
        message: String,
    },
    Code {
        task_description: String,
        language: String,
    },
    Image {
        prompt: String,
    },
    Speech {
        text: String,
        voice_id: Option<String>,
    },
}

impl ModeRequest {
    /// Build the request for `mode` from raw user text.
    ///
    /// The text must be non-empty after trimming. Code requests get their
    /// language inferred from the same text.
    pub fn from_user_text(mode: Mode, text: &str) -> Result<Self, RequestError> {
        if text.trim().is_empty() {
            return Err(RequestError::EmptyInput { mode });
        }
        let text = text.to_string();
        Ok(match mode {
            Mode::General => ModeRequest::General { message: text },
            Mode::Code => ModeRequest::Code {
                language: infer_language(&text).to_string(),
                task_description: text,
            },
            Mode::Image => ModeRequest::Image { prompt: text },
            Mode::Speech => ModeRequest::Speech {
                text,
                voice_id: None,
            },
        })
    }

    pub fn mode(&self) -> Mode {
        match self {
            ModeRequest::General { .. } => Mode::General,
            ModeRequest::Code { .. } => Mode::Code,
            ModeRequest::Image { .. } => Mode::Image,
            ModeRequest::Speech { .. } => Mode::Speech,
        }
    }

    /// The user-authored text carried by the request
    pub fn text(&self) -> &str {
        match self {
            ModeRequest::General { message } => message,
            ModeRequest::Code {
                task_description, ..
            } => task_description,
            ModeRequest::Image { prompt } => prompt,
            ModeRequest::Speech { text, .. } => text,
        }
    }
}

/// Normalized adapter output, one variant per mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ProviderResult {
    Chat {
        text: String,
    },
    Code {
        code: String,
        explanation: Option<String>,
        language: String,
    },
    Image {
        image_data_uri: String,
        prompt_echoed: String,
    },
    Speech {
        /// Empty when synthesis was skipped
        audio_data_uri: String,
    },
}

impl ProviderResult {
    pub fn mode(&self) -> Mode {
        match self {
            ProviderResult::Chat { .. } => Mode::General,
            ProviderResult::Code { .. } => Mode::Code,
            ProviderResult::Image { .. } => Mode::Image,
            ProviderResult::Speech { .. } => Mode::Speech,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_blank_text() {
        for mode in Mode::all() {
            let err = ModeRequest::from_user_text(*mode, "   \n\t").unwrap_err();
            assert_eq!(err, RequestError::EmptyInput { mode: *mode });
        }
    }

    #[test]
    fn test_code_request_infers_language() {
        let req = ModeRequest::from_user_text(Mode::Code, "Write a Python script").unwrap();
        assert_eq!(
            req,
            ModeRequest::Code {
                task_description: "Write a Python script".to_string(),
                language: "python".to_string(),
            }
        );
        assert_eq!(req.mode(), Mode::Code);
        assert_eq!(req.text(), "Write a Python script");
    }

    #[test]
    fn test_turn_constructors_tag_model() {
        let turn = Turn::assistant("hi", Mode::Image);
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.model_used.as_deref(), Some("Image"));

        let err = Turn::error("boom", Mode::Code);
        assert_eq!(err.kind, TurnKind::Error);
        assert_eq!(err.model_used.as_deref(), Some("System Error"));

        let user = Turn::user("hello", Mode::General);
        assert!(user.model_used.is_none());
        assert_ne!(user.id, turn.id);
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Speech).unwrap(), "\"speech\"");
        let mode: Mode = serde_json::from_str("\"code\"").unwrap();
        assert_eq!(mode, Mode::Code);
    }
}
