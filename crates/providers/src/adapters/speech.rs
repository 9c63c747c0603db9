use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use shared::settings::ModelProvider;
use shared::{ConversationHistory, Mode, ModeRequest, ProviderResult};

use super::{wrong_mode, ModeAdapter};
use crate::elevenlabs::ElevenLabsClient;
use crate::error::ProviderError;

/// Text-to-speech through ElevenLabs.
///
/// Without a credential, or for blank text, synthesis is skipped and the
/// result carries an empty audio URI. That is not an error.
pub struct SpeechAdapter {
    client: Option<ElevenLabsClient>,
    default_voice: String,
}

impl SpeechAdapter {
    pub fn from_settings(http: Client, model: &ModelProvider, default_voice: &str) -> Self {
        let client = model.elevenlabs_auth.key().map(|key| {
            ElevenLabsClient::new(
                http,
                key,
                &model.elevenlabs_model,
                model.elevenlabs_base_url.as_deref(),
            )
        });
        Self {
            client,
            default_voice: default_voice.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn skipped() -> ProviderResult {
        ProviderResult::Speech {
            audio_data_uri: String::new(),
        }
    }
}

#[async_trait::async_trait]
impl ModeAdapter for SpeechAdapter {
    fn mode(&self) -> Mode {
        Mode::Speech
    }

    fn name(&self) -> &str {
        "ElevenLabs"
    }

    async fn execute(
        &self,
        request: &ModeRequest,
        _history: &ConversationHistory,
    ) -> Result<ProviderResult, ProviderError> {
        let ModeRequest::Speech { text, voice_id } = request else {
            return Err(wrong_mode(self, request));
        };
        let Some(client) = &self.client else {
            tracing::warn!("ElevenLabs API key not configured. Skipping TTS.");
            return Ok(Self::skipped());
        };
        if text.trim().is_empty() {
            tracing::warn!("Empty text provided for TTS. Skipping.");
            return Ok(Self::skipped());
        }

        let voice = voice_id
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(&self.default_voice);
        let audio = client.synthesize(text, voice).await?;
        Ok(ProviderResult::Speech {
            audio_data_uri: format!(
                "data:audio/mpeg;base64,{}",
                general_purpose::STANDARD.encode(&audio)
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::build_client;
    use crate::test_support::{MockResponse, MockServer};
    use shared::settings::{ProviderAuth, DEFAULT_VOICE_ID};
    use std::time::Duration;

    fn speech(text: &str, voice_id: Option<&str>) -> ModeRequest {
        ModeRequest::Speech {
            text: text.into(),
            voice_id: voice_id.map(str::to_string),
        }
    }

    fn adapter(server: &MockServer) -> SpeechAdapter {
        let model = ModelProvider {
            elevenlabs_auth: ProviderAuth::with_key("el"),
            elevenlabs_base_url: Some(server.url("/v1")),
            ..Default::default()
        };
        SpeechAdapter::from_settings(
            build_client(Duration::from_secs(5)).unwrap(),
            &model,
            DEFAULT_VOICE_ID,
        )
    }

    #[tokio::test]
    async fn test_without_key_skips() {
        let adapter = SpeechAdapter::from_settings(
            build_client(Duration::from_secs(5)).unwrap(),
            &ModelProvider::default(),
            DEFAULT_VOICE_ID,
        );
        assert!(!adapter.is_enabled());
        let result = adapter
            .execute(&speech("Hello", None), &ConversationHistory::new())
            .await
            .unwrap();
        assert_eq!(result, SpeechAdapter::skipped());
    }

    #[tokio::test]
    async fn test_blank_text_skips_without_calling_provider() {
        // No responses queued: any request would fail the test
        let server = MockServer::start(vec![]);
        let result = adapter(&server)
            .execute(&speech("  \n ", None), &ConversationHistory::new())
            .await
            .unwrap();
        assert_eq!(result, SpeechAdapter::skipped());
    }

    #[tokio::test]
    async fn test_audio_becomes_data_uri() {
        let server = MockServer::start(vec![MockResponse::bytes(
            200,
            "audio/mpeg",
            b"ID3audio".to_vec(),
        )]);
        let result = adapter(&server)
            .execute(&speech("Hello", None), &ConversationHistory::new())
            .await
            .unwrap();
        assert_eq!(
            result,
            ProviderResult::Speech {
                audio_data_uri: format!(
                    "data:audio/mpeg;base64,{}",
                    general_purpose::STANDARD.encode(b"ID3audio")
                ),
            }
        );
        assert_eq!(
            server.next_request().path,
            format!("/v1/text-to-speech/{}", DEFAULT_VOICE_ID)
        );
    }

    #[tokio::test]
    async fn test_explicit_voice() {
        let server = MockServer::start(vec![MockResponse::bytes(200, "audio/mpeg", vec![1, 2])]);
        adapter(&server)
            .execute(&speech("Hi", Some("custom")), &ConversationHistory::new())
            .await
            .unwrap();
        assert_eq!(server.next_request().path, "/v1/text-to-speech/custom");
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let server = MockServer::start(vec![MockResponse::json(500, "")]);
        let err = adapter(&server)
            .execute(&speech("Hello", None), &ConversationHistory::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().starts_with("ElevenLabs API error"));
    }
}
