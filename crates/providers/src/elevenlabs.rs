//! ElevenLabs text-to-speech.

use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

use crate::error::ProviderError;
use crate::http::{base_url, ensure_success};

pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

pub struct ElevenLabsClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(http: Client, api_key: &str, model: &str, base: Option<&str>) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url(base, ELEVENLABS_BASE_URL),
        }
    }

    /// Synthesize `text` and return the full MPEG audio body.
    ///
    /// Any failure is wrapped as `ElevenLabs API error: <cause>`.
    pub async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ProviderError> {
        self.synthesize_inner(text, voice_id)
            .await
            .map_err(|e| match e {
                ProviderError::Transport(cause) => {
                    ProviderError::Transport(format!("ElevenLabs API error: {}", cause))
                }
                other => other,
            })
    }

    async fn synthesize_inner(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/text-to-speech/{}", self.base_url, voice_id);
        let req = SpeechRequest {
            text,
            model_id: &self.model,
        };
        tracing::debug!(voice_id, model = %self.model, chars = text.len(), "speech request");
        let resp = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&req)
            .send()
            .await?;
        let resp = ensure_success(resp, "elevenlabs").await?;

        let mut audio = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes =
                chunk.map_err(|e| ProviderError::Transport(format!("stream read error: {}", e)))?;
            audio.extend_from_slice(&bytes);
        }
        if audio.is_empty() {
            return Err(ProviderError::EmptyResponse(
                "ElevenLabs returned no audio.".to_string(),
            ));
        }
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::build_client;
    use crate::test_support::{MockResponse, MockServer};
    use std::time::Duration;

    fn client(server: &MockServer) -> ElevenLabsClient {
        ElevenLabsClient::new(
            build_client(Duration::from_secs(5)).unwrap(),
            "el-key",
            "eleven_multilingual_v2",
            Some(&server.url("/v1")),
        )
    }

    #[tokio::test]
    async fn test_buffers_whole_body() {
        let audio: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
        let server = MockServer::start(vec![MockResponse::bytes(200, "audio/mpeg", audio.clone())]);

        let got = client(&server).synthesize("Hello", "voice-1").await.unwrap();
        assert_eq!(got, audio);

        let req = server.next_request();
        assert_eq!(req.path, "/v1/text-to-speech/voice-1");
        assert_eq!(req.header("xi-api-key"), Some("el-key"));
        assert_eq!(req.json()["model_id"], "eleven_multilingual_v2");
    }

    #[tokio::test]
    async fn test_failure_is_wrapped() {
        let server = MockServer::start(vec![MockResponse::json(401, r#"{"detail":"bad key"}"#)]);
        let err = client(&server).synthesize("Hello", "voice-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().starts_with("ElevenLabs API error: "));
    }

    #[tokio::test]
    async fn test_empty_audio_is_empty_response() {
        let server = MockServer::start(vec![MockResponse::bytes(200, "audio/mpeg", Vec::new())]);
        let err = client(&server).synthesize("Hello", "voice-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(err.to_string(), "ElevenLabs returned no audio.");
    }
}
