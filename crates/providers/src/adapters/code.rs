use reqwest::Client;
use serde::Deserialize;
use shared::settings::{ModelProvider, OPENAI_API_KEY};
use shared::{ChatMessage, ConversationHistory, Mode, ModeRequest, ProviderResult};

use super::{wrong_mode, ModeAdapter};
use crate::decode::decode_json;
use crate::error::ProviderError;
use crate::openai::{ChatCompletionsClient, CompletionOptions, OPENAI_BASE_URL};
use crate::prompts::{code_system_prompt, code_user_prompt};

/// Shape the model is instructed to reply with
#[derive(Debug, Deserialize)]
struct GeneratedCode {
    #[serde(rename = "generatedCode")]
    generated_code: String,
    #[serde(default)]
    explanation: Option<String>,
}

/// Code generation through OpenAI with a JSON reply contract
pub struct CodeAdapter {
    client: Option<ChatCompletionsClient>,
}

impl CodeAdapter {
    pub fn from_settings(http: Client, model: &ModelProvider) -> Self {
        let client = model.openai_auth.key().map(|key| {
            ChatCompletionsClient::new(
                http,
                "OpenAI",
                key,
                &model.openai_code_model,
                model.openai_base_url.as_deref(),
                OPENAI_BASE_URL,
            )
        });
        Self { client }
    }
}

#[async_trait::async_trait]
impl ModeAdapter for CodeAdapter {
    fn mode(&self) -> Mode {
        Mode::Code
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn execute(
        &self,
        request: &ModeRequest,
        _history: &ConversationHistory,
    ) -> Result<ProviderResult, ProviderError> {
        let ModeRequest::Code {
            task_description,
            language,
        } = request
        else {
            return Err(wrong_mode(self, request));
        };
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ProviderError::missing_key(OPENAI_API_KEY))?;

        let messages = [
            ChatMessage::system(code_system_prompt()),
            ChatMessage::user(code_user_prompt(task_description, language)),
        ];
        let options = CompletionOptions {
            max_tokens: 2048,
            json_output: true,
            ..Default::default()
        };
        let raw = client.complete(&messages, &options).await?;
        let parsed: GeneratedCode = decode_json(&raw)?;

        Ok(ProviderResult::Code {
            code: parsed.generated_code,
            explanation: parsed.explanation.filter(|e| !e.trim().is_empty()),
            language: language.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::build_client;
    use crate::test_support::{MockResponse, MockServer};
    use shared::settings::ProviderAuth;
    use std::time::Duration;

    fn adapter(server: &MockServer) -> CodeAdapter {
        let model = ModelProvider {
            openai_auth: ProviderAuth::with_key("sk"),
            openai_base_url: Some(server.url("/v1")),
            ..Default::default()
        };
        CodeAdapter::from_settings(build_client(Duration::from_secs(5)).unwrap(), &model)
    }

    /// Wrap `content` the way the chat completions API returns it
    fn reply(content: &str) -> MockResponse {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        MockResponse::json(200, &body.to_string())
    }

    fn request() -> ModeRequest {
        ModeRequest::from_user_text(Mode::Code, "add two numbers in python").unwrap()
    }

    #[tokio::test]
    async fn test_json_reply() {
        let server = MockServer::start(vec![reply(
            r#"{"generatedCode":"def add(a, b):\n    return a + b","explanation":"Adds."}"#,
        )]);
        let result = adapter(&server)
            .execute(&request(), &ConversationHistory::new())
            .await
            .unwrap();
        assert_eq!(
            result,
            ProviderResult::Code {
                code: "def add(a, b):\n    return a + b".into(),
                explanation: Some("Adds.".into()),
                language: "python".into(),
            }
        );

        let body = server.next_request().json();
        assert_eq!(body["model"], "gpt-4-turbo");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(
            body["messages"][1]["content"],
            "Task Description: add two numbers in python\nProgramming Language: python"
        );
    }

    #[tokio::test]
    async fn test_fenced_reply_without_explanation() {
        let server = MockServer::start(vec![reply(
            "```json\n{\"generatedCode\": \"print(1)\", \"language\": \"python\"}\n```",
        )]);
        let result = adapter(&server)
            .execute(&request(), &ConversationHistory::new())
            .await
            .unwrap();
        match result {
            ProviderResult::Code {
                code, explanation, ..
            } => {
                assert_eq!(code, "print(1)");
                assert!(explanation.is_none());
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_is_malformed() {
        let server = MockServer::start(vec![reply("Here is some code: print(1)")]);
        let err = adapter(&server)
            .execute(&request(), &ConversationHistory::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_malformed() {
        let server = MockServer::start(vec![reply(r#"{"generatedCode": ["not", "a", "string"]}"#)]);
        let err = adapter(&server)
            .execute(&request(), &ConversationHistory::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let adapter = CodeAdapter::from_settings(
            build_client(Duration::from_secs(5)).unwrap(),
            &ModelProvider::default(),
        );
        let err = adapter
            .execute(&request(), &ConversationHistory::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
