use reqwest::Client;
use shared::settings::{ModelProvider, TOGETHER_API_KEY};
use shared::{ConversationHistory, Mode, ModeRequest, ProviderResult};

use super::{wrong_mode, ModeAdapter};
use crate::error::ProviderError;
use crate::together::TogetherImageClient;

pub struct ImageAdapter {
    client: Option<TogetherImageClient>,
}

impl ImageAdapter {
    pub fn from_settings(http: Client, model: &ModelProvider, steps: u32) -> Self {
        let client = model.together_auth.key().map(|key| {
            TogetherImageClient::new(
                http,
                key,
                &model.together_image_model,
                steps,
                model.together_base_url.as_deref(),
            )
        });
        Self { client }
    }
}

#[async_trait::async_trait]
impl ModeAdapter for ImageAdapter {
    fn mode(&self) -> Mode {
        Mode::Image
    }

    fn name(&self) -> &str {
        "Together AI"
    }

    async fn execute(
        &self,
        request: &ModeRequest,
        _history: &ConversationHistory,
    ) -> Result<ProviderResult, ProviderError> {
        let ModeRequest::Image { prompt } = request else {
            return Err(wrong_mode(self, request));
        };
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ProviderError::missing_key(TOGETHER_API_KEY))?;

        let b64 = client.generate(prompt).await?;
        Ok(ProviderResult::Image {
            image_data_uri: format!("data:image/png;base64,{}", b64),
            prompt_echoed: prompt.clone(),
        })
    }
}
