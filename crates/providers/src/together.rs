//! Together AI image generation.

use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::http::{base_url, ensure_success, read_json};
use crate::openai::TOGETHER_BASE_URL;

const PROVIDER: &str = "Together AI";

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    steps: u32,
    n: u32,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct TogetherImageClient {
    http: Client,
    auth_token: String,
    model: String,
    steps: u32,
    base_url: String,
}

impl TogetherImageClient {
    pub fn new(http: Client, auth_token: &str, model: &str, steps: u32, base: Option<&str>) -> Self {
        Self {
            http,
            auth_token: auth_token.to_string(),
            model: model.to_string(),
            steps,
            base_url: base_url(base, TOGETHER_BASE_URL),
        }
    }

    /// Generate exactly one image and return it base64-encoded (no data-URI prefix).
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/images/generations", self.base_url);
        let req = ImageRequest {
            model: &self.model,
            prompt,
            steps: self.steps,
            n: 1,
            response_format: "b64_json",
        };
        tracing::debug!(model = %self.model, steps = self.steps, "image generation request");
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .json(&req)
            .send()
            .await?;
        let resp = ensure_success(resp, PROVIDER).await?;
        let body: ImageResponse = read_json(resp, PROVIDER).await?;

        let datum = body.data.into_iter().next();
        match datum {
            Some(ImageDatum {
                b64_json: Some(b64),
                ..
            }) if !b64.trim().is_empty() => Ok(b64),
            Some(ImageDatum { url: Some(url), .. }) if !url.trim().is_empty() => {
                self.download(&url).await
            }
            _ => Err(ProviderError::EmptyResponse(format!(
                "{} did not return image data.",
                PROVIDER
            ))),
        }
    }

    /// Fetch a hosted image and base64-encode its bytes
    async fn download(&self, url: &str) -> Result<String, ProviderError> {
        tracing::debug!("downloading generated image from {}", url);
        let resp = self.http.get(url).send().await?;
        let resp = ensure_success(resp, PROVIDER).await?;
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::EmptyResponse(format!(
                "{} returned an empty image.",
                PROVIDER
            )));
        }
        Ok(general_purpose::STANDARD.encode(&bytes))
    }
}
