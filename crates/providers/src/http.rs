use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ProviderError;

/// Longest slice of an error body carried into the error message
const ERROR_DETAIL_CHARS: usize = 800;

/// HTTP client used by every adapter built from one settings value.
pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(2)
        .build()
        .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Pass successful responses through; turn anything else into a transport error
/// carrying the status and the start of the body.
pub async fn ensure_success(resp: Response, provider: &str) -> Result<Response, ProviderError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let detail: String = body.trim().chars().take(ERROR_DETAIL_CHARS).collect();
    if detail.is_empty() {
        return Err(ProviderError::Transport(format!("{} error: {}", provider, status)));
    }
    Err(ProviderError::Transport(format!(
        "{} error: {}\n{}",
        provider, status, detail
    )))
}

/// Read a successful response body and decode it as `T`.
///
/// Read failures are transport errors; a body that is not the expected JSON
/// envelope is a malformed response carrying the raw body.
pub async fn read_json<T: DeserializeOwned>(
    resp: Response,
    provider: &str,
) -> Result<T, ProviderError> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(payload = %body, "{} sent an undecodable body", provider);
        ProviderError::MalformedResponse {
            message: format!("{} response could not be decoded: {}", provider, e),
            payload: body,
        }
    })
}

/// `base` without a trailing slash, or `default` when unset
pub fn base_url(base: Option<&str>, default: &str) -> String {
    base.unwrap_or(default).trim_end_matches('/').to_string()
}
