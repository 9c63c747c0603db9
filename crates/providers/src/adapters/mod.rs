//! One adapter per [`Mode`], all behind [`ModeAdapter`].

pub mod chat;
pub mod code;
pub mod image;
pub mod speech;

pub use chat::{ChatAdapter, HistoryStyle};
pub use code::CodeAdapter;
pub use image::ImageAdapter;
pub use speech::SpeechAdapter;

use shared::{ConversationHistory, Mode, ModeRequest, ProviderResult};

use crate::error::ProviderError;

/// Wraps one provider capability behind the common dispatch contract.
///
/// Calls are never retried; the only timeout is the HTTP client's.
#[async_trait::async_trait]
pub trait ModeAdapter: Send + Sync {
    /// The mode this adapter serves
    fn mode(&self) -> Mode;

    /// Human-readable provider name, for logs
    fn name(&self) -> &str;

    async fn execute(
        &self,
        request: &ModeRequest,
        history: &ConversationHistory,
    ) -> Result<ProviderResult, ProviderError>;
}

pub(crate) fn wrong_mode(adapter: &dyn ModeAdapter, request: &ModeRequest) -> ProviderError {
    ProviderError::Config(format!(
        "The {} adapter cannot handle {} requests.",
        adapter.mode(),
        request.mode()
    ))
}
