use thiserror::Error;

/// Failure of one adapter call
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Missing credential or unusable configuration
    #[error("{0}")]
    Config(String),

    /// The provider answered, but not in a shape we could decode
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, payload: String },

    /// The provider answered successfully with nothing usable
    #[error("{0}")]
    EmptyResponse(String),

    /// Network failure or non-success status from the provider
    #[error("{0}")]
    Transport(String),
}

/// Coarse classification used for logging and notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    MalformedResponse,
    EmptyResponse,
    Transport,
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Config(_) => ErrorKind::Config,
            ProviderError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            ProviderError::EmptyResponse(_) => ErrorKind::EmptyResponse,
            ProviderError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Text safe to show in the transcript.
    ///
    /// Raw provider payloads are never included.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Config(msg) => msg.clone(),
            ProviderError::MalformedResponse { .. } => {
                "The AI returned a response I couldn't understand. Please try again.".to_string()
            }
            ProviderError::EmptyResponse(msg) => msg.clone(),
            ProviderError::Transport(msg) => format!("Provider request failed: {}", msg),
        }
    }

    pub(crate) fn missing_key(var: &str) -> Self {
        ProviderError::Config(format!(
            "{} is not set in the environment variables. Please add it to your .env file.",
            var
        ))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}
