pub mod conversation;
pub mod history;
pub mod language;

pub use conversation::{
    ChatMessage, Mode, ModeRequest, ProviderResult, RequestError, Role, Turn, TurnId, TurnKind,
};
pub use history::ConversationHistory;

pub mod settings {
    use anyhow::{Context, Result};
    use serde::{Deserialize, Serialize};
    use std::path::Path;

    pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM"; // ElevenLabs "Rachel"
    pub const DEFAULT_GREETING: &str = "Hello! I am OmniAssist. How can I help you with your coding tasks, image ideas, or other questions today?";

    fn default_voice_id() -> String {
        DEFAULT_VOICE_ID.to_string()
    }

    fn default_image_steps() -> u32 {
        20
    }

    fn default_timeout_secs() -> u64 {
        120
    }

    fn default_greeting() -> Option<String> {
        Some(DEFAULT_GREETING.to_string())
    }

    #[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    impl ProviderAuth {
        pub fn with_key(key: impl Into<String>) -> Self {
            Self {
                api_key: Some(key.into()),
            }
        }

        /// The configured key, ignoring blank values
        pub fn key(&self) -> Option<&str> {
            self.api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
        }
    }

    impl std::fmt::Debug for ProviderAuth {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ProviderAuth")
                .field("api_key", &self.key().map(|_| "<redacted>"))
                .finish()
        }
    }

    /// Which service answers general chat turns
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ChatBackend {
        /// Receives the history as one flattened prompt
        #[default]
        OpenAI,
        /// Receives the history as a structured message list
        Together,
        /// Receives the history as a structured message list
        DeepInfra,
    }

    impl ChatBackend {
        pub fn parse(value: &str) -> Option<Self> {
            match value.trim().to_ascii_lowercase().as_str() {
                "openai" => Some(ChatBackend::OpenAI),
                "together" | "togetherai" | "together-ai" => Some(ChatBackend::Together),
                "deepinfra" => Some(ChatBackend::DeepInfra),
                _ => None,
            }
        }

        pub fn display_name(&self) -> &'static str {
            match self {
                ChatBackend::OpenAI => "OpenAI",
                ChatBackend::Together => "Together AI",
                ChatBackend::DeepInfra => "DeepInfra",
            }
        }

        /// Environment variable holding this backend's credential
        pub fn key_var(&self) -> &'static str {
            match self {
                ChatBackend::OpenAI => OPENAI_API_KEY,
                ChatBackend::Together => TOGETHER_API_KEY,
                ChatBackend::DeepInfra => DEEPINFRA_API_KEY,
            }
        }
    }

    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const TOGETHER_API_KEY: &str = "TOGETHER_API_KEY";
    pub const DEEPINFRA_API_KEY: &str = "DEEPINFRA_API_KEY";
    pub const ELEVENLABS_API_KEY: &str = "ELEVENLABS_API_KEY";
    pub const CHAT_BACKEND_VAR: &str = "OMNIASSIST_CHAT_BACKEND";
    pub const ENABLE_TTS_VAR: &str = "OMNIASSIST_ENABLE_TTS";
    pub const VOICE_ID_VAR: &str = "OMNIASSIST_VOICE_ID";

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ModelProvider {
        pub chat_backend: ChatBackend,
        pub openai_chat_model: String,    // e.g., "gpt-3.5-turbo"
        pub openai_code_model: String,    // e.g., "gpt-4-turbo"
        pub together_chat_model: String,  // e.g., "meta-llama/Llama-3.3-70B-Instruct-Turbo"
        pub together_image_model: String, // e.g., "black-forest-labs/FLUX.1-dev"
        pub deepinfra_chat_model: String, // e.g., "meta-llama/Meta-Llama-3.1-70B-Instruct"
        pub elevenlabs_model: String,     // e.g., "eleven_multilingual_v2"

        pub openai_auth: ProviderAuth,
        pub together_auth: ProviderAuth,
        pub deepinfra_auth: ProviderAuth,
        pub elevenlabs_auth: ProviderAuth,

        // Overrides for proxies and tests; None means the public endpoint
        pub openai_base_url: Option<String>,
        pub together_base_url: Option<String>,
        pub deepinfra_base_url: Option<String>,
        pub elevenlabs_base_url: Option<String>,
    }

    impl Default for ModelProvider {
        fn default() -> Self {
            Self {
                chat_backend: ChatBackend::default(),
                openai_chat_model: "gpt-3.5-turbo".into(),
                openai_code_model: "gpt-4-turbo".into(),
                together_chat_model: "meta-llama/Llama-3.3-70B-Instruct-Turbo".into(),
                together_image_model: "black-forest-labs/FLUX.1-dev".into(),
                deepinfra_chat_model: "meta-llama/Meta-Llama-3.1-70B-Instruct".into(),
                elevenlabs_model: "eleven_multilingual_v2".into(),
                openai_auth: ProviderAuth::default(),
                together_auth: ProviderAuth::default(),
                deepinfra_auth: ProviderAuth::default(),
                elevenlabs_auth: ProviderAuth::default(),
                openai_base_url: None,
                together_base_url: None,
                deepinfra_base_url: None,
                elevenlabs_base_url: None,
            }
        }
    }

    impl ModelProvider {
        pub fn chat_auth(&self) -> &ProviderAuth {
            match self.chat_backend {
                ChatBackend::OpenAI => &self.openai_auth,
                ChatBackend::Together => &self.together_auth,
                ChatBackend::DeepInfra => &self.deepinfra_auth,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default)]
        pub model: ModelProvider,
        #[serde(default = "default_voice_id")]
        pub voice_id: String,
        #[serde(default = "default_image_steps")]
        pub image_steps: u32,
        /// Speak every assistant reply through the speech adapter
        #[serde(default)]
        pub auto_speak: bool,
        #[serde(default = "default_timeout_secs")]
        pub request_timeout_secs: u64,
        /// First assistant turn of every conversation
        #[serde(default = "default_greeting")]
        pub greeting: Option<String>,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                model: ModelProvider::default(),
                voice_id: default_voice_id(),
                image_steps: default_image_steps(),
                auto_speak: false,
                request_timeout_secs: default_timeout_secs(),
                greeting: default_greeting(),
            }
        }
    }

    impl AppSettings {
        /// Defaults overlaid with the process environment (and `.env`, if present).
        pub fn from_env() -> Self {
            if let Ok(path) = dotenvy::dotenv() {
                tracing::debug!("loaded environment from {}", path.display());
            }
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Defaults overlaid with values from `lookup`.
        pub fn from_lookup<F>(lookup: F) -> Self
        where
            F: Fn(&str) -> Option<String>,
        {
            let mut settings = Self::default();
            settings.apply_env(lookup);
            settings
        }

        /// Read settings from a JSON file. Missing fields take their defaults.
        pub fn load(path: &Path) -> Result<Self> {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            let settings: AppSettings = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid settings file {}", path.display()))?;
            Ok(settings)
        }

        /// [`AppSettings::load`] followed by the process environment overlay.
        pub fn load_with_env(path: &Path) -> Result<Self> {
            let mut settings = Self::load(path)?;
            settings.apply_env(|key| std::env::var(key).ok());
            Ok(settings)
        }

        pub fn save(&self, path: &Path) -> Result<()> {
            let raw = serde_json::to_string_pretty(self)?;
            std::fs::write(path, raw)
                .with_context(|| format!("Failed to write settings to {}", path.display()))?;
            Ok(())
        }

        /// Credentials from `lookup` only fill missing keys; the other
        /// variables override what is configured.
        pub fn apply_env<F>(&mut self, lookup: F)
        where
            F: Fn(&str) -> Option<String>,
        {
            let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

            let model = &mut self.model;
            for (auth, var) in [
                (&mut model.openai_auth, OPENAI_API_KEY),
                (&mut model.together_auth, TOGETHER_API_KEY),
                (&mut model.deepinfra_auth, DEEPINFRA_API_KEY),
                (&mut model.elevenlabs_auth, ELEVENLABS_API_KEY),
            ] {
                if auth.key().is_none() {
                    if let Some(key) = get(var) {
                        auth.api_key = Some(key);
                    }
                }
            }

            if let Some(value) = get(CHAT_BACKEND_VAR) {
                match ChatBackend::parse(&value) {
                    Some(backend) => model.chat_backend = backend,
                    None => tracing::warn!("Ignoring unknown {}={}", CHAT_BACKEND_VAR, value),
                }
            }
            if let Some(value) = get(ENABLE_TTS_VAR) {
                self.auto_speak = matches!(value.trim(), "true" | "1" | "yes");
            }
            if let Some(voice) = get(VOICE_ID_VAR) {
                self.voice_id = voice;
            }
        }
    }

}
