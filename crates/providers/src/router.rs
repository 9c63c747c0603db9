use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use shared::settings::AppSettings;
use shared::Mode;

use crate::adapters::{ChatAdapter, CodeAdapter, ImageAdapter, ModeAdapter, SpeechAdapter};
use crate::error::ProviderError;
use crate::http::build_client;

/// Mode-keyed adapter lookup. Each mode has at most one adapter.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Mode, Arc<dyn ModeAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four stock adapters sharing one HTTP client.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, ProviderError> {
        let http = build_client(Duration::from_secs(settings.request_timeout_secs))?;
        let model = &settings.model;

        let mut registry = Self::new();
        registry.register(Arc::new(ChatAdapter::from_settings(http.clone(), model)));
        registry.register(Arc::new(CodeAdapter::from_settings(http.clone(), model)));
        registry.register(Arc::new(ImageAdapter::from_settings(
            http.clone(),
            model,
            settings.image_steps,
        )));
        registry.register(Arc::new(SpeechAdapter::from_settings(
            http,
            model,
            &settings.voice_id,
        )));

        for adapter in registry.adapters.values() {
            tracing::debug!("registered {} adapter: {}", adapter.mode(), adapter.name());
        }
        Ok(registry)
    }

    /// Registers `adapter` under its own mode, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ModeAdapter>) -> Option<Arc<dyn ModeAdapter>> {
        self.adapters.insert(adapter.mode(), adapter)
    }

    pub fn get(&self, mode: Mode) -> Option<Arc<dyn ModeAdapter>> {
        self.adapters.get(&mode).cloned()
    }

    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.adapters.keys().copied()
    }
}
