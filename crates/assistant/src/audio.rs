//! Single-slot audio playback for synthesized speech.
//!
//! The dispatcher never decodes or plays audio itself. The presentation
//! layer supplies an [`AudioBackend`]; [`AudioPlayer`] makes sure only one
//! clip is audible at a time.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use parking_lot::Mutex;
use thiserror::Error;

/// A clip that has been loaded and can be started or stopped.
pub trait PlaybackHandle: Send {
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self);
}

/// Loads audio from a `data:` URI.
pub trait AudioBackend: Send + Sync {
    fn load(&self, data_uri: &str) -> Result<Box<dyn PlaybackHandle>>;
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Could not load audio for playback: {0:#}")]
    Load(anyhow::Error),
    #[error("Could not play audio: {0:#}")]
    Play(anyhow::Error),
}

/// Owns at most one playing clip.
pub struct AudioPlayer {
    backend: Arc<dyn AudioBackend>,
    current: Mutex<Option<Box<dyn PlaybackHandle>>>,
}

impl AudioPlayer {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            current: Mutex::new(None),
        }
    }

    /// Stops whatever is playing, then starts `data_uri`.
    ///
    /// An empty URI only stops.
    pub fn play(&self, data_uri: &str) -> Result<(), PlaybackError> {
        let mut current = self.current.lock();
        if let Some(mut previous) = current.take() {
            previous.stop();
        }
        if data_uri.is_empty() {
            return Ok(());
        }

        let mut handle = self.backend.load(data_uri).map_err(PlaybackError::Load)?;
        handle.play().map_err(PlaybackError::Play)?;
        *current = Some(handle);
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(mut handle) = self.current.lock().take() {
            handle.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.lock().is_some()
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Backend for headless use. Accepts well-formed audio and plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioBackend;

struct SilentHandle;

impl PlaybackHandle for SilentHandle {
    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

impl AudioBackend for NullAudioBackend {
    fn load(&self, data_uri: &str) -> Result<Box<dyn PlaybackHandle>> {
        decode_data_uri(data_uri)?;
        Ok(Box::new(SilentHandle))
    }
}

/// Splits a base64 `data:` URI into its media type and decoded bytes.
pub fn decode_data_uri(data_uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = data_uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URI has no payload"))?;
    let media_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("data URI is not base64 encoded"))?;
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .context("invalid base64 in data URI")?;
    Ok((media_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        loaded: AtomicUsize,
        stopped: AtomicUsize,
    }

    struct CountingHandle(Arc<Counters>);

    impl PlaybackHandle for CountingHandle {
        fn play(&mut self) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self) {
            self.0.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingBackend(Arc<Counters>);

    impl AudioBackend for CountingBackend {
        fn load(&self, data_uri: &str) -> Result<Box<dyn PlaybackHandle>> {
            if data_uri.contains("broken") {
                return Err(anyhow!("unsupported format"));
            }
            self.0.loaded.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingHandle(self.0.clone())))
        }
    }

    fn player() -> (AudioPlayer, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            AudioPlayer::new(Arc::new(CountingBackend(counters.clone()))),
            counters,
        )
    }

    #[test]
    fn test_new_clip_stops_previous() {
        let (player, counters) = player();
        player.play("data:audio/mpeg;base64,AA==").unwrap();
        player.play("data:audio/mpeg;base64,AQ==").unwrap();
        assert_eq!(counters.loaded.load(Ordering::SeqCst), 2);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
        assert!(player.is_active());
    }

    #[test]
    fn test_empty_uri_only_stops() {
        let (player, counters) = player();
        player.play("data:audio/mpeg;base64,AA==").unwrap();
        player.play("").unwrap();
        assert_eq!(counters.loaded.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
        assert!(!player.is_active());
    }

    #[test]
    fn test_load_error_leaves_nothing_playing() {
        let (player, counters) = player();
        player.play("data:audio/mpeg;base64,AA==").unwrap();
        let err = player.play("data:audio/broken;base64,AA==").unwrap_err();
        assert!(matches!(err, PlaybackError::Load(_)));
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
        assert!(!player.is_active());
    }

    #[test]
    fn test_drop_stops_playback() {
        let (player, counters) = player();
        player.play("data:audio/mpeg;base64,AA==").unwrap();
        drop(player);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_decode_data_uri() {
        let (media_type, bytes) = decode_data_uri("data:audio/mpeg;base64,SUQz").unwrap();
        assert_eq!(media_type, "audio/mpeg");
        assert_eq!(bytes, b"ID3");

        assert!(decode_data_uri("https://example.com/a.mp3").is_err());
        assert!(decode_data_uri("data:audio/mpeg,plain").is_err());
        assert!(decode_data_uri("data:audio/mpeg;base64,***").is_err());
    }

    #[test]
    fn test_null_backend_validates_uri() {
        let player = AudioPlayer::new(Arc::new(NullAudioBackend));
        assert!(player.play("data:audio/mpeg;base64,SUQz").is_ok());
        assert!(matches!(
            player.play("not audio"),
            Err(PlaybackError::Load(_))
        ));
    }
}
