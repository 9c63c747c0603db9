//! OmniAssist conversation core.
//!
//! [`Dispatcher`] routes each user turn to the adapter for its mode, keeps
//! the displayed transcript and the provider-facing history in step, and
//! reports every change as a [`DispatchEvent`].

pub mod audio;
pub mod dispatcher;
pub mod events;
pub mod telemetry;
pub mod transcript;

pub use audio::{AudioBackend, AudioPlayer, NullAudioBackend, PlaybackHandle};
pub use dispatcher::{DispatchError, DispatchOutcome, Dispatcher};
pub use events::{Artifact, ArtifactKind, DispatchEvent, Notification};
pub use transcript::Transcript;
