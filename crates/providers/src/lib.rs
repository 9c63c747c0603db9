//! Provider adapters for OmniAssist: one per mode, each talking to a
//! single hosted model API.

pub mod adapters;
pub mod decode;
pub mod elevenlabs;
pub mod error;
pub mod http;
pub mod openai;
pub mod prompts;
pub mod router;
pub mod together;

#[cfg(test)]
mod test_support;

pub use adapters::ModeAdapter;
pub use error::{ErrorKind, ProviderError};
pub use router::AdapterRegistry;
