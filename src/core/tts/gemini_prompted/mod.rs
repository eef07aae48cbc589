//! Gemini prompted speech generation.
//!
//! Uses the regular `streamGenerateContent` REST endpoint with an audio
//! response modality. The text is wrapped in a short delivery instruction
//! selected by the `style` voice key, which is how Gemini speech models take
//! direction.
//!
//! Response bodies are not uniform across API versions and proxies, so audio
//! is pulled out by an ordered list of extractors (see [`extract`]).

mod config;
pub mod extract;
mod provider;

pub use config::{GEMINI_GENERATIVE_URL, GeminiPromptedConfig, SpeechStyle};
pub use provider::{GeminiPromptedTTS, check_api_key};
