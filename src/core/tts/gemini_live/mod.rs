//! Gemini Live text-to-speech provider.
//!
//! Speech is produced over the Gemini Live bidirectional websocket. Every
//! request opens its own session:
//!
//! ```text
//! client                                  server
//!   │── setup {model, AUDIO, voice} ────────▶│
//!   │◀──────────────────── setupComplete ────│
//!   │── clientContent {text, turnComplete} ─▶│
//!   │◀──── serverContent.modelTurn (audio) ──│  (repeated)
//!   │◀─────────── serverContent.turnComplete │
//! ```
//!
//! The audio parts are base64 PCM (24 kHz, 16-bit, mono unless the part's
//! MIME type says otherwise).
//!
//! # Example
//!
//! ```rust,ignore
//! use speech_cache::config::SpeechConfig;
//! use speech_cache::core::tts::{GeminiLiveConfig, GeminiLiveTTS, SpeechProvider, VoiceConfig};
//!
//! let config = SpeechConfig::from_env()?;
//! let tts = GeminiLiveTTS::new(GeminiLiveConfig::from_speech_config(&config));
//! let raw = tts.synthesize("Hello!", &VoiceConfig::new().with("voiceName", "Puck")).await?;
//! ```

mod config;
pub mod messages;
mod provider;

pub use config::{
    GEMINI_LIVE_URL, GeminiLiveConfig, LIVE_OUTPUT_FORMAT, PREBUILT_VOICES, is_prebuilt_voice,
};
pub use provider::{GeminiLiveTTS, LiveClient};
