//! Google Cloud Text-to-Speech provider.
//!
//! One `POST {base}/v1/text:synthesize?key=…` per request, always asking for
//! LINEAR16 at 24 kHz. The REST surface returns base64 audio that usually
//! already carries a WAV header; the header is stripped and its layout becomes
//! the raw-audio descriptor so the encoder re-frames it canonically.
//!
//! Gemini's bare prebuilt voice names (`Zephyr`, `Puck`, …) are not valid
//! Cloud voice names. They are substituted through [`CHIRP3_HD_VOICES`]:
//!
//! | Requested | Sent |
//! |-----------|------|
//! | `Zephyr` | `<lang>-Chirp3-HD-Zephyr` |
//! | `en-GB-Wavenet-B` | `en-GB-Wavenet-B` (already a Cloud name) |
//! | `Nonexistent` | `<lang>-Standard-C` |

mod config;
mod provider;

pub use config::{
    CHIRP3_HD_VOICES, FALLBACK_VOICE_SUFFIX, GOOGLE_CLOUD_TTS_URL, GoogleCloudConfig,
    OUTPUT_SAMPLE_RATE, is_cloud_voice_name, language_of_voice, resolve_voice_name,
};
pub use provider::{GoogleCloudTTS, SynthesizeRequest, SynthesizeResponse};
