//! Configuration for the Gemini Live backend.

use crate::config::SpeechConfig;

/// Default Live API websocket endpoint (v1beta, required for native audio models).
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Descriptor used when an audio part carries no MIME type.
pub const LIVE_OUTPUT_FORMAT: &str = "pcm;rate=24000";

/// Prebuilt voices exposed by Gemini speech models.
pub const PREBUILT_VOICES: &[&str] = &[
    "Zephyr",
    "Puck",
    "Charon",
    "Kore",
    "Fenrir",
    "Leda",
    "Orus",
    "Aoede",
    "Callirrhoe",
    "Autonoe",
    "Enceladus",
    "Iapetus",
    "Umbriel",
    "Algieba",
    "Despina",
    "Erinome",
    "Algenib",
    "Rasalgethi",
    "Laomedeia",
    "Achernar",
    "Alnilam",
    "Schedar",
    "Gacrux",
    "Pulcherrima",
    "Achird",
    "Zubenelgenubi",
    "Vindemiatrix",
    "Sadachbia",
    "Sadaltager",
    "Sulafat",
];

/// Case-insensitive membership test against [`PREBUILT_VOICES`].
pub fn is_prebuilt_voice(voice: &str) -> bool {
    let voice = voice.trim();
    PREBUILT_VOICES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(voice))
}

/// Prefix `model` with `models/` unless it already carries it.
pub(crate) fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[derive(Debug, Clone)]
pub struct GeminiLiveConfig {
    /// `None` is reported as a missing credential on first use
    pub api_key: Option<String>,
    pub model: String,
    pub default_voice: String,
    pub endpoint: String,
}

impl GeminiLiveConfig {
    pub fn from_speech_config(config: &SpeechConfig) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.live_model.clone(),
            default_voice: config.default_voice.clone(),
            endpoint: config
                .live_endpoint
                .clone()
                .unwrap_or_else(|| GEMINI_LIVE_URL.to_string()),
        }
    }

    /// Fully qualified model for a request, honoring a per-request override.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        qualified_model(requested.unwrap_or(&self.model))
    }
}

impl Default for GeminiLiveConfig {
    fn default() -> Self {
        Self::from_speech_config(&SpeechConfig::default())
    }
}
