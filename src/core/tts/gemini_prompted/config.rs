use std::fmt;

use crate::config::SpeechConfig;

/// Default Generative Language API base URL.
pub const GEMINI_GENERATIVE_URL: &str = "https://generativelanguage.googleapis.com";

// =============================================================================
// Speech styles
// =============================================================================

/// Delivery style tags accepted in the `style` voice key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpeechStyle {
    #[default]
    Neutral,
    Cheerful,
    Calm,
    Narrator,
    Whisper,
    Excited,
}

impl SpeechStyle {
    /// Parse a style tag. Unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "neutral" => Some(Self::Neutral),
            "cheerful" | "happy" => Some(Self::Cheerful),
            "calm" | "soothing" => Some(Self::Calm),
            "narrator" | "narration" => Some(Self::Narrator),
            "whisper" | "whispered" => Some(Self::Whisper),
            "excited" => Some(Self::Excited),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Cheerful => "cheerful",
            Self::Calm => "calm",
            Self::Narrator => "narrator",
            Self::Whisper => "whisper",
            Self::Excited => "excited",
        }
    }

    /// Instruction placed before the text.
    pub const fn instruction(&self) -> &'static str {
        match self {
            Self::Neutral => "Read the following text aloud, clearly and naturally",
            Self::Cheerful => "Say cheerfully, with a warm and friendly tone",
            Self::Calm => "Say in a calm, soothing and unhurried voice",
            Self::Narrator => "Narrate in the steady, expressive voice of an audiobook narrator",
            Self::Whisper => "Whisper softly",
            Self::Excited => "Say with excitement and lots of energy",
        }
    }

    /// Full prompt sent to the model.
    pub fn prompt(&self, text: &str) -> String {
        format!("{}: {}", self.instruction(), text)
    }
}

impl fmt::Display for SpeechStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Provider configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct GeminiPromptedConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub default_voice: String,
    pub base_url: String,
}

impl GeminiPromptedConfig {
    pub fn from_speech_config(config: &SpeechConfig) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.prompted_model.clone(),
            default_voice: config.default_voice.clone(),
            base_url: config
                .generative_endpoint
                .clone()
                .unwrap_or_else(|| GEMINI_GENERATIVE_URL.to_string()),
        }
    }

    /// `{base}/v1beta/models/{model}:{method}` with any `models/` prefix folded.
    pub fn method_url(&self, model: &str, method: &str) -> String {
        let model = model.trim().trim_start_matches("models/");
        format!(
            "{}/v1beta/models/{model}:{method}",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl Default for GeminiPromptedConfig {
    fn default() -> Self {
        Self::from_speech_config(&SpeechConfig::default())
    }
}
