mod base;
pub mod gemini_live;
pub mod gemini_prompted;
pub mod google_cloud;

use std::sync::Arc;

use phf::phf_map;

pub use base::{
    ProviderError, ProviderErrorKind, ProviderResult, SpeechProvider, SynthesisRequest,
    VoiceConfig, keys,
};
pub use gemini_live::{GEMINI_LIVE_URL, GeminiLiveConfig, GeminiLiveTTS};
pub use gemini_prompted::{
    GEMINI_GENERATIVE_URL, GeminiPromptedConfig, GeminiPromptedTTS, SpeechStyle,
};
pub use google_cloud::{GOOGLE_CLOUD_TTS_URL, GoogleCloudConfig, GoogleCloudTTS};

use crate::config::SpeechConfig;
use crate::core::errors::{SpeechError, SpeechResult};

/// Canonical backend names.
pub const GEMINI_LIVE: &str = "gemini-live";
pub const GOOGLE_CLOUD: &str = "google-cloud";
pub const GEMINI_PROMPTED: &str = "gemini-prompted";

/// Provider name/alias → canonical name
static PROVIDER_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    // Primary names
    "gemini-live" => GEMINI_LIVE,
    "google-cloud" => GOOGLE_CLOUD,
    "gemini-prompted" => GEMINI_PROMPTED,
    // Aliases
    "gemini_live" => GEMINI_LIVE,
    "live" => GEMINI_LIVE,
    "gemini" => GEMINI_LIVE,
    "google_cloud" => GOOGLE_CLOUD,
    "google" => GOOGLE_CLOUD,
    "cloud-tts" => GOOGLE_CLOUD,
    "gemini_prompted" => GEMINI_PROMPTED,
    "prompted" => GEMINI_PROMPTED,
    "gemini-tts" => GEMINI_PROMPTED,
};

/// Resolve a provider name or alias (case-insensitive) to its canonical name.
pub fn canonical_provider_name(name: &str) -> Option<&'static str> {
    let lowercase = name.trim().to_ascii_lowercase();
    PROVIDER_ALIASES.get(lowercase.as_str()).copied()
}

/// Factory function to create a speech backend by name.
///
/// # Supported Providers
///
/// - `"gemini-live"` (`"live"`, `"gemini"`) - Gemini Live websocket session
/// - `"google-cloud"` (`"google"`, `"cloud-tts"`) - Cloud Text-to-Speech REST
/// - `"gemini-prompted"` (`"prompted"`, `"gemini-tts"`) - Gemini streamGenerateContent with audio output
///
/// # Example
///
/// ```rust,ignore
/// use speech_cache::config::SpeechConfig;
/// use speech_cache::core::tts::create_tts_provider;
///
/// let config = SpeechConfig::from_env()?;
/// let provider = create_tts_provider("google-cloud", &config)?;
/// ```
pub fn create_tts_provider(
    name: &str,
    config: &SpeechConfig,
) -> SpeechResult<Arc<dyn SpeechProvider>> {
    let provider: Arc<dyn SpeechProvider> = match canonical_provider_name(name) {
        Some(GEMINI_LIVE) => Arc::new(GeminiLiveTTS::new(GeminiLiveConfig::from_speech_config(
            config,
        ))),
        Some(GOOGLE_CLOUD) => Arc::new(
            GoogleCloudTTS::new(GoogleCloudConfig::from_speech_config(config))
                .map_err(|e| SpeechError::Config(e.to_string()))?,
        ),
        Some(GEMINI_PROMPTED) => Arc::new(
            GeminiPromptedTTS::new(GeminiPromptedConfig::from_speech_config(config))
                .map_err(|e| SpeechError::Config(e.to_string()))?,
        ),
        _ => {
            return Err(SpeechError::Config(format!(
                "Unsupported TTS provider: {name}. Supported providers: {GEMINI_LIVE}, {GOOGLE_CLOUD}, {GEMINI_PROMPTED}"
            )));
        }
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_provider_name() {
        assert_eq!(canonical_provider_name("gemini-live"), Some(GEMINI_LIVE));
        assert_eq!(canonical_provider_name(" Google "), Some(GOOGLE_CLOUD));
        assert_eq!(canonical_provider_name("PROMPTED"), Some(GEMINI_PROMPTED));
        assert_eq!(canonical_provider_name("polly"), None);
        assert_eq!(canonical_provider_name(""), None);
    }

    #[test]
    fn test_create_tts_provider() {
        let config = SpeechConfig::default();

        for name in [GEMINI_LIVE, GOOGLE_CLOUD, GEMINI_PROMPTED] {
            let provider = create_tts_provider(name, &config).unwrap();
            assert_eq!(provider.name(), name);
        }

        // Aliases resolve to the canonical backend
        let provider = create_tts_provider("live", &config).unwrap();
        assert_eq!(provider.name(), GEMINI_LIVE);
    }

    #[test]
    fn test_create_tts_provider_unknown() {
        let config = SpeechConfig::default();
        let err = create_tts_provider("espeak", &config).unwrap_err();
        assert!(matches!(err, SpeechError::Config(_)));
        assert!(err.to_string().contains("espeak"));
    }
}
