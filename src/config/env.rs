use std::env;
use std::path::PathBuf;

use super::utils::{non_empty, parse_list};
use super::{
    DEFAULT_AUDIO_MIME, DEFAULT_CACHE_KEY_PREFIX, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_CHECK_MODEL,
    DEFAULT_LANGUAGE_CODE, DEFAULT_LIVE_MODEL, DEFAULT_PROMPTED_MODEL,
    DEFAULT_PROVIDER_TIMEOUT_SECONDS, DEFAULT_REDIS_PORT, DEFAULT_VOICE, SpeechConfig,
    default_provider_order,
};

fn var(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

impl SpeechConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables, with sensible defaults.
    /// Also loads from .env file if present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if a numeric variable is malformed or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = SpeechConfig::default();

        // Credentials
        config.gemini_api_key = var("GEMINI_API_KEY");
        config.google_tts_api_key = var("GOOGLE_TTS_API_KEY");

        // Models and voices
        config.live_model = var("GEMINI_TTS_MODEL_NAME").unwrap_or_else(|| DEFAULT_LIVE_MODEL.to_string());
        config.prompted_model =
            var("GEMINI_PROMPTED_TTS_MODEL").unwrap_or_else(|| DEFAULT_PROMPTED_MODEL.to_string());
        config.check_model = var("GEMINI_MODEL_NAME").unwrap_or_else(|| DEFAULT_CHECK_MODEL.to_string());
        config.default_voice = var("TTS_DEFAULT_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string());
        config.default_language_code =
            var("TTS_LANGUAGE_CODE").unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string());

        // Output
        config.audio_mime = var("TTS_AUDIO_MIME").unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string());

        // Cache configuration
        config.cache_ttl_seconds = match var("TTS_CACHE_TTL_SECONDS") {
            Some(v) => v
                .parse::<i64>()
                .map_err(|e| format!("Invalid TTS_CACHE_TTL_SECONDS '{v}': {e}"))?,
            None => DEFAULT_CACHE_TTL_SECONDS,
        };
        config.cache_key_prefix =
            var("TTS_CACHE_KEY_PREFIX").unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_string());
        config.cache_path = var("CACHE_PATH").map(PathBuf::from);

        // Redis
        config.redis_url = var("REDIS_URL");
        config.redis_host = var("REDIS_HOST");
        config.redis_port = match var("REDIS_PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| format!("Invalid REDIS_PORT '{v}': {e}"))?,
            None => DEFAULT_REDIS_PORT,
        };
        config.redis_password = var("REDIS_PASSWORD");
        config.redis_db = match var("REDIS_DB") {
            Some(v) => v
                .parse::<i64>()
                .map_err(|e| format!("Invalid REDIS_DB '{v}': {e}"))?,
            None => 0,
        };

        // Orchestration
        config.provider_timeout_seconds = match var("TTS_PROVIDER_TIMEOUT_SECONDS") {
            Some(v) => v
                .parse::<u64>()
                .map_err(|e| format!("Invalid TTS_PROVIDER_TIMEOUT_SECONDS '{v}': {e}"))?,
            None => DEFAULT_PROVIDER_TIMEOUT_SECONDS,
        };
        config.provider_order = var("TTS_PROVIDER_ORDER")
            .map(|v| parse_list(&v))
            .unwrap_or_else(default_provider_order);

        // Endpoint overrides
        config.live_endpoint = var("GEMINI_LIVE_ENDPOINT");
        config.cloud_tts_endpoint = var("GOOGLE_TTS_ENDPOINT");
        config.generative_endpoint = var("GEMINI_API_ENDPOINT");

        config.validate()?;
        Ok(config)
    }
}
