//! Composition root: the orchestrator, its providers and the audio cache.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SpeechConfig;
use crate::core::audio::to_data_url;
use crate::core::cache::{
    AudioCache, FilesystemStore, KeyValueStore, MemoryStore, RedisStore, cache_key,
};
use crate::core::errors::{SpeechError, SpeechResult};
use crate::core::orchestrator::SynthesisOrchestrator;
use crate::core::tts::VoiceConfig;

/// Open the configured store: Redis when a Redis URL or host is set, else a
/// filesystem store under `cache_path`, else an in-memory one. Nothing is
/// contacted until the first request.
pub async fn open_store(config: &SpeechConfig) -> SpeechResult<Arc<dyn KeyValueStore>> {
    if let Some(url) = config
        .redis_connection_url()
        .map_err(SpeechError::Config)?
    {
        info!("Using Redis cache store");
        return Ok(Arc::new(RedisStore::new(&url)?));
    }
    match &config.cache_path {
        Some(path) => {
            info!("Using filesystem cache store at {}", path.display());
            Ok(Arc::new(FilesystemStore::new(path.clone()).await?))
        }
        None => {
            info!("Using in-memory cache store");
            Ok(Arc::new(MemoryStore::default()))
        }
    }
}

pub struct SpeechService {
    orchestrator: SynthesisOrchestrator,
    cache: AudioCache,
    config: SpeechConfig,
}

impl SpeechService {
    pub fn new(orchestrator: SynthesisOrchestrator, cache: AudioCache, config: SpeechConfig) -> Self {
        Self {
            orchestrator,
            cache,
            config,
        }
    }

    /// Build providers from `provider_order` and open the store chosen by
    /// [`open_store`].
    pub async fn from_config(config: &SpeechConfig) -> SpeechResult<Self> {
        let orchestrator = SynthesisOrchestrator::from_config(config)?;
        let store = open_store(config).await?;
        Ok(Self::new(
            orchestrator,
            AudioCache::new(store),
            config.clone(),
        ))
    }

    pub fn orchestrator(&self) -> &SynthesisOrchestrator {
        &self.orchestrator
    }

    pub fn cache(&self) -> &AudioCache {
        &self.cache
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Deterministic key for `text` and `voice` under the configured prefix.
    pub fn cache_key_for(&self, text: &str, voice: &VoiceConfig) -> String {
        cache_key(&self.config.cache_key_prefix, text, voice)
    }

    /// Base64 WAV for `text`, served from the cache when present.
    ///
    /// `ttl_seconds` defaults to the configured cache TTL.
    pub async fn get_audio_base64(
        &self,
        text: &str,
        cache_key: &str,
        voice_config: &VoiceConfig,
        ttl_seconds: Option<i64>,
    ) -> SpeechResult<String> {
        if cache_key.trim().is_empty() {
            return Err(SpeechError::Validation("cache_key is required".to_string()));
        }
        if text.trim().is_empty() {
            return Err(SpeechError::Validation("text must not be empty".to_string()));
        }
        let ttl_seconds = ttl_seconds.unwrap_or(self.config.cache_ttl_seconds);

        info!("Speaking: {}", text);

        self.cache
            .get_or_compute(cache_key, ttl_seconds, || async {
                let outcome = self.orchestrator.synthesize(text, voice_config).await?;
                debug!(
                    "Synthesis for {} finished with provider {:?} ({} failed attempts)",
                    cache_key,
                    outcome.provider,
                    outcome.errors.len()
                );
                Ok::<_, SpeechError>(outcome.container)
            })
            .await
    }

    /// `data:<mime>;base64,<payload>` for `text`.
    ///
    /// The MIME type comes from the `mimeType` voice key, else the configured
    /// default.
    pub async fn get_audio_url(
        &self,
        text: &str,
        cache_key: &str,
        voice_config: &VoiceConfig,
        ttl_seconds: Option<i64>,
    ) -> SpeechResult<String> {
        let mime_type = voice_config
            .mime_type()
            .unwrap_or_else(|| self.config.audio_mime.clone());
        let payload = self
            .get_audio_base64(text, cache_key, voice_config, ttl_seconds)
            .await?;
        Ok(to_data_url(&mime_type, &payload))
    }
}
