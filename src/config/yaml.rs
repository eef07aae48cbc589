use serde::Deserialize;
use std::path::PathBuf;

use super::SpeechConfig;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override whatever the environment supplied.
///
/// # Example YAML structure
/// ```yaml
/// providers:
///   gemini_api_key: "your-gemini-key"
///   google_tts_api_key: "your-cloud-tts-key"
///
/// models:
///   live: "gemini-2.5-flash-native-audio-preview-12-2025"
///   prompted: "gemini-2.5-flash-preview-tts"
///   check: "gemini-3-flash-preview"
///
/// voice:
///   default_voice: "Zephyr"
///   language_code: "en-US"
///   audio_mime: "audio/wav"
///
/// cache:
///   path: "/var/cache/speech-cache"
///   ttl_seconds: 86400
///   key_prefix: "tts"
///
/// redis:
///   url: "redis://localhost:6379/0"
///   # or host / port / password / db
///
/// orchestration:
///   provider_timeout_seconds: 30
///   provider_order:
///     - gemini-live
///     - google-cloud
///     - gemini-prompted
///
/// endpoints:
///   live: "wss://generativelanguage.googleapis.com"
///   cloud_tts: "https://texttospeech.googleapis.com"
///   generative: "https://generativelanguage.googleapis.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub providers: Option<ProvidersYaml>,
    pub models: Option<ModelsYaml>,
    pub voice: Option<VoiceYaml>,
    pub cache: Option<CacheYaml>,
    pub redis: Option<RedisYaml>,
    pub orchestration: Option<OrchestrationYaml>,
    pub endpoints: Option<EndpointsYaml>,
}

/// Provider API keys from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub gemini_api_key: Option<String>,
    pub google_tts_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelsYaml {
    pub live: Option<String>,
    pub prompted: Option<String>,
    pub check: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoiceYaml {
    pub default_voice: Option<String>,
    pub language_code: Option<String>,
    pub audio_mime: Option<String>,
}

/// Cache configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CacheYaml {
    pub path: Option<String>,
    pub ttl_seconds: Option<i64>,
    pub key_prefix: Option<String>,
}

/// Shared Redis store from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RedisYaml {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub db: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OrchestrationYaml {
    pub provider_timeout_seconds: Option<u64>,
    pub provider_order: Option<Vec<String>>,
}

/// Base URL overrides, mostly for pointing the backends at local mocks
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EndpointsYaml {
    pub live: Option<String>,
    pub cloud_tts: Option<String>,
    pub generative: Option<String>,
}

fn set_if<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_opt_if<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }

    /// Overlay every value present in the file onto `config`.
    pub fn apply_to(&self, config: &mut SpeechConfig) -> Result<(), String> {
        if let Some(providers) = &self.providers {
            set_opt_if(&mut config.gemini_api_key, providers.gemini_api_key.clone());
            set_opt_if(
                &mut config.google_tts_api_key,
                providers.google_tts_api_key.clone(),
            );
        }

        if let Some(models) = &self.models {
            set_if(&mut config.live_model, models.live.clone());
            set_if(&mut config.prompted_model, models.prompted.clone());
            set_if(&mut config.check_model, models.check.clone());
        }

        if let Some(voice) = &self.voice {
            set_if(&mut config.default_voice, voice.default_voice.clone());
            set_if(
                &mut config.default_language_code,
                voice.language_code.clone(),
            );
            set_if(&mut config.audio_mime, voice.audio_mime.clone());
        }

        if let Some(cache) = &self.cache {
            set_opt_if(&mut config.cache_path, cache.path.as_ref().map(PathBuf::from));
            set_if(&mut config.cache_ttl_seconds, cache.ttl_seconds);
            set_if(&mut config.cache_key_prefix, cache.key_prefix.clone());
        }

        if let Some(redis) = &self.redis {
            set_opt_if(&mut config.redis_url, redis.url.clone());
            set_opt_if(&mut config.redis_host, redis.host.clone());
            set_if(&mut config.redis_port, redis.port);
            set_opt_if(&mut config.redis_password, redis.password.clone());
            set_if(&mut config.redis_db, redis.db);
        }

        if let Some(orchestration) = &self.orchestration {
            set_if(
                &mut config.provider_timeout_seconds,
                orchestration.provider_timeout_seconds,
            );
            if let Some(order) = &orchestration.provider_order {
                if order.is_empty() {
                    return Err("orchestration.provider_order must not be empty".to_string());
                }
                config.provider_order = order.iter().map(|name| name.trim().to_string()).collect();
            }
        }

        if let Some(endpoints) = &self.endpoints {
            set_opt_if(&mut config.live_endpoint, endpoints.live.clone());
            set_opt_if(&mut config.cloud_tts_endpoint, endpoints.cloud_tts.clone());
            set_opt_if(&mut config.generative_endpoint, endpoints.generative.clone());
        }

        Ok(())
    }
}
