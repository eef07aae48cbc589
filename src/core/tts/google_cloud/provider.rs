use async_trait::async_trait;
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::{
    CHIRP3_HD_VOICES, GoogleCloudConfig, MAX_PITCH, MAX_SPEAKING_RATE, MIN_PITCH,
    MIN_SPEAKING_RATE, OUTPUT_SAMPLE_RATE, is_cloud_voice_name, language_of_voice,
    resolve_voice_name,
};
use crate::core::audio::{RawAudio, parse_container};
use crate::core::tts::GOOGLE_CLOUD;
use crate::core::tts::base::{
    ProviderError, ProviderErrorKind, ProviderResult, SpeechProvider, VoiceConfig,
    build_http_client,
};

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisInput {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    pub language_code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    pub audio_encoding: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaking_rate: Option<f64>,
    pub sample_rate_hertz: u32,
}

/// Body of `POST /v1/text:synthesize`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    pub input: SynthesisInput,
    pub voice: VoiceSelection,
    pub audio_config: AudioSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeResponse {
    #[serde(default, alias = "audio_content")]
    pub audio_content: Option<String>,
}

// =============================================================================
// Provider
// =============================================================================

/// Cloud Text-to-Speech REST backend.
pub struct GoogleCloudTTS {
    config: GoogleCloudConfig,
    client: reqwest::Client,
}

impl GoogleCloudTTS {
    pub fn new(config: GoogleCloudConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: build_http_client(GOOGLE_CLOUD)?,
            config,
        })
    }

    pub fn config(&self) -> &GoogleCloudConfig {
        &self.config
    }

    /// Assemble the request body for `text` with `voice` settings applied.
    pub fn build_request(&self, text: &str, voice: &VoiceConfig) -> SynthesizeRequest {
        let requested = voice
            .voice_name()
            .unwrap_or_else(|| self.config.default_voice.clone());
        let language_code = voice
            .language_code()
            .or_else(|| language_of_voice(&requested))
            .unwrap_or_else(|| self.config.language_code.clone());
        let name = resolve_voice_name(&requested, &language_code);
        if !name.ends_with(requested.trim()) {
            debug!("Substituted Cloud voice {} for {}", name, requested);
        }

        SynthesizeRequest {
            input: SynthesisInput {
                text: text.to_string(),
            },
            voice: VoiceSelection {
                language_code,
                name,
            },
            audio_config: AudioSettings {
                audio_encoding: "LINEAR16",
                pitch: voice.pitch().map(|p| p.clamp(MIN_PITCH, MAX_PITCH)),
                speaking_rate: voice
                    .speaking_rate()
                    .map(|r| r.clamp(MIN_SPEAKING_RATE, MAX_SPEAKING_RATE)),
                sample_rate_hertz: OUTPUT_SAMPLE_RATE,
            },
        }
    }
}

/// Turn decoded LINEAR16 bytes into raw audio, unwrapping a WAV header if present.
fn unwrap_linear16(bytes: Vec<u8>) -> ProviderResult<RawAudio> {
    if bytes.starts_with(b"RIFF") {
        let (spec, payload) = parse_container(&bytes).map_err(|e| {
            ProviderError::new(GOOGLE_CLOUD, ProviderErrorKind::Protocol(e.to_string()))
        })?;
        if payload.is_empty() {
            return Err(ProviderError::new(GOOGLE_CLOUD, ProviderErrorKind::EmptyAudio));
        }
        return Ok(RawAudio::new(payload.to_vec(), spec.descriptor()));
    }
    if bytes.is_empty() {
        return Err(ProviderError::new(GOOGLE_CLOUD, ProviderErrorKind::EmptyAudio));
    }
    Ok(RawAudio::new(bytes, format!("pcm;rate={OUTPUT_SAMPLE_RATE}")))
}

#[async_trait]
impl SpeechProvider for GoogleCloudTTS {
    fn name(&self) -> &str {
        GOOGLE_CLOUD
    }

    fn supports_voice(&self, voice: &str) -> bool {
        is_cloud_voice_name(voice) || CHIRP3_HD_VOICES.contains_key(voice.trim().to_ascii_lowercase().as_str())
    }

    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> ProviderResult<RawAudio> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::new(
                GOOGLE_CLOUD,
                ProviderErrorKind::MissingCredential(
                    "GOOGLE_TTS_API_KEY (or GEMINI_API_KEY) environment variable is not set"
                        .to_string(),
                ),
            )
        })?;

        let body = self.build_request(text, voice);
        info!(
            "Cloud TTS synthesis: voice={}, language={}",
            body.voice.name, body.voice.language_code
        );

        let response = self
            .client
            .post(self.config.synthesize_url())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(GOOGLE_CLOUD, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(GOOGLE_CLOUD, status.as_u16(), body));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(GOOGLE_CLOUD, e))?;
        let encoded = parsed
            .audio_content
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::new(GOOGLE_CLOUD, ProviderErrorKind::EmptyAudio))?;
        let bytes = BASE64_STANDARD.decode(encoded.as_bytes()).map_err(|e| {
            ProviderError::new(
                GOOGLE_CLOUD,
                ProviderErrorKind::Protocol(format!("invalid base64 audioContent: {e}")),
            )
        })?;

        debug!("Cloud TTS returned {} bytes", bytes.len());
        unwrap_linear16(bytes)
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": GOOGLE_CLOUD,
            "transport": "rest",
            "endpoint": self.config.synthesize_url(),
            "default_voice": self.config.default_voice,
            "language_code": self.config.language_code,
            "sample_rate": OUTPUT_SAMPLE_RATE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::encode_with_spec;
    use crate::core::audio::FormatSpec;

    fn provider() -> GoogleCloudTTS {
        GoogleCloudTTS::new(GoogleCloudConfig::default()).unwrap()
    }

    #[test]
    fn test_build_request_defaults() {
        let request = provider().build_request("Hi", &VoiceConfig::new());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "input": { "text": "Hi" },
                "voice": { "languageCode": "en-US", "name": "en-US-Chirp3-HD-Zephyr" },
                "audioConfig": { "audioEncoding": "LINEAR16", "sampleRateHertz": 24000 }
            })
        );
    }

    #[test]
    fn test_build_request_voice_settings() {
        let voice = VoiceConfig::new()
            .with("voiceName", "en-GB-Wavenet-B")
            .with("pitch", 50.0)
            .with("speakingRate", "1.5");
        let request = provider().build_request("Hi", &voice);
        assert_eq!(request.voice.name, "en-GB-Wavenet-B");
        assert_eq!(request.voice.language_code, "en-GB");
        assert_eq!(request.audio_config.pitch, Some(20.0));
        assert_eq!(request.audio_config.speaking_rate, Some(1.5));
    }

    #[test]
    fn test_unwrap_linear16_strips_header() {
        let spec = FormatSpec {
            sample_rate: 16000,
            bits_per_sample: 16,
            channels: 1,
        };
        let wav = encode_with_spec(&[1, 2, 3, 4], &spec).unwrap();
        let raw = unwrap_linear16(wav.into_bytes()).unwrap();
        assert_eq!(raw.bytes, vec![1, 2, 3, 4]);
        assert_eq!(raw.format.as_deref(), Some("pcm;rate=16000;bits=16;channels=1"));
    }

    #[test]
    fn test_unwrap_linear16_headerless_and_empty() {
        let raw = unwrap_linear16(vec![0, 0]).unwrap();
        assert_eq!(raw.format.as_deref(), Some("pcm;rate=24000"));

        let err = unwrap_linear16(Vec::new()).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::EmptyAudio);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let err = provider()
            .synthesize("Hi", &VoiceConfig::new())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ProviderErrorKind::MissingCredential(_)));
    }

    #[test]
    fn test_supports_voice() {
        let tts = provider();
        assert!(tts.supports_voice("en-US-Neural2-F"));
        assert!(tts.supports_voice("Puck"));
        assert!(!tts.supports_voice("Robot"));
    }
}
