use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::{GeminiPromptedConfig, SpeechStyle};
use super::extract::extract_from_body;
use crate::core::audio::{FormatSpec, RawAudio, parse_container};
use crate::core::tts::GEMINI_PROMPTED;
use crate::core::tts::base::{
    ProviderError, ProviderErrorKind, ProviderResult, SpeechProvider, VoiceConfig,
    build_http_client,
};
use crate::core::tts::gemini_live::is_prebuilt_voice;
use crate::core::tts::gemini_live::messages::{Content, GenerationConfig};

/// Descriptor used when the response does not name its audio format.
const PROMPTED_OUTPUT_FORMAT: &str = "pcm;rate=24000";

/// Body of `streamGenerateContent` / `generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Normalize extracted audio into raw PCM with a descriptor the encoder accepts.
///
/// WAV bodies are unwrapped; anything else must describe PCM, otherwise the
/// response counts as a protocol failure so the next backend gets a turn.
fn into_raw_audio(bytes: Vec<u8>, mime_type: Option<String>) -> ProviderResult<RawAudio> {
    if bytes.starts_with(b"RIFF") {
        let (spec, payload) = parse_container(&bytes).map_err(|e| {
            ProviderError::new(GEMINI_PROMPTED, ProviderErrorKind::Protocol(e.to_string()))
        })?;
        if payload.is_empty() {
            return Err(ProviderError::new(GEMINI_PROMPTED, ProviderErrorKind::EmptyAudio));
        }
        return Ok(RawAudio::new(payload.to_vec(), spec.descriptor()));
    }

    let format = mime_type
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| PROMPTED_OUTPUT_FORMAT.to_string());
    FormatSpec::parse(Some(&format)).map_err(|e| {
        ProviderError::new(
            GEMINI_PROMPTED,
            ProviderErrorKind::Protocol(format!("unsupported audio format '{format}': {e}")),
        )
    })?;
    Ok(RawAudio::new(bytes, format))
}

fn credential(config: &GeminiPromptedConfig) -> ProviderResult<&str> {
    config.api_key.as_deref().ok_or_else(|| {
        ProviderError::new(
            GEMINI_PROMPTED,
            ProviderErrorKind::MissingCredential(
                "GEMINI_API_KEY environment variable is not set".to_string(),
            ),
        )
    })
}

/// Gemini `streamGenerateContent` backend with audio output.
pub struct GeminiPromptedTTS {
    config: GeminiPromptedConfig,
    client: reqwest::Client,
}

impl GeminiPromptedTTS {
    pub fn new(config: GeminiPromptedConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: build_http_client(GEMINI_PROMPTED)?,
            config,
        })
    }

    pub fn config(&self) -> &GeminiPromptedConfig {
        &self.config
    }

    pub fn build_request(&self, text: &str, voice: &VoiceConfig) -> GenerateRequest {
        let style = voice
            .style()
            .and_then(|tag| {
                let parsed = SpeechStyle::parse(&tag);
                if parsed.is_none() {
                    debug!("Unknown speech style '{}', using neutral delivery", tag);
                }
                parsed
            })
            .unwrap_or_default();
        let voice_name = voice
            .voice_name()
            .filter(|name| is_prebuilt_voice(name))
            .unwrap_or_else(|| self.config.default_voice.clone());

        GenerateRequest {
            contents: vec![Content::user_text(style.prompt(text))],
            generation_config: Some(GenerationConfig::audio(voice_name)),
        }
    }
}

#[async_trait]
impl SpeechProvider for GeminiPromptedTTS {
    fn name(&self) -> &str {
        GEMINI_PROMPTED
    }

    fn supports_voice(&self, voice: &str) -> bool {
        is_prebuilt_voice(voice)
    }

    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> ProviderResult<RawAudio> {
        let api_key = credential(&self.config)?;
        let model = voice.model().unwrap_or_else(|| self.config.model.clone());
        let body = self.build_request(text, voice);

        info!(
            "Gemini prompted synthesis: model={}, style={}",
            model,
            voice.style().as_deref().unwrap_or("neutral")
        );

        let response = self
            .client
            .post(self.config.method_url(&model, "streamGenerateContent"))
            .query(&[("alt", "sse"), ("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(GEMINI_PROMPTED, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                GEMINI_PROMPTED,
                status.as_u16(),
                body,
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_reqwest(GEMINI_PROMPTED, e))?;

        let audio = extract_from_body(&bytes, content_type.as_deref())
            .ok_or_else(|| ProviderError::new(GEMINI_PROMPTED, ProviderErrorKind::EmptyAudio))?;

        debug!("Gemini prompted synthesis returned {} bytes", audio.bytes.len());
        into_raw_audio(audio.bytes, audio.mime_type)
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": GEMINI_PROMPTED,
            "transport": "rest+sse",
            "model": self.config.model,
            "default_voice": self.config.default_voice,
            "styles": ["neutral", "cheerful", "calm", "narrator", "whisper", "excited"],
        })
    }
}

/// Validate a Gemini API key with a minimal `generateContent` call.
///
/// Returns the model's reply text on success.
pub async fn check_api_key(config: &GeminiPromptedConfig, model: &str) -> ProviderResult<String> {
    let api_key = credential(config)?;
    let client = build_http_client(GEMINI_PROMPTED)?;
    let body = GenerateRequest {
        contents: vec![Content::user_text("Reply with exactly: OK")],
        generation_config: None,
    };

    let response = client
        .post(config.method_url(model, "generateContent"))
        .query(&[("key", api_key)])
        .json(&body)
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(GEMINI_PROMPTED, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(
            GEMINI_PROMPTED,
            status.as_u16(),
            body,
        ));
    }

    let parsed: GenerateResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::from_reqwest(GEMINI_PROMPTED, e))?;
    Ok(parsed.text().trim().to_string())
}
