//! # TTS Base Trait
//!
//! This module defines the abstraction every speech backend implements, the
//! voice configuration map callers pass in, and the per-backend error type the
//! orchestrator records while falling back between providers.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use speech_cache::core::tts::{SpeechProvider, VoiceConfig};
//!
//! async fn speak(provider: &dyn SpeechProvider) {
//!     let voice = VoiceConfig::new().with("voiceName", "Puck");
//!     match provider.synthesize("Hello there", &voice).await {
//!         Ok(raw) => println!("{} bytes ({:?})", raw.len(), raw.format),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::audio::RawAudio;

/// Recognized voice configuration keys.
pub mod keys {
    pub const PROVIDER: &str = "provider";
    pub const MODEL: &str = "model";
    pub const VOICE_NAME: &str = "voiceName";
    pub const LANGUAGE_CODE: &str = "languageCode";
    pub const STYLE: &str = "style";
    pub const PITCH: &str = "pitch";
    pub const SPEAKING_RATE: &str = "speakingRate";
    pub const MIME_TYPE: &str = "mimeType";
}

/// Caller-supplied voice settings.
///
/// Backed by a `BTreeMap` so iteration (and therefore serialization) is always
/// key-sorted, which keeps cache fingerprints independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceConfig(BTreeMap<String, Value>);

impl VoiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// String value for `key`. Non-string scalars are rendered; empty strings count as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric value for `key`, accepting JSON numbers or numeric strings.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn provider(&self) -> Option<String> {
        self.get_str(keys::PROVIDER)
    }

    pub fn model(&self) -> Option<String> {
        self.get_str(keys::MODEL)
    }

    pub fn voice_name(&self) -> Option<String> {
        self.get_str(keys::VOICE_NAME)
    }

    pub fn language_code(&self) -> Option<String> {
        self.get_str(keys::LANGUAGE_CODE)
    }

    pub fn style(&self) -> Option<String> {
        self.get_str(keys::STYLE)
    }

    pub fn pitch(&self) -> Option<f64> {
        self.get_f64(keys::PITCH)
    }

    pub fn speaking_rate(&self) -> Option<f64> {
        self.get_f64(keys::SPEAKING_RATE)
    }

    pub fn mime_type(&self) -> Option<String> {
        self.get_str(keys::MIME_TYPE)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VoiceConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A validated synthesis request. Text is guaranteed non-empty after trimming.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    text: String,
    voice_config: VoiceConfig,
}

impl SynthesisRequest {
    /// Returns `None` when the text is blank.
    pub fn new(text: &str, voice_config: VoiceConfig) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            text: trimmed.to_string(),
            voice_config,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice_config(&self) -> &VoiceConfig {
        &self.voice_config
    }
}

/// Failure categories a backend can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderErrorKind {
    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("no audio returned")]
    EmptyAudio,

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A single backend's failure, recorded by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{backend}: {kind}")]
pub struct ProviderError {
    pub backend: String,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(backend: impl Into<String>, kind: ProviderErrorKind) -> Self {
        Self {
            backend: backend.into(),
            kind,
        }
    }

    /// Classify a non-success HTTP status the way every REST backend reports it.
    pub fn from_status(backend: impl Into<String>, status: u16, body: String) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Authentication(body),
            429 => ProviderErrorKind::Quota(body),
            _ => ProviderErrorKind::Http { status, body },
        };
        Self::new(backend, kind)
    }

    pub fn from_reqwest(backend: impl Into<String>, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Connection(format!("request timed out: {err}"))
        } else if err.is_decode() {
            ProviderErrorKind::Protocol(err.to_string())
        } else {
            ProviderErrorKind::Connection(err.to_string())
        };
        Self::new(backend, kind)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Pooled HTTP client shared by the REST backends.
///
/// Only the connect phase is bounded here; the orchestrator's per-provider
/// timeout bounds the whole call.
pub(crate) fn build_http_client(backend: &str) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90)) // Close idle connections after 90s
        .build()
        .map_err(|e| {
            ProviderError::new(
                backend,
                ProviderErrorKind::Connection(format!("Failed to create HTTP client: {e}")),
            )
        })
}

/// One text-to-speech backend.
///
/// Implementations must be atomic from the caller's point of view: either a
/// complete [`RawAudio`] or an error, with no partially applied effects.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Stable backend name used for routing and error reports.
    fn name(&self) -> &str;

    /// Whether this backend accepts `voice` as-is.
    fn supports_voice(&self, voice: &str) -> bool;

    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> ProviderResult<RawAudio>;

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({ "provider": self.name() })
    }
}

impl fmt::Debug for dyn SpeechProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechProvider")
            .field("name", &self.name())
            .finish()
    }
}
