//! # Synthesis Orchestrator
//!
//! Tries speech backends one at a time in the order the [`RoutingTable`]
//! produces, each under the configured per-provider timeout, and frames the
//! first successful result as a WAV container.
//!
//! When every backend fails the request still succeeds with a silent
//! container. The failure is logged at `warn` on the
//! `speech_cache::orchestrator` target and counted in [`OrchestratorStats`].

mod routing;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::timeout;
use tracing::{info, warn};

pub use routing::{RoutingRule, RoutingTable};

use crate::config::SpeechConfig;
use crate::core::audio::{AudioContainer, encode, silent_container};
use crate::core::errors::{SpeechError, SpeechResult};
use crate::core::tts::{
    ProviderError, ProviderErrorKind, SpeechProvider, SynthesisRequest, VoiceConfig,
    canonical_provider_name, create_tts_provider,
};

/// Result of one orchestrated synthesis.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub container: AudioContainer,
    /// Backend that produced the audio; `None` when every backend failed.
    pub provider: Option<String>,
    /// Failures recorded before the successful backend (or all of them).
    pub errors: Vec<ProviderError>,
    pub exhausted: bool,
}

/// Every backend in the fallback order failed.
#[derive(Debug, Clone)]
pub struct AllProvidersFailedError {
    pub errors: Vec<ProviderError>,
}

impl fmt::Display for AllProvidersFailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "All {} speech providers failed", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AllProvidersFailedError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorCounts {
    pub requests: u64,
    pub successes: u64,
    pub provider_failures: u64,
    pub exhausted: u64,
}

impl fmt::Display for OrchestratorCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Synthesis Stats: {} requests ({} succeeded, {} exhausted), {} provider failures",
            self.requests, self.successes, self.exhausted, self.provider_failures
        )
    }
}

/// Shared counters for orchestrated requests.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorStats {
    inner: Arc<RwLock<OrchestratorCounts>>,
}

impl OrchestratorStats {
    pub fn snapshot(&self) -> OrchestratorCounts {
        *self.inner.read()
    }

    /// Number of requests that fell back to silence.
    pub fn exhausted(&self) -> u64 {
        self.inner.read().exhausted
    }
}

pub struct SynthesisOrchestrator {
    providers: Vec<Arc<dyn SpeechProvider>>,
    routing: RoutingTable,
    provider_timeout: Duration,
    stats: OrchestratorStats,
}

impl SynthesisOrchestrator {
    /// `providers` is also the default fallback order.
    pub fn new(providers: Vec<Arc<dyn SpeechProvider>>, provider_timeout: Duration) -> Self {
        let names: Vec<String> = providers.iter().map(|p| p.name().to_string()).collect();
        Self {
            routing: RoutingTable::for_backends(&names),
            providers,
            provider_timeout,
            stats: OrchestratorStats::default(),
        }
    }

    /// Build one provider per entry of `provider_order`, skipping duplicates.
    pub fn from_config(config: &SpeechConfig) -> SpeechResult<Self> {
        let mut seen: Vec<&'static str> = Vec::new();
        let mut providers = Vec::with_capacity(config.provider_order.len());
        for name in &config.provider_order {
            let canonical = canonical_provider_name(name)
                .ok_or_else(|| SpeechError::Config(format!("Unknown provider '{name}'")))?;
            if seen.contains(&canonical) {
                continue;
            }
            seen.push(canonical);
            providers.push(create_tts_provider(canonical, config)?);
        }
        Ok(Self::new(providers, config.provider_timeout()))
    }

    pub fn with_routing(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn SpeechProvider>] {
        &self.providers
    }

    pub fn stats(&self) -> &OrchestratorStats {
        &self.stats
    }

    /// Fallback order that a request with `voice` would use.
    pub fn plan(&self, voice: &VoiceConfig) -> Vec<String> {
        self.routing.resolve(voice, &self.providers)
    }

    fn provider(&self, name: &str) -> Option<&Arc<dyn SpeechProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    async fn attempt(
        &self,
        provider: &dyn SpeechProvider,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<AudioContainer, AttemptError> {
        let raw = match timeout(self.provider_timeout, provider.synthesize(text, voice)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(AttemptError::Provider(e)),
            Err(_) => {
                return Err(AttemptError::Provider(ProviderError::new(
                    provider.name(),
                    ProviderErrorKind::Timeout(self.provider_timeout),
                )));
            }
        };
        if raw.is_empty() {
            return Err(AttemptError::Provider(ProviderError::new(
                provider.name(),
                ProviderErrorKind::EmptyAudio,
            )));
        }
        encode(&raw).map_err(|e| AttemptError::Fatal(e.into()))
    }

    /// Synthesize `text`, falling back across backends.
    ///
    /// # Errors
    /// `SpeechError::Validation` for blank text, `SpeechError::Format` when a
    /// backend returns audio the encoder cannot frame. Backend failures are
    /// never returned.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> SpeechResult<SynthesisOutcome> {
        let request = SynthesisRequest::new(text, voice.clone())
            .ok_or_else(|| SpeechError::Validation("text must not be empty".to_string()))?;
        self.stats.inner.write().requests += 1;

        let order = self.plan(request.voice_config());
        let mut errors = Vec::new();

        for name in &order {
            let Some(provider) = self.provider(name) else {
                continue;
            };
            match self
                .attempt(provider.as_ref(), request.text(), request.voice_config())
                .await
            {
                Ok(container) => {
                    info!(
                        "Synthesized {} bytes with {} after {} failed attempts",
                        container.len(),
                        name,
                        errors.len()
                    );
                    self.stats.inner.write().successes += 1;
                    return Ok(SynthesisOutcome {
                        container,
                        provider: Some(name.clone()),
                        errors,
                        exhausted: false,
                    });
                }
                Err(AttemptError::Provider(e)) => {
                    warn!("Speech provider {} failed: {}", name, e.kind);
                    self.stats.inner.write().provider_failures += 1;
                    errors.push(e);
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }

        let failure = AllProvidersFailedError { errors };
        warn!(
            target: "speech_cache::orchestrator",
            attempted = order.len(),
            "{}; returning silent audio",
            failure
        );
        self.stats.inner.write().exhausted += 1;

        Ok(SynthesisOutcome {
            container: silent_container(),
            provider: None,
            errors: failure.errors,
            exhausted: true,
        })
    }
}

enum AttemptError {
    /// Recorded, next backend is tried.
    Provider(ProviderError),
    /// Surfaced to the caller.
    Fatal(SpeechError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::{RawAudio, WAV_HEADER_LEN};
    use crate::core::tts::ProviderResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Succeed(Vec<u8>),
        Fail(ProviderErrorKind),
        BadFormat,
        Hang,
    }

    struct StubProvider {
        name: &'static str,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SpeechProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }
        fn supports_voice(&self, _voice: &str) -> bool {
            true
        }
        async fn synthesize(&self, _text: &str, _voice: &VoiceConfig) -> ProviderResult<RawAudio> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Succeed(bytes) => Ok(RawAudio::new(bytes.clone(), "pcm;rate=24000")),
                Behavior::Fail(kind) => Err(ProviderError::new(self.name, kind.clone())),
                Behavior::BadFormat => Ok(RawAudio::new(vec![1, 2], "audio/mpeg")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(RawAudio::new(vec![0, 0], "pcm"))
                }
            }
        }
    }

    fn orchestrator(providers: Vec<Arc<StubProvider>>) -> SynthesisOrchestrator {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn SpeechProvider>)
            .collect();
        SynthesisOrchestrator::new(providers, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_falls_back_to_third_provider() {
        let one = StubProvider::new("one", Behavior::Fail(ProviderErrorKind::EmptyAudio));
        let two = StubProvider::new(
            "two",
            Behavior::Fail(ProviderErrorKind::Http {
                status: 500,
                body: "boom".into(),
            }),
        );
        let three = StubProvider::new("three", Behavior::Succeed(vec![7; 10]));
        let orch = orchestrator(vec![one.clone(), two.clone(), three.clone()]);

        let outcome = orch.synthesize("Hello", &VoiceConfig::new()).await.unwrap();
        assert_eq!(outcome.provider.as_deref(), Some("three"));
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].backend, "one");
        assert_eq!(outcome.errors[1].backend, "two");
        assert!(!outcome.exhausted);
        assert_eq!(outcome.container.len(), WAV_HEADER_LEN + 10);
        assert_eq!(three.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_success_stops_fallback() {
        let one = StubProvider::new("one", Behavior::Succeed(vec![1; 4]));
        let two = StubProvider::new("two", Behavior::Succeed(vec![2; 4]));
        let orch = orchestrator(vec![one, two.clone()]);

        let outcome = orch.synthesize("Hello", &VoiceConfig::new()).await.unwrap();
        assert_eq!(outcome.provider.as_deref(), Some("one"));
        assert!(outcome.errors.is_empty());
        assert_eq!(two.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_silence() {
        let one = StubProvider::new(
            "one",
            Behavior::Fail(ProviderErrorKind::MissingCredential("no key".into())),
        );
        let two = StubProvider::new("two", Behavior::Fail(ProviderErrorKind::Quota("429".into())));
        let orch = orchestrator(vec![one, two]);

        let outcome = orch.synthesize("Hello", &VoiceConfig::new()).await.unwrap();
        assert!(outcome.exhausted);
        assert!(outcome.provider.is_none());
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.container, silent_container());
        assert_eq!(outcome.container.data_len(), 0);
        assert_eq!(orch.stats().exhausted(), 1);
        assert_eq!(orch.stats().snapshot().provider_failures, 2);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let slow = StubProvider::new("slow", Behavior::Hang);
        let fast = StubProvider::new("fast", Behavior::Succeed(vec![0; 2]));
        let orch = orchestrator(vec![slow, fast]);

        let outcome = orch.synthesize("Hello", &VoiceConfig::new()).await.unwrap();
        assert_eq!(outcome.provider.as_deref(), Some("fast"));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.errors[0].kind,
            ProviderErrorKind::Timeout(Duration::from_millis(200))
        );
        assert_eq!(
            outcome.errors[0].to_string(),
            "slow: timed out after 200ms"
        );
    }

    #[tokio::test]
    async fn test_empty_audio_falls_back() {
        let empty = StubProvider::new("empty", Behavior::Succeed(Vec::new()));
        let good = StubProvider::new("good", Behavior::Succeed(vec![0; 2]));
        let orch = orchestrator(vec![empty, good]);

        let outcome = orch.synthesize("Hello", &VoiceConfig::new()).await.unwrap();
        assert_eq!(outcome.provider.as_deref(), Some("good"));
        assert_eq!(outcome.errors[0].kind, ProviderErrorKind::EmptyAudio);
    }

    #[tokio::test]
    async fn test_blank_text_rejected_before_providers() {
        let one = StubProvider::new("one", Behavior::Succeed(vec![0; 2]));
        let orch = orchestrator(vec![one.clone()]);

        let err = orch.synthesize("   ", &VoiceConfig::new()).await.unwrap_err();
        assert!(matches!(err, SpeechError::Validation(_)));
        assert_eq!(one.calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.stats().snapshot().requests, 0);
    }

    #[tokio::test]
    async fn test_format_error_surfaced() {
        let bad = StubProvider::new("bad", Behavior::BadFormat);
        let good = StubProvider::new("good", Behavior::Succeed(vec![0; 2]));
        let orch = orchestrator(vec![bad, good.clone()]);

        let err = orch.synthesize("Hello", &VoiceConfig::new()).await.unwrap_err();
        assert!(matches!(err, SpeechError::Format(_)));
        assert_eq!(good.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_explicit_provider_routes_first() {
        let one = StubProvider::new("one", Behavior::Succeed(vec![1; 2]));
        let two = StubProvider::new("two", Behavior::Succeed(vec![2; 2]));
        let orch = orchestrator(vec![one.clone(), two]);

        let voice = VoiceConfig::new().with("provider", "two");
        assert_eq!(orch.plan(&voice), vec!["two", "one"]);
        let outcome = orch.synthesize("Hello", &voice).await.unwrap();
        assert_eq!(outcome.provider.as_deref(), Some("two"));
        assert_eq!(one.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_style_overrides_explicit_provider() {
        use crate::core::tts::{GEMINI_LIVE, GEMINI_PROMPTED, GOOGLE_CLOUD};

        let live = StubProvider::new(GEMINI_LIVE, Behavior::Succeed(vec![1; 2]));
        let cloud = StubProvider::new(GOOGLE_CLOUD, Behavior::Succeed(vec![2; 2]));
        let prompted = StubProvider::new(GEMINI_PROMPTED, Behavior::Succeed(vec![3; 2]));
        let orch = orchestrator(vec![live.clone(), cloud.clone(), prompted.clone()]);

        let voice = VoiceConfig::new()
            .with("provider", "google-cloud")
            .with("style", "cheerful");
        assert_eq!(
            orch.plan(&voice),
            vec![GEMINI_PROMPTED, GOOGLE_CLOUD, GEMINI_LIVE]
        );

        let outcome = orch.synthesize("Hello", &voice).await.unwrap();
        assert_eq!(outcome.provider.as_deref(), Some(GEMINI_PROMPTED));
        assert_eq!(cloud.calls.load(Ordering::SeqCst), 0);
        assert_eq!(live.calls.load(Ordering::SeqCst), 0);
        assert_eq!(prompted.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_failed_display() {
        let err = AllProvidersFailedError {
            errors: vec![
                ProviderError::new("a", ProviderErrorKind::EmptyAudio),
                ProviderError::new("b", ProviderErrorKind::Timeout(Duration::from_secs(30))),
            ],
        };
        assert_eq!(
            err.to_string(),
            "All 2 speech providers failed: a: no audio returned; b: timed out after 30s"
        );
    }

    #[test]
    fn test_from_config_dedups_order() {
        let mut config = SpeechConfig::default();
        config.provider_order = vec!["google".into(), "google-cloud".into(), "live".into()];
        let orch = SynthesisOrchestrator::from_config(&config).unwrap();
        let names: Vec<&str> = orch.providers().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["google-cloud", "gemini-live"]);
    }
}
