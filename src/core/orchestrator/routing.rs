//! Provider selection.
//!
//! The fallback order for a request is built from an ordered list of
//! `(RoutingRule, backend)` pairs. Every pair whose rule matches the voice
//! configuration puts its backend in front, in table order, and the default
//! order follows. A backend appears at most once.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::tts::gemini_prompted::SpeechStyle;
use crate::core::tts::{GEMINI_PROMPTED, SpeechProvider, VoiceConfig, canonical_provider_name};

/// Condition under which a backend is moved to the front of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingRule {
    /// The `provider` key names the backend.
    ExplicitProvider,
    /// The `style` key carries a recognized style tag.
    Style,
    /// The `voiceName` key is supported by this backend and no other.
    ExclusiveVoice,
}

impl fmt::Display for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoutingRule::ExplicitProvider => "explicit-provider",
            RoutingRule::Style => "style",
            RoutingRule::ExclusiveVoice => "exclusive-voice",
        };
        f.write_str(name)
    }
}

/// Normalized backend name for a `provider` value. Unknown names are kept
/// lowercased so custom backends can still be addressed.
fn requested_backend(value: &str) -> String {
    canonical_provider_name(value)
        .map(str::to_string)
        .unwrap_or_else(|| value.trim().to_ascii_lowercase())
}

#[derive(Debug, Clone)]
pub struct RoutingTable {
    rules: Vec<(RoutingRule, String)>,
    default_order: Vec<String>,
}

impl RoutingTable {
    /// Standard table over `backends`: style, then explicit provider, then
    /// exclusive voice. A recognized style tag wins over `provider`.
    /// `backends` is also the default order.
    pub fn for_backends(backends: &[String]) -> Self {
        let mut rules = Vec::with_capacity(backends.len() * 2 + 1);
        rules.push((RoutingRule::Style, GEMINI_PROMPTED.to_string()));
        rules.extend(
            backends
                .iter()
                .map(|b| (RoutingRule::ExplicitProvider, b.clone())),
        );
        rules.extend(
            backends
                .iter()
                .map(|b| (RoutingRule::ExclusiveVoice, b.clone())),
        );

        Self {
            rules,
            default_order: backends.to_vec(),
        }
    }

    pub fn rules(&self) -> &[(RoutingRule, String)] {
        &self.rules
    }

    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }

    fn matches(
        rule: RoutingRule,
        backend: &str,
        voice: &VoiceConfig,
        providers: &[Arc<dyn SpeechProvider>],
    ) -> bool {
        match rule {
            RoutingRule::ExplicitProvider => voice
                .provider()
                .is_some_and(|p| requested_backend(&p) == backend),
            RoutingRule::Style => voice
                .style()
                .is_some_and(|tag| SpeechStyle::parse(&tag).is_some()),
            RoutingRule::ExclusiveVoice => {
                let Some(name) = voice.voice_name() else {
                    return false;
                };
                let mut supporting = providers.iter().filter(|p| p.supports_voice(&name));
                match (supporting.next(), supporting.next()) {
                    (Some(only), None) => only.name() == backend,
                    _ => false,
                }
            }
        }
    }

    /// Fallback order for one request. Backends without a registered
    /// provider are skipped.
    pub fn resolve(
        &self,
        voice: &VoiceConfig,
        providers: &[Arc<dyn SpeechProvider>],
    ) -> Vec<String> {
        let registered = |name: &str| providers.iter().any(|p| p.name() == name);
        let mut order: Vec<String> = Vec::with_capacity(self.default_order.len());

        for (rule, backend) in &self.rules {
            if order.contains(backend) || !Self::matches(*rule, backend, voice, providers) {
                continue;
            }
            if registered(backend) {
                debug!("Routing rule {} selects {}", rule, backend);
                order.push(backend.clone());
            } else {
                debug!("Routing rule {} selects unregistered backend {}", rule, backend);
            }
        }

        if let Some(requested) = voice.provider() {
            let backend = requested_backend(&requested);
            if !registered(&backend) {
                warn!(
                    "Requested provider '{}' is not configured, using default order",
                    requested
                );
            }
        }
        if let Some(tag) = voice.style()
            && SpeechStyle::parse(&tag).is_none()
        {
            debug!("Unknown style tag '{}' does not affect routing", tag);
        }

        for backend in &self.default_order {
            if !order.contains(backend) && registered(backend) {
                order.push(backend.clone());
            }
        }
        order
    }
}
