//! Deterministic cache keys for (text, voice configuration) pairs.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::tts::VoiceConfig;

/// Write `value` as compact JSON with object keys sorted at every depth.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Canonical JSON of a voice configuration.
pub fn canonical_voice_json(voice: &VoiceConfig) -> String {
    let mut out = String::from("{");
    for (i, (key, value)) in voice.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_canonical(value, &mut out);
    }
    out.push('}');
    out
}

/// SHA-256 over `text`, `|` and the canonical voice JSON, as lowercase hex.
pub fn fingerprint(text: &str, voice: &VoiceConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical_voice_json(voice).as_bytes());
    hex::encode(hasher.finalize())
}

/// `"{prefix}:{fingerprint}"`
pub fn cache_key(prefix: &str, text: &str, voice: &VoiceConfig) -> String {
    format!("{prefix}:{}", fingerprint(text, voice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a: VoiceConfig = [("voiceName", json!("Puck")), ("pitch", json!(2))]
            .into_iter()
            .collect();
        let b: VoiceConfig = [("pitch", json!(2)), ("voiceName", json!("Puck"))]
            .into_iter()
            .collect();
        assert_eq!(fingerprint("Hello", &a), fingerprint("Hello", &b));
    }

    #[test]
    fn test_fingerprint_sensitive_to_changes() {
        let voice = VoiceConfig::new().with("voiceName", "Puck");
        let base = fingerprint("Hello", &voice);

        assert_ne!(base, fingerprint("Hello!", &voice));
        assert_ne!(
            base,
            fingerprint("Hello", &VoiceConfig::new().with("voiceName", "Kore"))
        );
        assert_ne!(
            base,
            fingerprint("Hello", &voice.clone().with("pitch", 1))
        );
        assert_ne!(base, fingerprint("Hello", &VoiceConfig::new()));
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint("Hello", &VoiceConfig::new());
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        // sha256("Hello|{}")
        let mut hasher = Sha256::new();
        hasher.update(b"Hello|{}");
        assert_eq!(fp, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_nested_values_canonicalized() {
        let a = VoiceConfig::new().with("extra", json!({ "b": 1, "a": [true, null] }));
        assert_eq!(
            canonical_voice_json(&a),
            r#"{"extra":{"a":[true,null],"b":1}}"#
        );
    }

    #[test]
    fn test_cache_key_prefix() {
        let key = cache_key("tts", "Hello", &VoiceConfig::new());
        assert!(key.starts_with("tts:"));
        assert_eq!(key.len(), 4 + 64);
    }
}
