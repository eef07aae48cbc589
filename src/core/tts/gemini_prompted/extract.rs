//! Audio extraction from Gemini generation responses.
//!
//! A response body is first split into JSON payloads (SSE `data:` events, a
//! JSON array of chunks, or one JSON object). Each payload then goes through
//! [`EXTRACTORS`] in order and the first extractor that yields bytes wins.
//! Audio from successive payloads is concatenated.

use base64::prelude::*;
use serde_json::Value;

/// Audio pulled out of one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedAudio {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl ExtractedAudio {
    fn append(&mut self, other: ExtractedAudio) {
        self.bytes.extend_from_slice(&other.bytes);
        if self.mime_type.is_none() {
            self.mime_type = other.mime_type;
        }
    }
}

pub type Extractor = fn(&Value) -> Option<ExtractedAudio>;

/// Extractors in priority order.
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("inlineData", inline_data_camel),
    ("inline_data", inline_data_snake),
    ("base64 field", top_level_base64),
    ("byte array", top_level_byte_array),
];

fn decode_base64(data: &str) -> Option<Vec<u8>> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    BASE64_STANDARD
        .decode(data)
        .or_else(|_| BASE64_URL_SAFE.decode(data))
        .ok()
}

/// Collect every object stored under `key`, depth first, in document order.
fn collect_under<'a>(value: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    out.push(v);
                } else {
                    collect_under(v, key, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_under(item, key, out);
            }
        }
        _ => {}
    }
}

fn inline_parts(payload: &Value, key: &str, mime_key: &str) -> Option<ExtractedAudio> {
    let mut found = Vec::new();
    collect_under(payload, key, &mut found);

    let mut audio = ExtractedAudio::default();
    for inline in found {
        let Some(bytes) = inline.get("data").and_then(Value::as_str).and_then(decode_base64)
        else {
            continue;
        };
        audio.append(ExtractedAudio {
            bytes,
            mime_type: inline
                .get(mime_key)
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }
    (!audio.bytes.is_empty()).then_some(audio)
}

/// `candidates[].content.parts[].inlineData { mimeType, data }`
pub fn inline_data_camel(payload: &Value) -> Option<ExtractedAudio> {
    inline_parts(payload, "inlineData", "mimeType")
}

/// `candidates[].content.parts[].inline_data { mime_type, data }`
pub fn inline_data_snake(payload: &Value) -> Option<ExtractedAudio> {
    inline_parts(payload, "inline_data", "mime_type")
}

/// Top-level `audio` or `data` base64 string.
pub fn top_level_base64(payload: &Value) -> Option<ExtractedAudio> {
    ["audio", "data"].iter().find_map(|key| {
        let bytes = payload.get(*key)?.as_str().and_then(decode_base64)?;
        Some(ExtractedAudio {
            bytes,
            mime_type: payload
                .get("mimeType")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    })
}

/// Top-level `audio` or `data` as an array of byte values.
pub fn top_level_byte_array(payload: &Value) -> Option<ExtractedAudio> {
    ["audio", "data"].iter().find_map(|key| {
        let items = payload.get(*key)?.as_array()?;
        let bytes = items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()?;
        (!bytes.is_empty()).then_some(ExtractedAudio {
            bytes,
            mime_type: None,
        })
    })
}

/// Run the extractors against one payload; first success wins.
pub fn extract_audio(payload: &Value) -> Option<ExtractedAudio> {
    EXTRACTORS
        .iter()
        .find_map(|(_, extractor)| extractor(payload))
}

/// Split a response body into JSON payloads.
pub fn split_payloads(body: &str) -> Vec<Value> {
    let has_sse = body
        .lines()
        .any(|line| line.trim_start().starts_with("data:"));
    if !has_sse {
        return match serde_json::from_str::<Value>(body.trim()) {
            Ok(Value::Array(items)) => items,
            Ok(value) => vec![value],
            Err(_) => Vec::new(),
        };
    }

    let mut payloads = Vec::new();
    let mut event = String::new();
    let mut flush = |event: &mut String| {
        let data = event.trim();
        if !data.is_empty() && data != "[DONE]" {
            if let Ok(value) = serde_json::from_str::<Value>(data) {
                payloads.push(value);
            }
        }
        event.clear();
    };

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            flush(&mut event);
        } else if let Some(data) = line.strip_prefix("data:") {
            if !event.is_empty() {
                event.push('\n');
            }
            event.push_str(data.trim_start());
        }
    }
    flush(&mut event);

    payloads
}

/// Extract all audio from a complete response body.
///
/// A raw `audio/*` body is returned as-is.
pub fn extract_from_body(body: &[u8], content_type: Option<&str>) -> Option<ExtractedAudio> {
    if let Some(content_type) = content_type.map(str::trim) {
        if content_type.to_ascii_lowercase().starts_with("audio/") {
            return (!body.is_empty()).then(|| ExtractedAudio {
                bytes: body.to_vec(),
                mime_type: Some(content_type.to_string()),
            });
        }
    }

    let text = String::from_utf8_lossy(body);
    let mut audio = ExtractedAudio::default();
    for payload in split_payloads(&text) {
        if let Some(chunk) = extract_audio(&payload) {
            audio.append(chunk);
        }
    }
    (!audio.bytes.is_empty()).then_some(audio)
}
