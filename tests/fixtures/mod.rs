//! Test fixtures: generated PCM and helpers to read produced containers back.

#![allow(dead_code)]

use std::io::Cursor;

use base64::prelude::*;

/// 16-bit little-endian mono sine at 440 Hz.
pub fn sine_pcm(sample_rate: u32, samples: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples * 2);
    for i in 0..samples {
        let t = i as f64 / sample_rate as f64;
        let value = ((t * 440.0 * std::f64::consts::TAU).sin() * 8000.0) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Spec and per-channel sample count of a WAV file, as hound reads it.
pub fn read_wav(bytes: &[u8]) -> (hound::WavSpec, u32) {
    let reader = hound::WavReader::new(Cursor::new(bytes)).expect("valid WAV container");
    (reader.spec(), reader.duration())
}

/// Decode the payload of a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> (String, Vec<u8>) {
    let rest = url.strip_prefix("data:").expect("data URL");
    let (mime, payload) = rest.split_once(";base64,").expect("base64 data URL");
    let bytes = BASE64_STANDARD.decode(payload).expect("valid base64");
    (mime.to_string(), bytes)
}
