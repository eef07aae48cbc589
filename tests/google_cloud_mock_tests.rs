//! Cloud Text-to-Speech backend against a wiremock server
//!
//! These tests verify:
//! - Request shape (key query parameter, voice substitution, LINEAR16 config)
//! - WAV-wrapped and bare LINEAR16 responses
//! - Status classification for fallback

mod fixtures;

use base64::prelude::*;
use serde_json::json;
use speech_cache::core::audio::{FormatSpec, encode, encode_with_spec};
use speech_cache::core::tts::{
    GoogleCloudConfig, GoogleCloudTTS, ProviderErrorKind, SpeechProvider, VoiceConfig,
};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::{read_wav, sine_pcm};

fn config(server: &MockServer) -> GoogleCloudConfig {
    GoogleCloudConfig {
        api_key: Some("cloud-key".to_string()),
        default_voice: "Zephyr".to_string(),
        language_code: "en-US".to_string(),
        base_url: server.uri(),
    }
}

#[tokio::test]
async fn test_synthesize_unwraps_wav_response() {
    let server = MockServer::start().await;
    let pcm = sine_pcm(16000, 160);
    let spec = FormatSpec {
        sample_rate: 16000,
        ..FormatSpec::default()
    };
    let wav = encode_with_spec(&pcm, &spec).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/text:synthesize"))
        .and(query_param("key", "cloud-key"))
        .and(body_partial_json(json!({
            "input": { "text": "Hello" },
            "voice": { "languageCode": "en-US", "name": "en-US-Chirp3-HD-Puck" },
            "audioConfig": { "audioEncoding": "LINEAR16", "sampleRateHertz": 24000 }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "audioContent": wav.to_base64() })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tts = GoogleCloudTTS::new(config(&server)).unwrap();
    let voice = VoiceConfig::new().with("voiceName", "Puck");
    let raw = tts.synthesize("Hello", &voice).await.unwrap();

    assert_eq!(raw.bytes, pcm);
    let container = encode(&raw).unwrap();
    let (wav_spec, frames) = read_wav(container.as_bytes());
    assert_eq!(wav_spec.sample_rate, 16000);
    assert_eq!(wav_spec.bits_per_sample, 16);
    assert_eq!(wav_spec.channels, 1);
    assert_eq!(frames, 160);
}

#[tokio::test]
async fn test_synthesize_bare_linear16() {
    let server = MockServer::start().await;
    let pcm = sine_pcm(24000, 240);

    Mock::given(method("POST"))
        .and(path("/v1/text:synthesize"))
        .and(body_partial_json(json!({
            "voice": { "languageCode": "de-DE", "name": "de-DE-Wavenet-B" },
            "audioConfig": { "pitch": 20.0, "speakingRate": 0.25 }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "audioContent": BASE64_STANDARD.encode(&pcm) })),
        )
        .mount(&server)
        .await;

    let tts = GoogleCloudTTS::new(config(&server)).unwrap();
    // Out-of-range pitch and rate are clamped; a full cloud name carries its language
    let voice = VoiceConfig::new()
        .with("voiceName", "de-DE-Wavenet-B")
        .with("pitch", 35)
        .with("speakingRate", "0.1");
    let raw = tts.synthesize("Hallo", &voice).await.unwrap();

    assert_eq!(raw.format.as_deref(), Some("pcm;rate=24000"));
    let (spec, frames) = read_wav(encode(&raw).unwrap().as_bytes());
    assert_eq!(spec.sample_rate, 24000);
    assert_eq!(frames, 240);
}

#[tokio::test]
async fn test_status_classification() {
    let cases = [
        (403, "auth"),
        (429, "quota"),
        (503, "http"),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let tts = GoogleCloudTTS::new(config(&server)).unwrap();
        let err = tts.synthesize("Hello", &VoiceConfig::new()).await.unwrap_err();
        assert_eq!(err.backend, "google-cloud");
        match expected {
            "auth" => assert!(matches!(err.kind, ProviderErrorKind::Authentication(_))),
            "quota" => assert!(matches!(err.kind, ProviderErrorKind::Quota(_))),
            _ => assert_eq!(
                err.kind,
                ProviderErrorKind::Http {
                    status: 503,
                    body: "nope".to_string()
                }
            ),
        }
    }
}

#[tokio::test]
async fn test_missing_audio_content_is_empty_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text:synthesize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let tts = GoogleCloudTTS::new(config(&server)).unwrap();
    let err = tts.synthesize("Hello", &VoiceConfig::new()).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::EmptyAudio);
}

#[tokio::test]
async fn test_missing_key_does_not_call_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.api_key = None;
    let tts = GoogleCloudTTS::new(config).unwrap();
    let err = tts.synthesize("Hello", &VoiceConfig::new()).await.unwrap_err();
    assert!(matches!(err.kind, ProviderErrorKind::MissingCredential(_)));
}
