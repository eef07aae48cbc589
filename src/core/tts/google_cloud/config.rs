//! Configuration and voice substitution for Cloud Text-to-Speech.

use phf::phf_map;

use crate::config::SpeechConfig;

/// Default REST base URL.
pub const GOOGLE_CLOUD_TTS_URL: &str = "https://texttospeech.googleapis.com";

/// LINEAR16 output rate requested from the API.
pub const OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Voice used when a bare name has no Chirp3-HD equivalent.
pub const FALLBACK_VOICE_SUFFIX: &str = "Standard-C";

pub const MIN_PITCH: f64 = -20.0;
pub const MAX_PITCH: f64 = 20.0;
pub const MIN_SPEAKING_RATE: f64 = 0.25;
pub const MAX_SPEAKING_RATE: f64 = 4.0;

/// Gemini prebuilt voice (lowercase) → Chirp3-HD voice suffix.
pub static CHIRP3_HD_VOICES: phf::Map<&'static str, &'static str> = phf_map! {
    "zephyr" => "Zephyr",
    "puck" => "Puck",
    "charon" => "Charon",
    "kore" => "Kore",
    "fenrir" => "Fenrir",
    "leda" => "Leda",
    "orus" => "Orus",
    "aoede" => "Aoede",
    "callirrhoe" => "Callirrhoe",
    "autonoe" => "Autonoe",
    "enceladus" => "Enceladus",
    "iapetus" => "Iapetus",
    "umbriel" => "Umbriel",
    "algieba" => "Algieba",
    "despina" => "Despina",
    "erinome" => "Erinome",
    "algenib" => "Algenib",
    "rasalgethi" => "Rasalgethi",
    "laomedeia" => "Laomedeia",
    "achernar" => "Achernar",
    "alnilam" => "Alnilam",
    "schedar" => "Schedar",
    "gacrux" => "Gacrux",
    "pulcherrima" => "Pulcherrima",
    "achird" => "Achird",
    "zubenelgenubi" => "Zubenelgenubi",
    "vindemiatrix" => "Vindemiatrix",
    "sadachbia" => "Sadachbia",
    "sadaltager" => "Sadaltager",
    "sulafat" => "Sulafat",
};

/// Whether `voice` is already a full Cloud voice name (`en-US-Wavenet-D`).
pub fn is_cloud_voice_name(voice: &str) -> bool {
    let mut segments = voice.trim().split('-');
    let (Some(lang), Some(region), Some(rest)) = (segments.next(), segments.next(), segments.next())
    else {
        return false;
    };
    (2..=3).contains(&lang.len())
        && lang.chars().all(|c| c.is_ascii_lowercase())
        && (2..=3).contains(&region.len())
        && region.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && !rest.is_empty()
}

/// Language code embedded in a full Cloud voice name.
pub fn language_of_voice(voice: &str) -> Option<String> {
    if !is_cloud_voice_name(voice) {
        return None;
    }
    let mut segments = voice.trim().splitn(3, '-');
    match (segments.next(), segments.next()) {
        (Some(lang), Some(region)) => Some(format!("{lang}-{region}")),
        _ => None,
    }
}

/// Map a requested voice onto a name the Cloud API accepts.
pub fn resolve_voice_name(requested: &str, language_code: &str) -> String {
    let requested = requested.trim();
    if is_cloud_voice_name(requested) {
        return requested.to_string();
    }
    match CHIRP3_HD_VOICES.get(requested.to_ascii_lowercase().as_str()) {
        Some(voice) => format!("{language_code}-Chirp3-HD-{voice}"),
        None => format!("{language_code}-{FALLBACK_VOICE_SUFFIX}"),
    }
}

#[derive(Debug, Clone)]
pub struct GoogleCloudConfig {
    pub api_key: Option<String>,
    pub default_voice: String,
    pub language_code: String,
    pub base_url: String,
}

impl GoogleCloudConfig {
    pub fn from_speech_config(config: &SpeechConfig) -> Self {
        Self {
            api_key: config.get_api_key(crate::core::tts::GOOGLE_CLOUD).ok(),
            default_voice: config.default_voice.clone(),
            language_code: config.default_language_code.clone(),
            base_url: config
                .cloud_tts_endpoint
                .clone()
                .unwrap_or_else(|| GOOGLE_CLOUD_TTS_URL.to_string()),
        }
    }

    pub fn synthesize_url(&self) -> String {
        format!("{}/v1/text:synthesize", self.base_url.trim_end_matches('/'))
    }
}

impl Default for GoogleCloudConfig {
    fn default() -> Self {
        Self::from_speech_config(&SpeechConfig::default())
    }
}
