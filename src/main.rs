use std::io::Cursor;
use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use base64::prelude::*;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use speech_cache::core::cache::KeyValueStore;
use speech_cache::core::tts::gemini_prompted::{GeminiPromptedConfig, check_api_key};
use speech_cache::core::tts::keys;
use speech_cache::{SpeechConfig, SpeechService, VoiceConfig, open_store};

/// Cached text-to-speech with multi-provider fallback
#[derive(Parser, Debug)]
#[command(name = "speech-cache")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct VoiceArgs {
    /// Voice name (e.g. Puck, en-US-Wavenet-D)
    #[arg(long)]
    voice: Option<String>,

    /// Preferred provider (gemini-live, google-cloud, gemini-prompted)
    #[arg(long)]
    provider: Option<String>,

    /// Delivery style (cheerful, calm, narrator, whisper, excited)
    #[arg(long)]
    style: Option<String>,

    /// BCP-47 language code
    #[arg(long)]
    language: Option<String>,

    /// MIME type used in the returned data URL
    #[arg(long)]
    mime: Option<String>,
}

impl VoiceArgs {
    fn to_voice_config(&self) -> VoiceConfig {
        let mut voice = VoiceConfig::new();
        let pairs = [
            (keys::VOICE_NAME, &self.voice),
            (keys::PROVIDER, &self.provider),
            (keys::STYLE, &self.style),
            (keys::LANGUAGE_CODE, &self.language),
            (keys::MIME_TYPE, &self.mime),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                voice.insert(key, value.as_str());
            }
        }
        voice
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize text (through the cache) and print the data URL
    Speak {
        text: String,

        #[command(flatten)]
        voice: VoiceArgs,

        /// Cache key; defaults to the deterministic fingerprint key
        #[arg(long)]
        key: Option<String>,

        /// Cache TTL in seconds; zero or less stores without expiry
        #[arg(long, allow_hyphen_values = true)]
        ttl: Option<i64>,

        /// Write the WAV file here instead of printing the data URL
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the deterministic cache key for text and voice settings
    Fingerprint {
        text: String,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// List cached keys, or describe the audio stored under one key
    Inspect { key: Option<String> },

    /// Validate GEMINI_API_KEY with a minimal generateContent call
    CheckKey,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Initialize crypto provider for TLS connections
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        info!("Loading configuration from {}", config_path.display());
        SpeechConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        SpeechConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    match cli.command {
        Commands::Speak {
            text,
            voice,
            key,
            ttl,
            output,
        } => speak(&config, &text, &voice, key, ttl, output).await,
        Commands::Fingerprint { text, voice } => {
            let key = speech_cache::cache_key(
                &config.cache_key_prefix,
                &text,
                &voice.to_voice_config(),
            );
            println!("{key}");
            Ok(())
        }
        Commands::Inspect { key } => inspect(&config, key).await,
        Commands::CheckKey => {
            let prompted = GeminiPromptedConfig::from_speech_config(&config);
            match check_api_key(&prompted, &config.check_model).await {
                Ok(reply) => {
                    println!("API key OK ({}): {}", config.check_model, reply);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("API key check failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn speak(
    config: &SpeechConfig,
    text: &str,
    voice: &VoiceArgs,
    key: Option<String>,
    ttl: Option<i64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let service = SpeechService::from_config(config).await?;
    let voice = voice.to_voice_config();
    let key = key.unwrap_or_else(|| service.cache_key_for(text, &voice));

    match output {
        Some(path) => {
            let payload = service.get_audio_base64(text, &key, &voice, ttl).await?;
            let bytes = BASE64_STANDARD
                .decode(payload)
                .context("Cached audio is not valid base64")?;
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            let url = service.get_audio_url(text, &key, &voice, ttl).await?;
            println!("{url}");
        }
    }

    let stats = service.orchestrator().stats().snapshot();
    info!("{}", stats);
    Ok(())
}

async fn inspect(config: &SpeechConfig, key: Option<String>) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    if store.backend_type() == "memory" {
        bail!(
            "The in-memory cache only lives inside a running process. Set REDIS_URL, REDIS_HOST or CACHE_PATH to inspect a shared cache"
        );
    }
    store
        .ping()
        .await
        .with_context(|| format!("{} cache store is not reachable", store.backend_type()))?;
    println!("Cache store: {} (reachable)", store.backend_type());

    let Some(key) = key else {
        let keys = store.keys().await?;
        for key in &keys {
            match store.ttl(key).await? {
                Some(ttl) => println!("{key}\tttl={}s", ttl.as_secs()),
                None => println!("{key}\tttl=none"),
            }
        }
        println!("{} key(s)", keys.len());
        return Ok(());
    };

    let payload = store
        .get(&key)
        .await?
        .ok_or_else(|| anyhow!("No entry for key {key}"))?;
    let bytes = BASE64_STANDARD
        .decode(payload.as_bytes())
        .context("Stored value is not valid base64")?;
    let reader = hound::WavReader::new(Cursor::new(&bytes)).context("Stored value is not WAV")?;
    let spec = reader.spec();
    let frames = reader.duration();
    let seconds = if spec.sample_rate > 0 {
        frames as f64 / spec.sample_rate as f64
    } else {
        0.0
    };

    println!("Key:         {key}");
    println!("Size:        {} bytes", bytes.len());
    println!("Sample rate: {} Hz", spec.sample_rate);
    println!("Bits:        {}", spec.bits_per_sample);
    println!("Channels:    {}", spec.channels);
    println!("Duration:    {seconds:.3}s");
    if let Some(ttl) = store.ttl(&key).await? {
        println!("TTL:         {}s", ttl.as_secs());
    }
    Ok(())
}
