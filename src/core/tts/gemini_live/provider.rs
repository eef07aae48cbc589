//! Gemini Live session driver.

use async_trait::async_trait;
use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::OnceCell;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use url::Url;

use super::config::{GeminiLiveConfig, LIVE_OUTPUT_FORMAT, is_prebuilt_voice};
use super::messages::{ClientContentMessage, ServerMessage, SetupMessage};
use crate::core::audio::RawAudio;
use crate::core::tts::GEMINI_LIVE;
use crate::core::tts::base::{
    ProviderError, ProviderErrorKind, ProviderResult, SpeechProvider, VoiceConfig,
};

type LiveSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection parameters for Live sessions.
///
/// Built once per adapter and never mutated afterwards, so concurrent
/// requests share it freely and each opens its own session.
#[derive(Debug, Clone)]
pub struct LiveClient {
    url: String,
}

impl LiveClient {
    fn new(config: &GeminiLiveConfig) -> ProviderResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::new(
                    GEMINI_LIVE,
                    ProviderErrorKind::MissingCredential(
                        "GEMINI_API_KEY environment variable is not set".to_string(),
                    ),
                )
            })?;

        let mut url = Url::parse(&config.endpoint).map_err(|e| {
            ProviderError::new(
                GEMINI_LIVE,
                ProviderErrorKind::Connection(format!(
                    "invalid Live endpoint '{}': {e}",
                    config.endpoint
                )),
            )
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ProviderError::new(
                GEMINI_LIVE,
                ProviderErrorKind::Connection(format!(
                    "Live endpoint must use ws:// or wss://, got {}",
                    url.scheme()
                )),
            ));
        }
        url.query_pairs_mut().append_pair("key", api_key);

        Ok(Self {
            url: url.to_string(),
        })
    }

    async fn open_session(&self) -> ProviderResult<LiveSocket> {
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(connect_error)?;
        Ok(socket)
    }
}

fn protocol(message: impl Into<String>) -> ProviderError {
    ProviderError::new(GEMINI_LIVE, ProviderErrorKind::Protocol(message.into()))
}

fn connect_error(err: tungstenite::Error) -> ProviderError {
    match err {
        tungstenite::Error::Http(response) => {
            let status = response.status().as_u16();
            let body = response
                .body()
                .as_ref()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default();
            ProviderError::from_status(GEMINI_LIVE, status, body)
        }
        other => ProviderError::new(GEMINI_LIVE, ProviderErrorKind::Connection(other.to_string())),
    }
}

async fn send_json<T: Serialize>(socket: &mut LiveSocket, message: &T) -> ProviderResult<()> {
    let json = serde_json::to_string(message).map_err(|e| protocol(e.to_string()))?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ProviderError::new(GEMINI_LIVE, ProviderErrorKind::Connection(e.to_string())))
}

/// Next JSON message from the server, skipping control frames.
async fn next_message(socket: &mut LiveSocket) -> ProviderResult<ServerMessage> {
    loop {
        let frame = socket
            .next()
            .await
            .ok_or_else(|| protocol("session closed before the turn completed"))?
            .map_err(|e| {
                ProviderError::new(GEMINI_LIVE, ProviderErrorKind::Connection(e.to_string()))
            })?;

        let message: ServerMessage = match frame {
            Message::Text(text) => {
                serde_json::from_str(text.as_str()).map_err(|e| protocol(e.to_string()))?
            }
            Message::Binary(data) => {
                serde_json::from_slice(&data).map_err(|e| protocol(e.to_string()))?
            }
            Message::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (f.code, f.reason.as_str().to_string()))
                    .unwrap_or((CloseCode::Normal, String::new()));
                let kind = if code == CloseCode::Policy {
                    ProviderErrorKind::Authentication(reason)
                } else {
                    ProviderErrorKind::Protocol(format!("session closed ({code}): {reason}"))
                };
                return Err(ProviderError::new(GEMINI_LIVE, kind));
            }
            _ => continue,
        };

        if let Some(error) = &message.error {
            return Err(protocol(format!("server error: {error}")));
        }
        return Ok(message);
    }
}

/// Gemini Live websocket backend.
pub struct GeminiLiveTTS {
    config: GeminiLiveConfig,
    client: OnceCell<LiveClient>,
}

impl GeminiLiveTTS {
    pub fn new(config: GeminiLiveConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &GeminiLiveConfig {
        &self.config
    }

    /// Shared client handle, created on first use.
    pub async fn client(&self) -> ProviderResult<&LiveClient> {
        self.client
            .get_or_try_init(|| async { LiveClient::new(&self.config) })
            .await
    }

    async fn run_session(
        &self,
        socket: &mut LiveSocket,
        model: String,
        voice_name: String,
        text: &str,
    ) -> ProviderResult<RawAudio> {
        send_json(socket, &SetupMessage::new(model, voice_name)).await?;
        loop {
            let message = next_message(socket).await?;
            if message.setup_complete.is_some() {
                break;
            }
            if message.go_away.is_some() {
                return Err(protocol("server sent goAway during setup"));
            }
        }

        send_json(socket, &ClientContentMessage::complete_turn(text)).await?;

        let mut audio = Vec::new();
        let mut mime_type: Option<String> = None;
        loop {
            let message = next_message(socket).await?;
            let Some(content) = message.server_content else {
                continue;
            };

            for part in content.model_turn.into_iter().flat_map(|turn| turn.parts) {
                let Some(inline) = part.inline_data else {
                    if let Some(text) = part.text {
                        debug!("Live session text part: {}", text);
                    }
                    continue;
                };
                let bytes = BASE64_STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|e| protocol(format!("invalid base64 audio: {e}")))?;
                audio.extend_from_slice(&bytes);
                if mime_type.is_none() {
                    mime_type = inline.mime_type.filter(|m| !m.trim().is_empty());
                }
            }

            if content.interrupted {
                return Err(protocol(format!(
                    "turn interrupted after {} bytes of audio",
                    audio.len()
                )));
            }
            if content.turn_complete {
                break;
            }
        }

        if audio.is_empty() {
            return Err(ProviderError::new(GEMINI_LIVE, ProviderErrorKind::EmptyAudio));
        }

        debug!("Received {} bytes of PCM audio from Live session", audio.len());
        Ok(RawAudio::new(
            audio,
            mime_type.unwrap_or_else(|| LIVE_OUTPUT_FORMAT.to_string()),
        ))
    }
}

#[async_trait]
impl SpeechProvider for GeminiLiveTTS {
    fn name(&self) -> &str {
        GEMINI_LIVE
    }

    fn supports_voice(&self, voice: &str) -> bool {
        is_prebuilt_voice(voice)
    }

    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> ProviderResult<RawAudio> {
        let client = self.client().await?;
        let model = self.config.resolve_model(voice.model().as_deref());
        let voice_name = voice
            .voice_name()
            .unwrap_or_else(|| self.config.default_voice.clone());

        info!("Gemini Live synthesis: model={}, voice={}", model, voice_name);

        let mut socket = client.open_session().await?;
        let result = self.run_session(&mut socket, model, voice_name, text).await;
        if let Err(e) = socket.close(None).await {
            debug!("Closing Live session failed: {}", e);
        }
        result
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": GEMINI_LIVE,
            "transport": "websocket",
            "model": self.config.model,
            "default_voice": self.config.default_voice,
            "output_format": LIVE_OUTPUT_FORMAT,
        })
    }
}
