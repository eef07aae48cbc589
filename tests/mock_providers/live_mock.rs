//! WebSocket mock of the Gemini Live `BidiGenerateContent` endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// What the mock does once the client has sent its turn.
#[derive(Clone, Debug)]
pub enum LiveScript {
    /// Stream each chunk as one `serverContent` message, then `turnComplete`.
    Audio {
        chunks: Vec<Vec<u8>>,
        mime_type: Option<String>,
    },
    /// Stream the chunks, then report the turn as interrupted.
    Interrupted { chunks: Vec<Vec<u8>> },
    /// Complete the turn with a text part only.
    TextOnly,
    /// Close with a policy violation right after the handshake.
    RejectKey,
}

#[derive(Default)]
pub struct LiveMockState {
    pub connections: AtomicU64,
    pub setups: Mutex<Vec<Value>>,
    pub turns: Mutex<Vec<Value>>,
    pub request_paths: Mutex<Vec<String>>,
}

pub struct LiveMock {
    pub url: String,
    pub state: Arc<LiveMockState>,
}

impl LiveMock {
    pub async fn start(script: LiveScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(LiveMockState::default());

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                let script = script.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state, script).await;
                });
            }
        });

        Self {
            url: format!("ws://{addr}/ws/live"),
            state,
        }
    }

    pub fn connections(&self) -> u64 {
        self.state.connections.load(Ordering::SeqCst)
    }
}

async fn next_json<S>(read: &mut S) -> Option<Value>
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(Ok(message)) = read.next().await {
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Binary(data) => return serde_json::from_slice(&data).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

fn audio_message(chunk: &[u8], mime_type: Option<&str>) -> Message {
    let mut inline = json!({ "data": BASE64_STANDARD.encode(chunk) });
    if let Some(mime) = mime_type {
        inline["mimeType"] = json!(mime);
    }
    let message = json!({
        "serverContent": { "modelTurn": { "parts": [{ "inlineData": inline }] } }
    });
    Message::Text(message.to_string().into())
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<LiveMockState>,
    script: LiveScript,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let paths = state.clone();
    let ws_stream = accept_hdr_async(
        stream,
        move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            paths.request_paths.lock().push(request.uri().to_string());
            Ok(response)
        },
    )
    .await?;
    state.connections.fetch_add(1, Ordering::SeqCst);
    let (mut write, mut read) = ws_stream.split();

    if let LiveScript::RejectKey = script {
        write
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "API key not valid".into(),
            })))
            .await?;
        return Ok(());
    }

    let Some(setup) = next_json(&mut read).await else {
        return Ok(());
    };
    state.setups.lock().push(setup);
    write
        .send(Message::Text(json!({ "setupComplete": {} }).to_string().into()))
        .await?;

    let Some(turn) = next_json(&mut read).await else {
        return Ok(());
    };
    state.turns.lock().push(turn);

    match script {
        LiveScript::Audio { chunks, mime_type } => {
            for chunk in chunks {
                write
                    .send(audio_message(&chunk, mime_type.as_deref()))
                    .await?;
            }
        }
        LiveScript::Interrupted { chunks } => {
            for chunk in chunks {
                write.send(audio_message(&chunk, None)).await?;
            }
            write
                .send(Message::Text(
                    json!({ "serverContent": { "interrupted": true } })
                        .to_string()
                        .into(),
                ))
                .await?;
            return Ok(());
        }
        LiveScript::TextOnly => {
            let message = json!({
                "serverContent": { "modelTurn": { "parts": [{ "text": "I cannot speak" }] } }
            });
            write.send(Message::Text(message.to_string().into())).await?;
        }
        LiveScript::RejectKey => {}
    }

    write
        .send(Message::Text(
            json!({ "serverContent": { "turnComplete": true } })
                .to_string()
                .into(),
        ))
        .await?;
    Ok(())
}
