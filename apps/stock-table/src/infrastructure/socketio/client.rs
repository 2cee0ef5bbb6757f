//! Socket.IO Update Client
//!
//! Opens a WebSocket-only Socket.IO session and forwards every payload of
//! the configured event as a replacement record set.
//!
//! The session is not retried: any transport failure, server close or
//! missed ping ends the stream with an error and the caller decides what
//! to do next.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures_util::SinkExt;
use reqwest::Url;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::codec::{CodecError, DEFAULT_NAMESPACE, EnginePacket, Handshake, SocketPacket};
use crate::application::ports::{SourceError, StockBatch, UpdateSource, UpdateStream};
use crate::infrastructure::config::TableConfig;
use crate::infrastructure::payload::decode_batch;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Buffered replacement sets between the reader task and the consumer.
const STREAM_BUFFER: usize = 16;

// =============================================================================
// Error Type
// =============================================================================

/// Errors raised while opening or running a Socket.IO session.
#[derive(Debug, thiserror::Error)]
pub enum SocketIoError {
    /// Base URL cannot be turned into a WebSocket endpoint.
    #[error("invalid socket URL: {0}")]
    InvalidUrl(String),

    /// Connection or handshake did not finish in time.
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Unexpected packet during the handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server refused the namespace connection.
    #[error("namespace {namespace} refused: {reason}")]
    Refused {
        /// Namespace.
        namespace: String,
        /// Server-provided reason.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {0}")]
    Closed(String),
}

impl From<SocketIoError> for SourceError {
    fn from(e: SocketIoError) -> Self {
        match e {
            SocketIoError::Codec(e) => Self::Decode(e.to_string()),
            SocketIoError::Closed(reason) => Self::Closed(reason),
            other => Self::Transport(other.to_string()),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Settings of a Socket.IO update subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketIoConfig {
    /// Server base URL (`http`, `https`, `ws` or `wss`).
    pub url: Url,
    /// Namespace to join.
    pub namespace: String,
    /// Event carrying replacement sets.
    pub event: String,
    /// Upper bound for connect plus handshake.
    pub connect_timeout: Duration,
}

impl SocketIoConfig {
    /// Subscription settings for `event` on the default namespace.
    #[must_use]
    pub fn new(url: Url, event: impl Into<String>) -> Self {
        Self {
            url,
            namespace: DEFAULT_NAMESPACE.to_string(),
            event: event.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// WebSocket endpoint, e.g. `ws://host/socket.io/?EIO=4&transport=websocket`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL scheme has no WebSocket counterpart.
    pub fn endpoint(&self) -> Result<Url, SocketIoError> {
        let scheme = match self.url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(SocketIoError::InvalidUrl(format!("unsupported scheme {other}"))),
        };

        let mut url = self.url.clone();
        url.set_scheme(scheme)
            .map_err(|()| SocketIoError::InvalidUrl(self.url.to_string()))?;
        let path = format!("{}/socket.io/", self.url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(Some("EIO=4&transport=websocket"));
        url.set_fragment(None);
        Ok(url)
    }
}

// =============================================================================
// Update Source
// =============================================================================

/// [`UpdateSource`] backed by a Socket.IO server.
#[derive(Debug, Clone)]
pub struct SocketIoUpdateSource {
    config: SocketIoConfig,
}

impl SocketIoUpdateSource {
    /// Create a source from explicit settings.
    #[must_use]
    pub const fn new(config: SocketIoConfig) -> Self {
        Self { config }
    }

    /// Create a source from the service configuration.
    #[must_use]
    pub fn from_config(config: &TableConfig) -> Self {
        Self::new(SocketIoConfig {
            connect_timeout: config.sources.connect_timeout,
            ..SocketIoConfig::new(
                config.sources.socket_url.clone(),
                config.sources.update_event.clone(),
            )
        })
    }

    /// Subscription settings.
    #[must_use]
    pub const fn config(&self) -> &SocketIoConfig {
        &self.config
    }

    /// Open the session and join the namespace.
    async fn open(&self) -> Result<(Socket, Handshake), SocketIoError> {
        let endpoint = self.config.endpoint()?;
        tracing::info!(url = %endpoint, event = %self.config.event, "Connecting to update channel");

        tokio::time::timeout(self.config.connect_timeout, async {
            let (mut ws, _response) = tokio_tungstenite::connect_async(endpoint.as_str()).await?;
            let handshake = handshake(&mut ws, &self.config.namespace).await?;
            Ok::<_, SocketIoError>((ws, handshake))
        })
        .await
        .map_err(|_| SocketIoError::ConnectTimeout(self.config.connect_timeout))?
    }
}

#[async_trait]
impl UpdateSource for SocketIoUpdateSource {
    async fn subscribe(&self) -> Result<UpdateStream, SourceError> {
        let (ws, handshake) = self.open().await?;
        tracing::info!(
            sid = %handshake.sid,
            ping_interval_ms = handshake.ping_interval,
            ping_timeout_ms = handshake.ping_timeout,
            "Update channel connected"
        );

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let session = Session {
            ws,
            namespace: self.config.namespace.clone(),
            event: self.config.event.clone(),
            liveness: handshake.liveness_window(),
            tx,
        };
        tokio::spawn(session.run());

        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// Wait for the Engine.IO open packet, then join `namespace`.
async fn handshake(ws: &mut Socket, namespace: &str) -> Result<Handshake, SocketIoError> {
    let handshake = loop {
        match next_engine_packet(ws).await? {
            EnginePacket::Open(handshake) => break handshake,
            EnginePacket::Noop => {}
            other => {
                return Err(SocketIoError::Handshake(format!(
                    "expected open packet, got {other:?}"
                )));
            }
        }
    };

    let connect = SocketPacket::connect(namespace).to_frame()?;
    ws.send(Message::text(connect)).await?;

    loop {
        match next_engine_packet(ws).await? {
            EnginePacket::Ping => ws.send(Message::text(EnginePacket::Pong.encode()?)).await?,
            EnginePacket::Message(body) => match SocketPacket::decode(&body)? {
                SocketPacket::Connect { namespace: ns, .. } if ns == namespace => {
                    return Ok(handshake);
                }
                SocketPacket::ConnectError { namespace, data } => {
                    return Err(SocketIoError::Refused {
                        namespace,
                        reason: refusal_reason(data.as_ref()),
                    });
                }
                other => tracing::debug!(packet = ?other, "Ignoring packet before connect"),
            },
            EnginePacket::Close => {
                return Err(SocketIoError::Closed("server closed during handshake".to_string()));
            }
            _ => {}
        }
    }
}

async fn next_engine_packet(ws: &mut Socket) -> Result<EnginePacket, SocketIoError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(EnginePacket::decode(text.as_str())?),
            Some(Ok(Message::Close(_))) | None => {
                return Err(SocketIoError::Closed("connection closed during handshake".to_string()));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

fn refusal_reason(data: Option<&Value>) -> String {
    data.and_then(|d| d.get("message"))
        .and_then(Value::as_str)
        .map_or_else(
            || data.map_or_else(|| "no reason given".to_string(), Value::to_string),
            str::to_string,
        )
}

// =============================================================================
// Session
// =============================================================================

/// Reader task of one connected session.
struct Session {
    ws: Socket,
    namespace: String,
    event: String,
    liveness: Duration,
    tx: mpsc::Sender<Result<StockBatch, SourceError>>,
}

/// Outcome of handling one frame.
enum Step {
    Continue,
    Stop,
}

impl Session {
    async fn run(mut self) {
        let outcome = loop {
            tokio::select! {
                biased;
                () = self.tx.closed() => break Ok(()),
                frame = tokio::time::timeout(self.liveness, self.ws.next()) => {
                    let Ok(frame) = frame else {
                        break Err(SocketIoError::Closed(format!(
                            "no ping from server within {:?}",
                            self.liveness
                        )));
                    };
                    match self.on_frame(frame).await {
                        Ok(Step::Continue) => {}
                        Ok(Step::Stop) => break Ok(()),
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        match outcome {
            Ok(()) => {
                tracing::debug!("Update session ended");
                let _ = self.ws.close(None).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Update channel lost");
                let _ = self.tx.send(Err(e.into())).await;
                let _ = self.ws.close(None).await;
            }
        }
    }

    async fn on_frame(
        &mut self,
        frame: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) -> Result<Step, SocketIoError> {
        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Ping(data))) => {
                self.ws.send(Message::Pong(data)).await?;
                return Ok(Step::Continue);
            }
            Some(Ok(Message::Close(_))) => {
                return Err(SocketIoError::Closed("server sent close frame".to_string()));
            }
            Some(Ok(_)) => return Ok(Step::Continue),
            Some(Err(e)) => return Err(e.into()),
            None => return Err(SocketIoError::Closed("WebSocket stream ended".to_string())),
        };

        match EnginePacket::decode(text.as_str())? {
            EnginePacket::Ping => {
                self.ws.send(Message::text(EnginePacket::Pong.encode()?)).await?;
                Ok(Step::Continue)
            }
            EnginePacket::Close => Err(SocketIoError::Closed("server closed session".to_string())),
            EnginePacket::Message(body) => self.on_packet(&body).await,
            _ => Ok(Step::Continue),
        }
    }

    async fn on_packet(&mut self, body: &str) -> Result<Step, SocketIoError> {
        let packet = match SocketPacket::decode(body) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable packet");
                return Ok(Step::Continue);
            }
        };
        if packet.namespace() != self.namespace {
            return Ok(Step::Continue);
        }

        match packet {
            SocketPacket::Event { name, args, .. } if name == self.event => {
                let payload = args.into_iter().next().unwrap_or(Value::Null);
                let batch = decode_batch(payload, "updates");
                tracing::debug!(
                    event = %name,
                    records = batch.as_ref().map_or(0, Vec::len),
                    "Replacement set received"
                );
                if self.tx.send(Ok(batch)).await.is_err() {
                    return Ok(Step::Stop);
                }
                Ok(Step::Continue)
            }
            SocketPacket::Disconnect { .. } => Err(SocketIoError::Closed(
                "server disconnected namespace".to_string(),
            )),
            other => {
                tracing::trace!(packet = ?other, "Ignoring packet");
                Ok(Step::Continue)
            }
        }
    }
}
