//! Engine.IO v4 / Socket.IO v5 Text Codec
//!
//! Over the WebSocket transport every text frame carries exactly one
//! Engine.IO packet; message packets (`4`) wrap one Socket.IO packet.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2 / 3                                                    ping / pong
//! 40 | 40/admin,{"sid":".."}                               connect
//! 42["findAllStocks",[{..}]] | 42/admin,7["evt",..]        event
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Frame was empty.
    #[error("empty packet")]
    Empty,

    /// Unknown packet type digit.
    #[error("unknown {layer} packet type: {kind}")]
    UnknownType {
        /// `engine.io` or `socket.io`.
        layer: &'static str,
        /// Offending character.
        kind: char,
    },

    /// JSON body failed to parse.
    #[error("invalid JSON payload: {0}")]
    Json(String),

    /// Packet structure was invalid.
    #[error("invalid packet: {0}")]
    InvalidFormat(String),

    /// Binary attachments are not supported.
    #[error("binary packets are not supported")]
    BinaryUnsupported,
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

// =============================================================================
// Engine.IO
// =============================================================================

/// Open packet body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Session id.
    pub sid: String,
    /// Transports the server allows upgrading to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping period in milliseconds.
    pub ping_interval: u64,
    /// Grace period after a missed ping in milliseconds.
    pub ping_timeout: u64,
    /// Largest accepted payload in bytes.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// Longest silence tolerated before the connection counts as dead.
    #[must_use]
    pub const fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// `0`
    Open(Handshake),
    /// `1`
    Close,
    /// `2`
    Ping,
    /// `3`
    Pong,
    /// `4`, carrying a Socket.IO packet.
    Message(String),
    /// `5`
    Upgrade,
    /// `6`
    Noop,
}

impl EnginePacket {
    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// Returns an error for empty frames, unknown types, or a malformed open
    /// body.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(CodecError::Empty)?;
        let body = chars.as_str();

        Ok(match kind {
            '0' => Self::Open(serde_json::from_str(body)?),
            '1' => Self::Close,
            '2' => Self::Ping,
            '3' => Self::Pong,
            '4' => Self::Message(body.to_string()),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            other => {
                return Err(CodecError::UnknownType {
                    layer: "engine.io",
                    kind: other,
                });
            }
        })
    }

    /// Encode as a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the open body fails to serialize.
    pub fn encode(&self) -> Result<String, CodecError> {
        Ok(match self {
            Self::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Message(body) => format!("4{body}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        })
    }
}

// =============================================================================
// Socket.IO
// =============================================================================

/// Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0`: namespace connect request or acknowledgement.
    Connect {
        /// Namespace.
        namespace: String,
        /// Auth payload (client) or `{"sid":..}` (server).
        data: Option<Value>,
    },
    /// `1`: namespace disconnect.
    Disconnect {
        /// Namespace.
        namespace: String,
    },
    /// `2`: event.
    Event {
        /// Namespace.
        namespace: String,
        /// Acknowledgement id requested by the sender.
        ack_id: Option<u64>,
        /// Event name.
        name: String,
        /// Event arguments.
        args: Vec<Value>,
    },
    /// `3`: acknowledgement.
    Ack {
        /// Namespace.
        namespace: String,
        /// Acknowledged id.
        ack_id: u64,
        /// Acknowledgement arguments.
        args: Vec<Value>,
    },
    /// `4`: namespace connection refused.
    ConnectError {
        /// Namespace.
        namespace: String,
        /// Error payload.
        data: Option<Value>,
    },
}

impl SocketPacket {
    /// Connect request for `namespace`.
    #[must_use]
    pub fn connect(namespace: &str) -> Self {
        Self::Connect {
            namespace: namespace.to_string(),
            data: None,
        }
    }

    /// Namespace of the packet.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Decode the body of an Engine.IO message packet.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown types, binary packets, or malformed
    /// bodies.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(CodecError::Empty)?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(CodecError::BinaryUnsupported);
        }

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
            namespace = ns.to_string();
            rest = tail;
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse()
                .map_err(|_| CodecError::InvalidFormat(format!("ack id {}", &rest[..digits])))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let mut args = into_args(data)?;
                if args.is_empty() {
                    return Err(CodecError::InvalidFormat("event without name".to_string()));
                }
                let Value::String(name) = args.remove(0) else {
                    return Err(CodecError::InvalidFormat(
                        "event name is not a string".to_string(),
                    ));
                };
                Ok(Self::Event {
                    namespace,
                    ack_id,
                    name,
                    args,
                })
            }
            '3' => Ok(Self::Ack {
                namespace,
                ack_id: ack_id
                    .ok_or_else(|| CodecError::InvalidFormat("ack without id".to_string()))?,
                args: into_args(data)?,
            }),
            '4' => Ok(Self::ConnectError { namespace, data }),
            other => Err(CodecError::UnknownType {
                layer: "socket.io",
                kind: other,
            }),
        }
    }

    /// Encode as the body of an Engine.IO message packet.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload fails to serialize.
    pub fn encode(&self) -> Result<String, CodecError> {
        let (kind, ack_id, data) = match self {
            Self::Connect { data, .. } => ('0', None, data.clone()),
            Self::Disconnect { .. } => ('1', None, None),
            Self::Event {
                ack_id, name, args, ..
            } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                ('2', *ack_id, Some(Value::Array(array)))
            }
            Self::Ack { ack_id, args, .. } => ('3', Some(*ack_id), Some(Value::Array(args.clone()))),
            Self::ConnectError { data, .. } => ('4', None, data.clone()),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = data {
            out.push_str(&serde_json::to_string(&data)?);
        }
        Ok(out)
    }

    /// Encode wrapped in an Engine.IO message packet.
    ///
    /// # Errors
    ///
    /// Same as [`SocketPacket::encode`].
    pub fn to_frame(&self) -> Result<String, CodecError> {
        EnginePacket::Message(self.encode()?).encode()
    }
}

fn into_args(data: Option<Value>) -> Result<Vec<Value>, CodecError> {
    match data {
        None => Ok(Vec::new()),
        Some(Value::Array(args)) => Ok(args),
        Some(_) => Err(CodecError::InvalidFormat(
            "arguments are not an array".to_string(),
        )),
    }
}
