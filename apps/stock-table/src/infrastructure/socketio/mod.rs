//! Socket.IO Update Adapter
//!
//! Implements [`UpdateSource`](crate::application::ports::UpdateSource) over
//! Socket.IO (Engine.IO v4, WebSocket transport only).
//!
//! # Session Flow
//!
//! 1. Connect to `{base}/socket.io/?EIO=4&transport=websocket`
//! 2. Receive the open packet and note the ping interval and timeout
//! 3. Send the namespace connect packet and wait for its acknowledgement
//! 4. Answer every server ping; forward each update event payload
//! 5. Close, disconnect or a missed ping ends the stream with an error

pub mod codec;
mod client;

pub use client::{SocketIoConfig, SocketIoError, SocketIoUpdateSource};
pub use codec::{CodecError, EnginePacket, Handshake, SocketPacket};
