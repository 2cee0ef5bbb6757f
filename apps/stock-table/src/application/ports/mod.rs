//! Port Interfaces
//!
//! Contracts for the two record sources the pipeline merges. Infrastructure
//! adapters implement them; tests substitute channel-backed fakes or mocks.
//!
//! ## Driven Ports (Outbound)
//!
//! - `SnapshotSource`: one-shot fetch of the full record set
//! - `UpdateSource`: long-lived subscription yielding replacement sets

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::stock::Stock;

/// A full record set as received from a source.
///
/// `None` stands for a `null` payload and is treated as an empty set.
pub type StockBatch = Option<Vec<Stock>>;

/// Stream of replacement sets delivered by an [`UpdateSource`].
///
/// The stream ending, or yielding an error, means the live feed is lost.
pub type UpdateStream = BoxStream<'static, Result<StockBatch, SourceError>>;

/// Errors raised by record sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The transport could not reach the server.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The server closed the channel.
    #[error("channel closed: {0}")]
    Closed(String),
}

/// One-shot source of the startup snapshot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current record set once.
    async fn fetch(&self) -> Result<StockBatch, SourceError>;
}

/// Unbounded source of replacement record sets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Open the subscription.
    async fn subscribe(&self) -> Result<UpdateStream, SourceError>;
}
