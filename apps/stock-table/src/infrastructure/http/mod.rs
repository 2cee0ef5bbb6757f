//! HTTP Snapshot Adapter
//!
//! Implements [`SnapshotSource`](crate::application::ports::SnapshotSource)
//! over the REST API's `GET /stocks` endpoint.

mod snapshot;

pub use snapshot::HttpSnapshotSource;
