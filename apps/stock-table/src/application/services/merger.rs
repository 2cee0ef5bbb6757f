//! Live Dataset Merger
//!
//! Turns a one-shot snapshot followed by an unbounded update stream into a
//! single sequence of datasets.
//!
//! # Protocol
//!
//! 1. Fetch the snapshot; publish it as revision 1.
//! 2. Only after the snapshot completed, subscribe to updates.
//! 3. Publish every update as a wholesale replacement.
//!
//! Neither source is retried. A failed snapshot leaves the table empty; a
//! failed or finished update stream leaves the last dataset current and
//! marks the feed as disconnected.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use super::feed::{DatasetHub, FeedCondition, FeedState};
use crate::application::ports::{SnapshotSource, SourceError, StockBatch, UpdateSource};
use crate::domain::view::{Dataset, DatasetOrigin};
use crate::infrastructure::metrics::{self, SourceKind};

/// Errors that end a merger run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The snapshot fetch failed.
    #[error("snapshot failed: {0}")]
    Snapshot(SourceError),

    /// Subscribing to updates failed.
    #[error("update subscription failed: {0}")]
    Subscribe(SourceError),

    /// The update stream yielded an error.
    #[error("update stream failed: {0}")]
    UpdateStream(SourceError),

    /// The update stream ended.
    #[error("update stream ended")]
    UpdatesEnded,
}

/// Merges snapshot and update sources into the dataset hub.
pub struct LiveDatasetMerger {
    snapshot: Arc<dyn SnapshotSource>,
    updates: Arc<dyn UpdateSource>,
    hub: Arc<DatasetHub>,
    feed: Arc<FeedState>,
}

impl LiveDatasetMerger {
    /// Create a merger publishing into `hub` and reporting through `feed`.
    #[must_use]
    pub fn new(
        snapshot: Arc<dyn SnapshotSource>,
        updates: Arc<dyn UpdateSource>,
        hub: Arc<DatasetHub>,
        feed: Arc<FeedState>,
    ) -> Self {
        Self {
            snapshot,
            updates,
            hub,
            feed,
        }
    }

    /// Run until cancelled or until a source fails.
    ///
    /// # Errors
    ///
    /// Returns `MergeError` when the snapshot fails, the subscription cannot
    /// be opened, or the update stream fails or ends.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MergeError> {
        self.feed.set(FeedCondition::LoadingSnapshot);
        tracing::info!("Fetching stock snapshot");

        let snapshot = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            result = self.snapshot.fetch() => result,
        };

        let batch = match snapshot {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "Snapshot fetch failed");
                metrics::record_source_error(SourceKind::Snapshot);
                self.feed.set(FeedCondition::SnapshotFailed {
                    reason: e.to_string(),
                });
                return Err(MergeError::Snapshot(e));
            }
        };

        let rows = self.publish(DatasetOrigin::Snapshot, &batch);
        metrics::record_snapshot();
        tracing::info!(rows, "Snapshot loaded");

        let subscription = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            result = self.updates.subscribe() => result,
        };

        let mut stream = match subscription {
            Ok(stream) => stream,
            Err(e) => return Err(self.disconnect(MergeError::Subscribe(e))),
        };

        self.feed.set(FeedCondition::Live);
        metrics::set_feed_live(true);
        tracing::info!("Subscribed to stock updates");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!("Merger cancelled");
                    return Ok(());
                }
                item = stream.next() => match item {
                    Some(Ok(batch)) => {
                        self.feed.increment_updates();
                        let rows = self.publish(DatasetOrigin::Update, &batch);
                        metrics::record_update();
                        tracing::debug!(rows, "Stock update applied");
                    }
                    Some(Err(e)) => return Err(self.disconnect(MergeError::UpdateStream(e))),
                    None => return Err(self.disconnect(MergeError::UpdatesEnded)),
                },
            }
        }
    }

    fn publish(&self, origin: DatasetOrigin, batch: &StockBatch) -> usize {
        let dataset = Dataset::from_stocks(self.hub.next_revision(), origin, batch.as_deref());
        let rows = dataset.len();
        metrics::set_rows(rows);
        self.hub.publish(dataset);
        rows
    }

    fn disconnect(&self, error: MergeError) -> MergeError {
        tracing::warn!(error = %error, "Stock update feed lost, table is stale");
        metrics::record_source_error(SourceKind::Updates);
        metrics::set_feed_live(false);
        self.feed.set(FeedCondition::Disconnected {
            reason: error.to_string(),
        });
        error
    }
}

// =============================================================================
// Tests
// =============================================================================
