//! Dataset Hub and Feed State
//!
//! Distribution of merged datasets to downstream consumers.
//!
//! The hub keeps two channels side by side:
//! - a `watch` channel holding the current dataset, so late subscribers
//!   start from the newest value;
//! - a `broadcast` channel carrying every dataset in emission order.
//!
//! [`FeedState`] exposes the connectivity condition of the pipeline so a
//! lost update feed is visible instead of silently stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::domain::view::Dataset;

// =============================================================================
// Dataset Hub
// =============================================================================

/// Default capacity of the in-order dataset channel.
pub const DEFAULT_DATASET_CAPACITY: usize = 64;

/// Shared handle to a dataset snapshot.
pub type SharedDataset = Arc<Dataset>;

/// Consumer run inline by [`DatasetHub::publish`].
///
/// Called before channel subscribers are notified, on the publishing task.
/// Implementations must not block.
pub trait DatasetListener: Send + Sync + std::fmt::Debug {
    /// Handle a newly published dataset.
    fn on_dataset(&self, dataset: &SharedDataset);
}

/// Channels the merger publishes datasets through.
#[derive(Debug)]
pub struct DatasetHub {
    current_tx: watch::Sender<Option<SharedDataset>>,
    events_tx: broadcast::Sender<SharedDataset>,
    revision: AtomicU64,
    listener: Option<Arc<dyn DatasetListener>>,
}

impl DatasetHub {
    /// Create a hub whose in-order channel holds `capacity` datasets.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            current_tx: watch::channel(None).0,
            events_tx: broadcast::channel(capacity.max(1)).0,
            revision: AtomicU64::new(0),
            listener: None,
        }
    }

    /// Create a hub that runs `listener` on every publish.
    #[must_use]
    pub fn with_listener(capacity: usize, listener: Arc<dyn DatasetListener>) -> Self {
        Self {
            listener: Some(listener),
            ..Self::new(capacity)
        }
    }

    /// Create a hub with the default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_DATASET_CAPACITY)
    }

    /// Reserve the next revision number.
    pub fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Replace the current dataset and notify subscribers.
    ///
    /// Returns the number of in-order receivers that got the dataset.
    pub fn publish(&self, dataset: Dataset) -> usize {
        let dataset = Arc::new(dataset);
        if let Some(listener) = &self.listener {
            listener.on_dataset(&dataset);
        }
        self.current_tx.send_replace(Some(Arc::clone(&dataset)));
        self.events_tx.send(dataset).unwrap_or(0)
    }

    /// The newest dataset, if any has been published.
    #[must_use]
    pub fn current(&self) -> Option<SharedDataset> {
        self.current_tx.borrow().clone()
    }

    /// Receiver that always observes the newest dataset.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<SharedDataset>> {
        self.current_tx.subscribe()
    }

    /// Receiver for every dataset published from now on, in order.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SharedDataset> {
        self.events_tx.subscribe()
    }

    /// Number of in-order receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.events_tx.receiver_count()
    }
}

impl Default for DatasetHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// =============================================================================
// Feed State
// =============================================================================

/// Connectivity condition of the merged feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedCondition {
    /// Pipeline not started.
    Idle,
    /// Waiting for the snapshot.
    LoadingSnapshot,
    /// Snapshot loaded, update stream subscribed.
    Live,
    /// Snapshot fetch failed; no dataset will be produced.
    SnapshotFailed {
        /// Failure reason.
        reason: String,
    },
    /// Update stream failed or ended; the last dataset is stale.
    Disconnected {
        /// Failure reason.
        reason: String,
    },
    /// Pipeline shut down.
    Stopped,
}

impl FeedCondition {
    /// Short name for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LoadingSnapshot => "loading_snapshot",
            Self::Live => "live",
            Self::SnapshotFailed { .. } => "snapshot_failed",
            Self::Disconnected { .. } => "disconnected",
            Self::Stopped => "stopped",
        }
    }

    /// Whether the feed is currently delivering updates.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Whether the feed has failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::SnapshotFailed { .. } | Self::Disconnected { .. })
    }
}

/// Observable feed condition plus counters.
#[derive(Debug)]
pub struct FeedState {
    condition: watch::Sender<FeedCondition>,
    live_since: parking_lot::RwLock<Option<DateTime<Utc>>>,
    updates_received: AtomicU64,
}

impl FeedState {
    /// Create an idle feed state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            condition: watch::channel(FeedCondition::Idle).0,
            live_since: parking_lot::RwLock::new(None),
            updates_received: AtomicU64::new(0),
        }
    }

    /// Set the condition and notify watchers.
    pub fn set(&self, condition: FeedCondition) {
        if condition.is_live() {
            *self.live_since.write() = Some(Utc::now());
        }
        self.condition.send_replace(condition);
    }

    /// Count one received update event.
    pub fn increment_updates(&self) {
        self.updates_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Current condition.
    #[must_use]
    pub fn get(&self) -> FeedCondition {
        self.condition.borrow().clone()
    }

    /// Receiver notified on every condition change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<FeedCondition> {
        self.condition.subscribe()
    }

    /// When the feed last went live.
    #[must_use]
    pub fn live_since(&self) -> Option<DateTime<Utc>> {
        *self.live_since.read()
    }

    /// Update events received so far.
    #[must_use]
    pub fn updates_received(&self) -> u64 {
        self.updates_received.load(Ordering::Relaxed)
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::view::DatasetOrigin;

    fn dataset(hub: &DatasetHub) -> Dataset {
        Dataset::from_stocks(hub.next_revision(), DatasetOrigin::Update, None)
    }

    #[test]
    fn empty_hub_has_no_current() {
        let hub = DatasetHub::with_defaults();
        assert!(hub.current().is_none());
        assert_eq!(hub.receiver_count(), 0);
    }

    #[test]
    fn revisions_increase_from_one() {
        let hub = DatasetHub::with_defaults();
        assert_eq!(hub.next_revision(), 1);
        assert_eq!(hub.next_revision(), 2);
    }

    #[test]
    fn publish_without_receivers_still_updates_current() {
        let hub = DatasetHub::with_defaults();
        let delivered = hub.publish(dataset(&hub));
        assert_eq!(delivered, 0);
        assert_eq!(hub.current().unwrap().revision, 1);
    }

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let hub = DatasetHub::with_defaults();
        let mut rx = hub.subscribe();

        for _ in 0..3 {
            let _ = hub.publish(dataset(&hub));
        }

        for expected in 1..=3 {
            assert_eq!(rx.recv().await.unwrap().revision, expected);
        }
    }

    #[tokio::test]
    async fn watch_sees_latest_only() {
        let hub = DatasetHub::with_defaults();
        let mut rx = hub.watch();

        let _ = hub.publish(dataset(&hub));
        let _ = hub.publish(dataset(&hub));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().revision, 2);
    }

    #[derive(Debug, Default)]
    struct Recorder(parking_lot::Mutex<Vec<u64>>);

    impl DatasetListener for Recorder {
        fn on_dataset(&self, dataset: &SharedDataset) {
            self.0.lock().push(dataset.revision);
        }
    }

    #[test]
    fn listener_runs_inline_on_publish() {
        let recorder = Arc::new(Recorder::default());
        let hub = DatasetHub::with_listener(4, Arc::clone(&recorder) as Arc<dyn DatasetListener>);

        let _ = hub.publish(dataset(&hub));
        assert_eq!(*recorder.0.lock(), [1]);

        let _ = hub.publish(dataset(&hub));
        assert_eq!(*recorder.0.lock(), [1, 2]);
        assert_eq!(hub.current().unwrap().revision, 2);
    }

    #[test]
    fn receiver_count_decreases_on_drop() {
        let hub = DatasetHub::with_defaults();
        {
            let _rx = hub.subscribe();
            assert_eq!(hub.receiver_count(), 1);
        }
        assert_eq!(hub.receiver_count(), 0);
    }

    #[test]
    fn feed_condition_serialization() {
        let json = serde_json::to_value(FeedCondition::Disconnected {
            reason: "closed".to_string(),
        })
        .unwrap();
        assert_eq!(json["state"], "disconnected");
        assert_eq!(json["reason"], "closed");

        let json = serde_json::to_value(FeedCondition::LoadingSnapshot).unwrap();
        assert_eq!(json["state"], "loading_snapshot");
    }

    #[test]
    fn feed_state_records_live_since() {
        let state = FeedState::new();
        assert_eq!(state.get(), FeedCondition::Idle);
        assert!(state.live_since().is_none());

        state.set(FeedCondition::Live);
        assert!(state.get().is_live());
        assert!(state.live_since().is_some());
    }

    #[test]
    fn failed_conditions() {
        assert!(FeedCondition::SnapshotFailed { reason: String::new() }.is_failed());
        assert!(FeedCondition::Disconnected { reason: String::new() }.is_failed());
        assert!(!FeedCondition::Live.is_failed());
        assert!(!FeedCondition::Stopped.is_failed());
    }
}
