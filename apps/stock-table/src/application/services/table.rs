//! Stock Table State
//!
//! The process-wide owner of the pipeline. Construction sets up the sort
//! controller with its default descriptor, an idle merger and the live view;
//! [`StockTable::start`] spawns the merger and hands back an owned
//! [`TableHandle`] whose `shutdown` tears it down.
//!
//! The view is recomposed inline by whichever call changed an input: the
//! merger's publish for a new dataset, [`StockTable::cycle_sort`] for a new
//! selection. Both paths hold the same lock, so a reader never sees a view
//! older than the last completed publish or cycle.
//!
//! ```text
//! SnapshotSource ─┐
//!                 ├─► LiveDatasetMerger ─► DatasetHub ─┐
//! UpdateSource ───┘                                     ├─► LiveView ─► views
//!                           SortController ─────────────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::feed::{DatasetHub, DatasetListener, FeedCondition, FeedState, SharedDataset};
use super::merger::{LiveDatasetMerger, MergeError};
use super::sort_controller::{SortController, SortSelection};
use crate::application::ports::{SnapshotSource, UpdateSource};
use crate::domain::sort::{Column, SortDescriptor};
use crate::domain::view::{TableView, ViewComposer};
use crate::infrastructure::metrics;

/// Shared handle to a composed view.
pub type SharedView = Arc<TableView>;

/// Construction settings for [`StockTable`].
#[derive(Debug, Clone, Copy)]
pub struct TableSettings {
    /// Sort selection at startup.
    pub default_sort: SortDescriptor,
    /// Capacity of the in-order dataset channel.
    pub dataset_capacity: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            default_sort: SortDescriptor::DEFAULT,
            dataset_capacity: super::feed::DEFAULT_DATASET_CAPACITY,
        }
    }
}

// =============================================================================
// Stock Table
// =============================================================================

/// Live, sortable stock table.
#[derive(Debug)]
pub struct StockTable {
    sort: SortController,
    hub: Arc<DatasetHub>,
    feed: Arc<FeedState>,
    view: Arc<LiveView>,
}

impl StockTable {
    /// Create an idle table.
    #[must_use]
    pub fn new(settings: TableSettings) -> Self {
        let sort = SortController::new(settings.default_sort);
        let view = Arc::new(LiveView::new(sort.selection()));
        let hub = DatasetHub::with_listener(
            settings.dataset_capacity,
            Arc::clone(&view) as Arc<dyn DatasetListener>,
        );
        Self {
            sort,
            hub: Arc::new(hub),
            feed: Arc::new(FeedState::new()),
            view,
        }
    }

    /// Start merging `snapshot` and `updates` into the table.
    #[must_use]
    pub fn start(
        &self,
        snapshot: Arc<dyn SnapshotSource>,
        updates: Arc<dyn UpdateSource>,
    ) -> TableHandle {
        let cancel = CancellationToken::new();

        let merger = LiveDatasetMerger::new(
            snapshot,
            updates,
            Arc::clone(&self.hub),
            Arc::clone(&self.feed),
        );
        let merger_cancel = cancel.clone();
        let merger = tokio::spawn(async move {
            let result = merger.run(merger_cancel).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Stock feed stopped");
            }
            result
        });

        tracing::info!("Stock table started");

        TableHandle {
            cancel,
            merger,
            feed: Arc::clone(&self.feed),
        }
    }

    /// Cycle the sort direction of `column`.
    ///
    /// The view is recomposed under the new selection before this returns.
    pub fn cycle_sort(&self, column: Column) -> SortSelection {
        self.view.cycle(&self.sort, column)
    }

    /// Current sort selection.
    #[must_use]
    pub fn sort_selection(&self) -> SortSelection {
        self.sort.selection()
    }

    /// Latest composed view, if a dataset has arrived.
    #[must_use]
    pub fn view(&self) -> Option<SharedView> {
        self.view.current()
    }

    /// Receiver notified on every recomposed view.
    #[must_use]
    pub fn subscribe_views(&self) -> watch::Receiver<Option<SharedView>> {
        self.view.subscribe()
    }

    /// Latest merged dataset.
    #[must_use]
    pub fn dataset(&self) -> Option<SharedDataset> {
        self.hub.current()
    }

    /// Dataset distribution hub.
    #[must_use]
    pub const fn datasets(&self) -> &Arc<DatasetHub> {
        &self.hub
    }

    /// Feed connectivity state.
    #[must_use]
    pub const fn feed(&self) -> &Arc<FeedState> {
        &self.feed
    }
}

impl Default for StockTable {
    fn default() -> Self {
        Self::new(TableSettings::default())
    }
}

// =============================================================================
// Table Handle
// =============================================================================

/// Owned handle to the running merger.
#[derive(Debug)]
pub struct TableHandle {
    cancel: CancellationToken,
    merger: JoinHandle<Result<(), MergeError>>,
    feed: Arc<FeedState>,
}

impl TableHandle {
    /// Stop the merger and wait for it.
    ///
    /// # Errors
    ///
    /// Returns the merger's error if the feed had already failed.
    pub async fn shutdown(self) -> Result<(), MergeError> {
        self.cancel.cancel();

        let result = match self.merger.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Merger task failed");
                Ok(())
            }
        };

        if !self.feed.get().is_failed() {
            self.feed.set(FeedCondition::Stopped);
        }
        metrics::set_feed_live(false);
        tracing::info!("Stock table stopped");
        result
    }
}

// =============================================================================
// Live View
// =============================================================================

/// Combined-latest composer shared by the dataset and sort paths.
#[derive(Debug)]
struct LiveView {
    composer: Mutex<ViewComposer>,
    views: watch::Sender<Option<SharedView>>,
}

impl LiveView {
    fn new(selection: SortSelection) -> Self {
        Self {
            composer: Mutex::new(ViewComposer::new(selection.descriptor, selection.columns)),
            views: watch::channel(None).0,
        }
    }

    /// Cycle `column` on `sort` and recompose while holding the composer.
    ///
    /// Lock order is composer, then sort state.
    fn cycle(&self, sort: &SortController, column: Column) -> SortSelection {
        let started = Instant::now();
        let mut composer = self.composer.lock();
        let selection = sort.cycle(column);
        let view = composer.on_sort(selection.descriptor, selection.columns.clone());
        self.publish(view, started);
        selection
    }

    fn current(&self) -> Option<SharedView> {
        self.views.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<SharedView>> {
        self.views.subscribe()
    }

    fn publish(&self, view: Option<TableView>, started: Instant) {
        let Some(view) = view else {
            return;
        };
        metrics::record_view(started.elapsed());
        tracing::trace!(
            revision = view.revision,
            rows = view.rows.len(),
            column = view.sort.column.key(),
            direction = ?view.sort.direction,
            "View recomposed"
        );
        self.views.send_replace(Some(Arc::new(view)));
    }
}

impl DatasetListener for LiveView {
    fn on_dataset(&self, dataset: &SharedDataset) {
        let started = Instant::now();
        let mut composer = self.composer.lock();
        let view = composer.on_dataset(Arc::clone(dataset));
        self.publish(view, started);
    }
}

// =============================================================================
// Tests
// =============================================================================
