//! Sort Controller
//!
//! Owns the [`SortState`] and publishes the active descriptor on a `watch`
//! channel. `cycle` emits before returning, so a subscriber never observes
//! a descriptor older than the latest call.

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::domain::sort::{Column, ColumnHeader, SortDescriptor, SortState};
use crate::infrastructure::metrics;

/// Descriptor and headers published after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSelection {
    /// Active descriptor, or the unsorted sentinel.
    pub descriptor: SortDescriptor,
    /// All column headers with their directions.
    pub columns: Vec<ColumnHeader>,
}

/// Holder of the current sort selection.
#[derive(Debug)]
pub struct SortController {
    state: Mutex<SortState>,
    tx: watch::Sender<SortSelection>,
}

impl SortController {
    /// Create a controller with `initial` pre-selected.
    #[must_use]
    pub fn new(initial: SortDescriptor) -> Self {
        let state = SortState::new(initial);
        let selection = selection_of(&state);
        Self {
            state: Mutex::new(state),
            tx: watch::channel(selection).0,
        }
    }

    /// Advance `column` through unsorted → descending → ascending → unsorted.
    ///
    /// Every other column is reset; the new selection is published before
    /// this returns, and the same selection is returned to the caller.
    pub fn cycle(&self, column: Column) -> SortSelection {
        let mut state = self.state.lock();
        state.cycle(column);
        let selection = selection_of(&state);
        self.tx.send_replace(selection.clone());
        drop(state);

        metrics::record_sort_cycle(column);
        tracing::debug!(
            column = column.key(),
            direction = ?selection.descriptor.direction,
            "Sort cycled"
        );
        selection
    }

    /// The current descriptor.
    #[must_use]
    pub fn active(&self) -> SortDescriptor {
        self.tx.borrow().descriptor
    }

    /// The current selection.
    #[must_use]
    pub fn selection(&self) -> SortSelection {
        self.tx.borrow().clone()
    }

    /// Receiver of every published selection.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SortSelection> {
        self.tx.subscribe()
    }
}

impl Default for SortController {
    fn default() -> Self {
        Self::new(SortDescriptor::DEFAULT)
    }
}

fn selection_of(state: &SortState) -> SortSelection {
    SortSelection {
        descriptor: state.active(),
        columns: state.headers().to_vec(),
    }
}
