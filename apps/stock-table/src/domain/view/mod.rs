//! Datasets and Table Views
//!
//! A [`Dataset`] is one complete, immutable set of display rows as produced
//! by the merger. A [`TableView`] is that dataset ordered under the current
//! [`SortDescriptor`].
//!
//! [`ViewComposer`] implements combined-latest recomputation: it remembers
//! the newest value of each input and rebuilds the view whenever either one
//! changes, always starting again from the newest dataset.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::sort::{ColumnHeader, SortDescriptor};
use crate::domain::stock::{Stock, StockRow, project};

// =============================================================================
// Dataset
// =============================================================================

/// Where a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetOrigin {
    /// The one-shot startup snapshot.
    Snapshot,
    /// A push update event.
    Update,
}

/// The full current set of display rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    /// Emission counter, starting at 1 for the snapshot.
    pub revision: u64,
    /// Source of this set.
    pub origin: DatasetOrigin,
    /// Projected rows in server order.
    pub rows: Vec<StockRow>,
}

impl Dataset {
    /// Project a raw record set into a dataset.
    #[must_use]
    pub fn from_stocks(revision: u64, origin: DatasetOrigin, stocks: Option<&[Stock]>) -> Self {
        Self {
            revision,
            origin,
            rows: project(stocks),
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// Composition
// =============================================================================

/// Order `rows` under `descriptor`.
///
/// The input is never reordered in place; an unsorted descriptor returns the
/// rows in dataset order.
#[must_use]
pub fn compose(rows: &[StockRow], descriptor: &SortDescriptor) -> Vec<StockRow> {
    let mut ordered = rows.to_vec();
    if descriptor.is_active() {
        ordered.sort_by(|a, b| descriptor.compare(a, b));
    }
    ordered
}

/// The ordered table handed to the presentation surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    /// Revision of the dataset this view was built from.
    pub revision: u64,
    /// Origin of that dataset.
    pub origin: DatasetOrigin,
    /// Descriptor the rows are ordered by.
    pub sort: SortDescriptor,
    /// Column headers with their current directions.
    pub columns: Vec<ColumnHeader>,
    /// Ordered rows.
    pub rows: Vec<StockRow>,
}

/// Combined-latest state behind the live view.
#[derive(Debug, Clone)]
pub struct ViewComposer {
    dataset: Option<Arc<Dataset>>,
    sort: SortDescriptor,
    columns: Vec<ColumnHeader>,
}

impl ViewComposer {
    /// Create a composer with the initial sort selection and no dataset.
    #[must_use]
    pub const fn new(sort: SortDescriptor, columns: Vec<ColumnHeader>) -> Self {
        Self {
            dataset: None,
            sort,
            columns,
        }
    }

    /// Record a new dataset and recompute.
    pub fn on_dataset(&mut self, dataset: Arc<Dataset>) -> Option<TableView> {
        self.dataset = Some(dataset);
        self.view()
    }

    /// Record a new sort selection and recompute.
    ///
    /// Returns `None` until the first dataset has arrived.
    pub fn on_sort(&mut self, sort: SortDescriptor, columns: Vec<ColumnHeader>) -> Option<TableView> {
        self.sort = sort;
        self.columns = columns;
        self.view()
    }

    /// Build the view from the latest inputs.
    #[must_use]
    pub fn view(&self) -> Option<TableView> {
        let dataset = self.dataset.as_ref()?;
        Some(TableView {
            revision: dataset.revision,
            origin: dataset.origin,
            sort: self.sort,
            columns: self.columns.clone(),
            rows: compose(&dataset.rows, &self.sort),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
