//! Application Services
//!
//! Services that run the table pipeline on top of the domain logic.
//!
//! - `feed`: dataset hub and feed connectivity state
//! - `merger`: snapshot + update stream merge
//! - `sort_controller`: current sort selection and its emission
//! - `table`: process-wide table state, merger lifecycle and the live view

pub mod feed;
pub mod merger;
pub mod sort_controller;
pub mod table;

pub use feed::{DatasetHub, DatasetListener, FeedCondition, FeedState, SharedDataset};
pub use merger::{LiveDatasetMerger, MergeError};
pub use sort_controller::{SortController, SortSelection};
pub use table::{SharedView, StockTable, TableHandle, TableSettings};
