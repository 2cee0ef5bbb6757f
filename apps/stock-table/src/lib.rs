#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Stock Table - Live Sortable Quote Table
//!
//! Loads a snapshot of stock records, keeps it current from a Socket.IO
//! update stream, projects display rows with change metrics, and serves
//! them ordered by a user-selected column.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure table logic
//!   - `stock`: Records, display rows and the projection
//!   - `sort`: Column registry, sort state machine, comparators
//!   - `view`: Datasets and combined-latest view composition
//!
//! - **Application**: Ports and pipeline services
//!   - `ports`: Snapshot and update source interfaces
//!   - `services`: Merger, sort controller, table state and handle
//!
//! - **Infrastructure**: Adapters and ambient concerns
//!   - `http`: REST snapshot adapter
//!   - `socketio`: Socket.IO update adapter
//!   - `server`: Table API, health and metrics endpoints
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! GET /stocks ───────┐
//!                    ├──► LiveDatasetMerger ──► DatasetHub ──┐
//! socket.io updates ─┘                                       ├──► ViewComposer ──► /api/stocks
//!                               SortController ──────────────┘
//!                                     ▲
//!                         POST /api/sort/{column}
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Table types and pure logic with no I/O.
pub mod domain;

/// Application layer - Ports and pipeline services.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::sort::{Column, ColumnHeader, SortDescriptor, SortDirection, SortState};
pub use domain::stock::{Stock, StockRow, project};
pub use domain::view::{Dataset, DatasetOrigin, TableView, ViewComposer, compose};

// Ports
pub use application::ports::{SnapshotSource, SourceError, StockBatch, UpdateSource, UpdateStream};

// Pipeline services
pub use application::services::{
    DatasetHub, FeedCondition, FeedState, LiveDatasetMerger, MergeError, SharedDataset,
    SharedView, SortController, SortSelection, StockTable, TableHandle, TableSettings,
};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, PipelineSettings, ServerSettings, SourceSettings, TableConfig,
};

// Adapters
pub use infrastructure::http::HttpSnapshotSource;
pub use infrastructure::socketio::{SocketIoConfig, SocketIoError, SocketIoUpdateSource};

// Table server
pub use infrastructure::server::{ServerError, ServerState, TableServer};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
