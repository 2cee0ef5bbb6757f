//! Prometheus Metrics Module
//!
//! Exposes pipeline metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Feed**: snapshots, updates and source errors
//! - **Dataset**: current row count and feed liveness
//! - **View**: recompositions, compose latency and sort interactions
//!
//! # Integration
//!
//! Metrics are rendered at `/metrics` on the table HTTP server.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::sort::Column;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder is already installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            #[allow(clippy::expect_used)]
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "stock_table_snapshots_total",
        "Snapshots loaded from the snapshot endpoint"
    );
    describe_counter!(
        "stock_table_updates_total",
        "Replacement sets received from the update channel"
    );
    describe_counter!(
        "stock_table_source_errors_total",
        "Source failures by source"
    );

    describe_gauge!("stock_table_rows", "Rows in the current dataset");
    describe_gauge!(
        "stock_table_feed_live",
        "1 while the update feed is live, 0 otherwise"
    );

    describe_counter!("stock_table_views_total", "Views recomposed");
    describe_counter!(
        "stock_table_sort_cycles_total",
        "Sort cycle requests by column"
    );
    describe_histogram!(
        "stock_table_view_compose_seconds",
        "Time to order a dataset into a view"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric label for record sources.
#[derive(Debug, Clone, Copy)]
pub enum SourceKind {
    /// One-shot snapshot endpoint.
    Snapshot,
    /// Push update channel.
    Updates,
}

impl SourceKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Updates => "updates",
        }
    }
}

/// Record a loaded snapshot.
pub fn record_snapshot() {
    counter!("stock_table_snapshots_total").increment(1);
}

/// Record an applied update.
pub fn record_update() {
    counter!("stock_table_updates_total").increment(1);
}

/// Record a source failure.
pub fn record_source_error(source: SourceKind) {
    counter!(
        "stock_table_source_errors_total",
        "source" => source.as_str()
    )
    .increment(1);
}

/// Update the current row count.
#[allow(clippy::cast_precision_loss)]
pub fn set_rows(rows: usize) {
    gauge!("stock_table_rows").set(rows as f64);
}

/// Update feed liveness.
pub fn set_feed_live(live: bool) {
    gauge!("stock_table_feed_live").set(if live { 1.0 } else { 0.0 });
}

/// Record a recomposed view.
pub fn record_view(duration: Duration) {
    counter!("stock_table_views_total").increment(1);
    histogram!("stock_table_view_compose_seconds").record(duration.as_secs_f64());
}

/// Record a sort cycle request.
pub fn record_sort_cycle(column: Column) {
    counter!(
        "stock_table_sort_cycles_total",
        "column" => column.key()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
