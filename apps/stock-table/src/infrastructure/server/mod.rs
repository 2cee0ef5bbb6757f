//! Table API, Health Check and Metrics Endpoint
//!
//! HTTP surface of the stock table: the composed view, sort interaction,
//! health probes and Prometheus metrics.
//!
//! # Endpoints
//!
//! - `GET /api/stocks` - Current table view (503 until the first dataset)
//! - `GET /api/columns` - Column headers with their sort directions
//! - `POST /api/sort/{column}` - Cycle a column's sort direction
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (ready once a dataset exists)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{FeedCondition, SortSelection, StockTable};
use crate::domain::sort::{Column, ColumnHeader, SortDescriptor};
use crate::domain::view::DatasetOrigin;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Update feed condition.
    pub feed: FeedCondition,
    /// When the update feed last went live.
    pub live_since: Option<DateTime<Utc>>,
    /// Replacement sets received from the update feed.
    pub updates_received: u64,
    /// Current dataset, if any.
    pub dataset: Option<DatasetInfo>,
    /// In-order dataset subscribers.
    pub dataset_subscribers: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Data is flowing live.
    Healthy,
    /// Starting up, or serving stale data after losing the feed.
    Degraded,
    /// No data will ever arrive.
    Unhealthy,
}

/// Summary of the current dataset.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DatasetInfo {
    /// Dataset revision.
    pub revision: u64,
    /// Where the dataset came from.
    pub origin: DatasetOrigin,
    /// Row count.
    pub rows: usize,
}

/// Sort selection response.
#[derive(Debug, Clone, Serialize)]
pub struct SortResponse {
    /// Active descriptor.
    pub sort: SortDescriptor,
    /// All column headers.
    pub columns: Vec<ColumnHeader>,
}

impl From<SortSelection> for SortResponse {
    fn from(selection: SortSelection) -> Self {
        Self {
            sort: selection.descriptor,
            columns: selection.columns,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the table server.
#[derive(Debug)]
pub struct ServerState {
    version: String,
    started_at: Instant,
    table: Arc<StockTable>,
}

impl ServerState {
    /// Create new server state.
    #[must_use]
    pub fn new(version: String, table: Arc<StockTable>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            table,
        }
    }
}

/// Build the router over `state`.
#[must_use]
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/stocks", get(stocks_handler))
        .route("/api/columns", get(columns_handler))
        .route("/api/sort/{column}", post(sort_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// Table Server
// =============================================================================

/// Table HTTP server.
#[derive(Debug)]
pub struct TableServer {
    port: u16,
    state: Arc<ServerState>,
    cancel: CancellationToken,
}

impl TableServer {
    /// Create a new table server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<ServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Table server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Table server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn stocks_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.table.view() {
        Some(view) => Json(view.as_ref()).into_response(),
        None => error_response(StatusCode::SERVICE_UNAVAILABLE, "no stock data yet"),
    }
}

async fn columns_handler(State(state): State<Arc<ServerState>>) -> Json<SortResponse> {
    Json(state.table.sort_selection().into())
}

async fn sort_handler(
    State(state): State<Arc<ServerState>>,
    Path(column): Path<String>,
) -> Response {
    let Some(column) = Column::from_key(&column) else {
        return error_response(StatusCode::NOT_FOUND, format!("unknown column: {column}"));
    };
    Json(SortResponse::from(state.table.cycle_sort(column))).into_response()
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.table.dataset().is_some() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &ServerState) -> HealthResponse {
    let feed = state.table.feed();
    let condition = feed.get();
    let dataset = state.table.dataset().map(|d| DatasetInfo {
        revision: d.revision,
        origin: d.origin,
        rows: d.len(),
    });

    HealthResponse {
        status: determine_health_status(&condition),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        feed: condition,
        live_since: feed.live_since(),
        updates_received: feed.updates_received(),
        dataset,
        dataset_subscribers: state.table.datasets().receiver_count(),
    }
}

const fn determine_health_status(condition: &FeedCondition) -> HealthStatus {
    match condition {
        FeedCondition::Live => HealthStatus::Healthy,
        FeedCondition::Idle | FeedCondition::LoadingSnapshot | FeedCondition::Disconnected { .. } => {
            HealthStatus::Degraded
        }
        FeedCondition::SnapshotFailed { .. } | FeedCondition::Stopped => HealthStatus::Unhealthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Table server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use test_case::test_case;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::stock::Stock;
    use crate::domain::view::Dataset;

    fn stock(symbol: &str, current_price: f64) -> Stock {
        Stock {
            id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp"),
            current_price,
            closing_price: 10.0,
            url: String::new(),
        }
    }

    fn app() -> (Router, Arc<StockTable>) {
        let table = Arc::new(StockTable::default());
        let state = Arc::new(ServerState::new("test".to_string(), Arc::clone(&table)));
        (router(state), table)
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test_case(&FeedCondition::Live, HealthStatus::Healthy ; "live")]
    #[test_case(&FeedCondition::LoadingSnapshot, HealthStatus::Degraded ; "loading")]
    #[test_case(&FeedCondition::Disconnected { reason: "x".into() }, HealthStatus::Degraded ; "disconnected")]
    #[test_case(&FeedCondition::SnapshotFailed { reason: "x".into() }, HealthStatus::Unhealthy ; "snapshot failed")]
    #[test_case(&FeedCondition::Stopped, HealthStatus::Unhealthy ; "stopped")]
    fn status_from_feed(condition: &FeedCondition, expected: HealthStatus) {
        assert_eq!(determine_health_status(condition), expected);
    }

    #[tokio::test]
    async fn stocks_unavailable_before_first_dataset() {
        let (app, _) = app();
        let (status, body) = send(app, "GET", "/api/stocks").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "no stock data yet");
    }

    #[tokio::test]
    async fn columns_list_default_sort() {
        let (app, _) = app();
        let (status, body) = send(app, "GET", "/api/columns").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sort"]["column"], "symbol");
        assert_eq!(body["sort"]["direction"], "descending");
        let labels: Vec<_> = body["columns"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(labels, ["Symbol", "Company Name", "Price", "Change", "Chg %"]);
    }

    #[tokio::test]
    async fn sort_cycles_column() {
        let (app, table) = app();
        let (status, body) = send(app, "POST", "/api/sort/changePercent").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sort"]["column"], "changePercent");
        assert_eq!(body["sort"]["direction"], "descending");
        assert_eq!(table.sort_selection().descriptor.column, Column::ChangePercent);
    }

    #[tokio::test]
    async fn stocks_reflect_sort_immediately() {
        let (app, table) = app();
        let hub = table.datasets();
        let stocks = [
            stock("AAA", 10.0),
            stock("BBB", 30.0),
            stock("CCC", 20.0),
        ];
        let _ = hub.publish(Dataset::from_stocks(
            hub.next_revision(),
            DatasetOrigin::Snapshot,
            Some(&stocks),
        ));

        let (_, sorted) = send(app.clone(), "POST", "/api/sort/currentPrice").await;
        let (status, body) = send(app, "GET", "/api/stocks").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sort"], sorted["sort"]);
        assert_eq!(body["sort"]["column"], "currentPrice");
        let symbols: Vec<_> = body["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["symbol"].as_str().unwrap())
            .collect();
        assert_eq!(symbols, ["AAA", "CCC", "BBB"]);
    }

    #[tokio::test]
    async fn sort_rejects_unknown_column() {
        let (app, table) = app();
        let (status, body) = send(app, "POST", "/api/sort/volume").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown column: volume");
        assert_eq!(table.sort_selection().descriptor, SortDescriptor::DEFAULT);
    }

    #[tokio::test]
    async fn idle_table_is_not_ready() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn health_reports_feed() {
        let (app, _) = app();
        let (status, body) = send(app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["feed"]["state"], "idle");
        assert_eq!(body["dataset"], Value::Null);
    }
}
