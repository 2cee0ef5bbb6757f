//! Stock Table Binary
//!
//! Starts the live stock table service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stock-table
//! ```
//!
//! # Environment Variables
//!
//! - `STOCK_API_URL`: REST API base URL (default: <http://localhost:3000>)
//! - `STOCK_SOCKET_URL`: Socket.IO base URL (default: <http://localhost:3000>)
//! - `STOCK_UPDATE_EVENT`: Update event name (default: findAllStocks)
//! - `STOCK_TABLE_HTTP_PORT`: Table API and health port (default: 8080)
//! - `STOCK_TABLE_REQUEST_TIMEOUT_SECS`: Snapshot request timeout (default: 10)
//! - `STOCK_TABLE_CONNECT_TIMEOUT_SECS`: Update channel connect timeout (default: 10)
//! - `STOCK_TABLE_DATASET_CAPACITY`: Dataset channel capacity (default: 64)
//! - `STOCK_TABLE_DEFAULT_SORT`: Column sorted descending at startup (default: symbol)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: stock-table)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use stock_table::infrastructure::server::{ServerState, TableServer};
use stock_table::infrastructure::telemetry;
use stock_table::{
    HttpSnapshotSource, SocketIoUpdateSource, StockTable, TableConfig, TableSettings, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting stock table");

    let _metrics_handle = init_metrics();

    let config = TableConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let table = Arc::new(StockTable::new(TableSettings {
        default_sort: config.pipeline.default_descriptor(),
        dataset_capacity: config.pipeline.dataset_capacity,
    }));

    let snapshot =
        HttpSnapshotSource::from_config(&config).context("failed to build snapshot client")?;
    let updates = SocketIoUpdateSource::from_config(&config);
    let handle = table.start(Arc::new(snapshot), Arc::new(updates));

    let server_state = Arc::new(ServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&table),
    ));
    let server = TableServer::new(
        config.server.http_port,
        server_state,
        shutdown_token.clone(),
    );
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Table server error");
        }
    });

    tracing::info!("Stock table ready");

    await_shutdown(shutdown_token).await;

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let result = handle.shutdown().await;
        let _ = server_task.await;
        result
    })
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Stock feed had failed before shutdown"),
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Graceful shutdown timed out"
        ),
    }

    tracing::info!("Stock table stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    let Ok(cwd) = std::env::current_dir() else {
        return;
    };
    if let Some(path) = cwd
        .ancestors()
        .map(|dir| dir.join(".env"))
        .find(|path| path.is_file())
    {
        let _ = dotenvy::from_path(path);
    }
}

/// Log the parsed configuration.
fn log_config(config: &TableConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        default_sort = config.pipeline.default_sort.key(),
        dataset_capacity = config.pipeline.dataset_capacity,
        update_event = %config.sources.update_event,
        "Configuration loaded"
    );
    tracing::debug!(
        snapshot_url = %config.snapshot_url(),
        socket_url = %config.sources.socket_url,
        request_timeout_secs = config.sources.request_timeout.as_secs(),
        connect_timeout_secs = config.sources.connect_timeout.as_secs(),
        "Source endpoints"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
