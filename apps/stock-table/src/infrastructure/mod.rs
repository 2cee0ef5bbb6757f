//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete record sources behind the application ports, the HTTP surface,
//! and the ambient configuration, metrics and tracing setup.

/// Environment configuration.
pub mod config;

/// REST snapshot adapter.
pub mod http;

/// Record set payload decoding shared by both adapters.
pub mod payload;

/// Socket.IO update adapter.
pub mod socketio;

/// Table API, health check and metrics HTTP server.
pub mod server;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
