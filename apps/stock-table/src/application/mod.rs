//! Application Layer - Ports and pipeline services.
//!
//! Ports describe the record sources the pipeline consumes; services wire
//! the domain logic to channels and tasks.

/// Port interfaces for record sources.
pub mod ports;

/// Merger, sort controller, live view and the table state object.
pub mod services;
