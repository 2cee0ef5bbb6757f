//! Domain Layer - Table data types and pure pipeline logic.
//!
//! Everything here is synchronous and free of I/O: record types, the
//! projection, the sort state machine and view composition.

/// Raw stock records, display rows and the projection between them.
pub mod stock;

/// Column registry, sort directions and the sort state machine.
pub mod sort;

/// Datasets, view composition and combined-latest state.
pub mod view;
