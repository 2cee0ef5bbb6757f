//! Record Set Payloads
//!
//! Both sources carry the same JSON shape: an array of [`Stock`] objects, or
//! `null` when the server has nothing to report.

use serde_json::Value;

use crate::application::ports::StockBatch;
use crate::domain::stock::Stock;

/// Decode a record set payload.
///
/// `null` decodes to `None`. A payload that is not an array of records is
/// logged and also decodes to `None`, which downstream treats as empty.
#[must_use]
pub fn decode_batch(value: Value, source: &'static str) -> StockBatch {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<Vec<Stock>>(value) {
        Ok(stocks) => Some(stocks),
        Err(e) => {
            tracing::warn!(source, error = %e, "Malformed record set, treating as empty");
            None
        }
    }
}

/// Decode a record set from raw text. Empty text counts as `null`.
#[must_use]
pub fn decode_batch_str(text: &str, source: &'static str) -> StockBatch {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value) => decode_batch(value, source),
        Err(e) => {
            tracing::warn!(source, error = %e, "Unparsable record set, treating as empty");
            None
        }
    }
}
