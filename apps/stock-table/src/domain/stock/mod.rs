//! Stock Records and Projection
//!
//! Raw stock records as delivered by the server and the display rows
//! derived from them. Rows are never patched: every new record set is
//! projected again from scratch.
//!
//! ```text
//! Stock { currentPrice, closingPrice, .. }
//!         │
//!         ▼  project()
//! StockRow { change = current − closing,
//!            changePercent = change / closing × 100, .. }
//! ```

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Raw Record
// =============================================================================

/// A stock as delivered by the snapshot endpoint and the update channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    /// Stable unique identifier.
    ///
    /// Accepted as a string or a number; `null` or missing reads as empty.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    /// Ticker symbol, used as the display key.
    pub symbol: String,
    /// Company name.
    pub name: String,
    /// Latest known price.
    pub current_price: f64,
    /// Previous closing price, the baseline for change metrics.
    pub closing_price: f64,
    /// Opaque link to the instrument page.
    pub url: String,
}

/// Identifier shapes seen on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Null,
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match WireId::deserialize(deserializer)? {
        WireId::Text(id) => id,
        WireId::Signed(id) => id.to_string(),
        WireId::Unsigned(id) => id.to_string(),
        WireId::Float(id) => id.to_string(),
        WireId::Null => String::new(),
    })
}

// =============================================================================
// Display Record
// =============================================================================

/// Render-ready projection of a [`Stock`] with computed change metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRow {
    /// Ticker symbol.
    pub symbol: String,
    /// Company name.
    pub name: String,
    /// Latest known price.
    pub current_price: f64,
    /// Absolute change against the closing price.
    pub change: f64,
    /// Change as a percentage of the closing price.
    ///
    /// `NaN` or infinite when the closing price is zero.
    pub change_percent: f64,
    /// Opaque link to the instrument page.
    pub url: String,
}

impl From<&Stock> for StockRow {
    fn from(stock: &Stock) -> Self {
        let change = stock.current_price - stock.closing_price;
        Self {
            symbol: stock.symbol.clone(),
            name: stock.name.clone(),
            current_price: stock.current_price,
            change,
            change_percent: change / stock.closing_price * 100.0,
            url: stock.url.clone(),
        }
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Project raw stocks into display rows.
///
/// Absent input yields an empty list. Input order is preserved; ordering is
/// applied later by the view composer. Degenerate prices propagate as
/// `NaN`/`Infinity` rather than failing.
#[must_use]
pub fn project(stocks: Option<&[Stock]>) -> Vec<StockRow> {
    stocks
        .unwrap_or_default()
        .iter()
        .map(StockRow::from)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(symbol: &str, current_price: f64, closing_price: f64) -> Stock {
        Stock {
            id: format!("id-{symbol}"),
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp"),
            current_price,
            closing_price,
            url: format!("https://example.com/{symbol}"),
        }
    }

    #[test]
    fn computes_change_and_percent() {
        let rows = project(Some(&[stock("AAA", 100.0, 90.0)]));
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.symbol, "AAA");
        assert_eq!(row.name, "AAA Corp");
        assert_eq!(row.current_price, 100.0);
        assert_eq!(row.change, 10.0);
        assert!((row.change_percent - 11.111_111_111_111_11).abs() < 1e-9);
        assert_eq!(row.url, "https://example.com/AAA");
    }

    #[test]
    fn negative_change() {
        let rows = project(Some(&[stock("BBB", 50.0, 60.0)]));
        assert_eq!(rows[0].change, -10.0);
        assert!((rows[0].change_percent + 16.666_666_666_666_67).abs() < 1e-9);
    }

    #[test]
    fn absent_and_empty_input_yield_empty() {
        assert!(project(None).is_empty());
        assert!(project(Some(&[])).is_empty());
    }

    #[test]
    fn preserves_input_order() {
        let stocks = [
            stock("ZZZ", 1.0, 1.0),
            stock("AAA", 2.0, 1.0),
            stock("MMM", 3.0, 1.0),
        ];
        let symbols: Vec<_> = project(Some(&stocks))
            .into_iter()
            .map(|row| row.symbol)
            .collect();
        assert_eq!(symbols, ["ZZZ", "AAA", "MMM"]);
    }

    #[test]
    fn zero_closing_price_propagates_non_finite() {
        let rows = project(Some(&[stock("UP", 5.0, 0.0), stock("FLAT", 0.0, 0.0)]));
        assert_eq!(rows[0].change, 5.0);
        assert!(rows[0].change_percent.is_infinite());
        assert!(rows[1].change_percent.is_nan());
    }

    #[test]
    fn deserializes_camel_case_wire_format() {
        let json = r#"{
            "id": "1",
            "symbol": "AAPL",
            "name": "Apple Inc.",
            "currentPrice": 190.5,
            "closingPrice": 188.0,
            "url": "https://example.com/aapl"
        }"#;
        let stock: Stock = serde_json::from_str(json).unwrap();
        assert_eq!(stock.symbol, "AAPL");
        assert_eq!(stock.current_price, 190.5);
        assert_eq!(stock.closing_price, 188.0);
    }

    #[test]
    fn numeric_null_or_missing_id_is_accepted() {
        let stocks: Vec<Stock> = serde_json::from_str(
            r#"[
                {"id": 7, "symbol": "AAA", "name": "A", "currentPrice": 1.0, "closingPrice": 1.0, "url": ""},
                {"id": null, "symbol": "BBB", "name": "B", "currentPrice": 1.0, "closingPrice": 1.0, "url": ""},
                {"symbol": "CCC", "name": "C", "currentPrice": 1.0, "closingPrice": 1.0, "url": ""}
            ]"#,
        )
        .unwrap();
        let ids: Vec<_> = stocks.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["7", "", ""]);
    }

    #[test]
    fn row_serializes_camel_case() {
        let row = StockRow::from(&stock("AAA", 100.0, 90.0));
        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("changePercent").is_some());
        assert!(value.get("currentPrice").is_some());
    }

    proptest::proptest! {
        #[test]
        fn projection_matches_formula(
            current in -1.0e6f64..1.0e6,
            closing in prop_nonzero(),
        ) {
            let row = StockRow::from(&stock("P", current, closing));
            proptest::prop_assert_eq!(row.change, current - closing);
            proptest::prop_assert_eq!(row.change_percent, (current - closing) / closing * 100.0);
        }
    }

    fn prop_nonzero() -> impl proptest::strategy::Strategy<Value = f64> {
        use proptest::strategy::Strategy;
        (1.0e-3f64..1.0e6).prop_union(-1.0e6f64..-1.0e-3)
    }
}
