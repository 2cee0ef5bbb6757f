//! Sort Selection Types
//!
//! Column registry, tri-state sort direction and the single-active-column
//! sort state machine.
//!
//! # Cycle
//!
//! ```text
//! unsorted ──► descending ──► ascending ──► unsorted
//! ```
//!
//! Activating a column resets every other column to unsorted, so at most
//! one column carries a direction at any time.

mod collation;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::stock::StockRow;

pub use collation::locale_cmp;

// =============================================================================
// Columns
// =============================================================================

/// A sortable table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    /// Ticker symbol.
    #[serde(rename = "symbol")]
    Symbol,
    /// Company name.
    #[serde(rename = "name")]
    Name,
    /// Latest price.
    #[serde(rename = "currentPrice")]
    CurrentPrice,
    /// Absolute change.
    #[serde(rename = "change")]
    Change,
    /// Percentage change.
    #[serde(rename = "changePercent")]
    ChangePercent,
}

/// Value extracted from a row for comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortValue<'a> {
    /// Text field, compared with [`locale_cmp`].
    Text(&'a str),
    /// Numeric field.
    Number(f64),
}

/// Typed accessor reading a column's value from a row.
pub type Accessor = for<'a> fn(&'a StockRow) -> SortValue<'a>;

impl Column {
    /// All columns in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Symbol,
            Self::Name,
            Self::CurrentPrice,
            Self::Change,
            Self::ChangePercent,
        ]
    }

    /// Wire key of the column.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Name => "name",
            Self::CurrentPrice => "currentPrice",
            Self::Change => "change",
            Self::ChangePercent => "changePercent",
        }
    }

    /// Header label shown to users.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Symbol => "Symbol",
            Self::Name => "Company Name",
            Self::CurrentPrice => "Price",
            Self::Change => "Change",
            Self::ChangePercent => "Chg %",
        }
    }

    /// Look a column up by its wire key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.key() == key)
    }

    /// Accessor for this column's value.
    #[must_use]
    pub const fn accessor(self) -> Accessor {
        match self {
            Self::Symbol => symbol_of,
            Self::Name => name_of,
            Self::CurrentPrice => current_price_of,
            Self::Change => change_of,
            Self::ChangePercent => change_percent_of,
        }
    }
}

fn symbol_of(row: &StockRow) -> SortValue<'_> {
    SortValue::Text(&row.symbol)
}

fn name_of(row: &StockRow) -> SortValue<'_> {
    SortValue::Text(&row.name)
}

const fn current_price_of(row: &StockRow) -> SortValue<'_> {
    SortValue::Number(row.current_price)
}

const fn change_of(row: &StockRow) -> SortValue<'_> {
    SortValue::Number(row.change)
}

const fn change_percent_of(row: &StockRow) -> SortValue<'_> {
    SortValue::Number(row.change_percent)
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// Direction and Descriptor
// =============================================================================

/// Tri-state sort direction of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Not sorted by this column.
    #[default]
    Unsorted,
    /// Descending label.
    Descending,
    /// Ascending label.
    Ascending,
}

impl SortDirection {
    /// Next direction in the cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Unsorted => Self::Descending,
            Self::Descending => Self::Ascending,
            Self::Ascending => Self::Unsorted,
        }
    }

    /// Whether this direction orders rows.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Unsorted)
    }
}

/// The sort selection governing the table order.
///
/// A descriptor with [`SortDirection::Unsorted`] is the "nothing sorted"
/// sentinel; `column` then names the column that was last cycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    /// Column the descriptor refers to.
    pub column: Column,
    /// Direction of that column.
    pub direction: SortDirection,
}

impl SortDescriptor {
    /// Descriptor used at startup: symbol, descending.
    pub const DEFAULT: Self = Self::new(Column::Symbol, SortDirection::Descending);

    /// Create a descriptor.
    #[must_use]
    pub const fn new(column: Column, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Whether the descriptor orders rows.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.direction.is_active()
    }

    /// Compare two rows under this descriptor.
    ///
    /// The `Descending` label orders by `a` against `b` (smallest first) and
    /// `Ascending` by `b` against `a`. Unsorted descriptors treat every pair
    /// as equal so a stable sort keeps the input order.
    #[must_use]
    pub fn compare(&self, a: &StockRow, b: &StockRow) -> Ordering {
        let accessor = self.column.accessor();
        let (a, b) = (accessor(a), accessor(b));
        match self.direction {
            SortDirection::Unsorted => Ordering::Equal,
            SortDirection::Descending => compare_values(a, b),
            SortDirection::Ascending => compare_values(b, a),
        }
    }
}

impl Default for SortDescriptor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn compare_values(a: SortValue<'_>, b: SortValue<'_>) -> Ordering {
    match (a, b) {
        (SortValue::Number(a), SortValue::Number(b)) => compare_numbers(a, b),
        (SortValue::Text(a), SortValue::Text(b)) => locale_cmp(a, b),
        // One accessor per column, so kinds never mix.
        (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
        (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
    }
}

/// Total numeric order: `NaN` equals `NaN` and sorts after every number.
fn compare_numbers(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

// =============================================================================
// Column Headers and Sort State
// =============================================================================

/// A registered column with its current direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    /// The column.
    #[serde(rename = "key")]
    pub column: Column,
    /// Header label.
    pub label: &'static str,
    /// Current direction.
    pub direction: SortDirection,
}

/// Per-column sort directions with at most one active column.
#[derive(Debug, Clone)]
pub struct SortState {
    headers: Vec<ColumnHeader>,
    active: SortDescriptor,
}

impl SortState {
    /// Create the state with `initial` pre-selected.
    ///
    /// An unsorted `initial` leaves every column unsorted.
    #[must_use]
    pub fn new(initial: SortDescriptor) -> Self {
        let headers = Column::all()
            .iter()
            .map(|&column| ColumnHeader {
                column,
                label: column.label(),
                direction: if column == initial.column {
                    initial.direction
                } else {
                    SortDirection::Unsorted
                },
            })
            .collect();

        Self {
            headers,
            active: initial,
        }
    }

    /// Advance `column` one step through the cycle and return the new
    /// descriptor.
    pub fn cycle(&mut self, column: Column) -> SortDescriptor {
        let current = self.direction_of(column);
        let next = current.next();

        for header in &mut self.headers {
            header.direction = if header.column == column {
                next
            } else {
                SortDirection::Unsorted
            };
        }

        self.active = SortDescriptor::new(column, next);
        self.active
    }

    /// The current descriptor.
    #[must_use]
    pub const fn active(&self) -> SortDescriptor {
        self.active
    }

    /// Direction currently assigned to `column`.
    #[must_use]
    pub fn direction_of(&self, column: Column) -> SortDirection {
        self.headers
            .iter()
            .find(|h| h.column == column)
            .map_or(SortDirection::Unsorted, |h| h.direction)
    }

    /// Column headers in display order.
    #[must_use]
    pub fn headers(&self) -> &[ColumnHeader] {
        &self.headers
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(SortDescriptor::DEFAULT)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn row(symbol: &str, change: f64) -> StockRow {
        StockRow {
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp"),
            current_price: 100.0,
            change,
            change_percent: change,
            url: String::new(),
        }
    }

    fn active_count(state: &SortState) -> usize {
        state
            .headers()
            .iter()
            .filter(|h| h.direction.is_active())
            .count()
    }

    #[test_case("symbol", Column::Symbol)]
    #[test_case("name", Column::Name)]
    #[test_case("currentPrice", Column::CurrentPrice)]
    #[test_case("change", Column::Change)]
    #[test_case("changePercent", Column::ChangePercent)]
    fn column_key_round_trips(key: &str, column: Column) {
        assert_eq!(Column::from_key(key), Some(column));
        assert_eq!(column.key(), key);
    }

    #[test]
    fn unknown_column_key() {
        assert_eq!(Column::from_key("volume"), None);
        assert_eq!(Column::from_key("Symbol"), None);
    }

    #[test]
    fn column_labels() {
        let labels: Vec<_> = Column::all().iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            ["Symbol", "Company Name", "Price", "Change", "Chg %"]
        );
    }

    #[test_case(SortDirection::Unsorted, SortDirection::Descending)]
    #[test_case(SortDirection::Descending, SortDirection::Ascending)]
    #[test_case(SortDirection::Ascending, SortDirection::Unsorted)]
    fn direction_cycle(from: SortDirection, to: SortDirection) {
        assert_eq!(from.next(), to);
    }

    #[test]
    fn default_state_sorts_symbol_descending() {
        let state = SortState::default();
        assert_eq!(state.active(), SortDescriptor::DEFAULT);
        assert_eq!(
            state.direction_of(Column::Symbol),
            SortDirection::Descending
        );
        assert_eq!(active_count(&state), 1);
    }

    #[test]
    fn three_cycles_return_to_unsorted() {
        let mut state = SortState::default();
        let x = Column::Change;
        assert_eq!(state.direction_of(x), SortDirection::Unsorted);

        let directions: Vec<_> = (0..3).map(|_| state.cycle(x).direction).collect();
        assert_eq!(
            directions,
            [
                SortDirection::Descending,
                SortDirection::Ascending,
                SortDirection::Unsorted,
            ]
        );
        assert_eq!(active_count(&state), 0);
    }

    #[test]
    fn cycling_another_column_resets_previous() {
        let mut state = SortState::default();
        state.cycle(Column::Name);
        state.cycle(Column::Name);
        assert_eq!(state.direction_of(Column::Name), SortDirection::Ascending);

        let descriptor = state.cycle(Column::CurrentPrice);
        assert_eq!(
            descriptor,
            SortDescriptor::new(Column::CurrentPrice, SortDirection::Descending)
        );
        assert_eq!(state.direction_of(Column::Name), SortDirection::Unsorted);
        assert_eq!(state.direction_of(Column::Symbol), SortDirection::Unsorted);
    }

    #[test]
    fn cycling_default_column_advances_to_ascending() {
        let mut state = SortState::default();
        let descriptor = state.cycle(Column::Symbol);
        assert_eq!(descriptor.direction, SortDirection::Ascending);
    }

    #[test]
    fn descending_label_puts_smaller_numbers_first() {
        let descriptor = SortDescriptor::new(Column::Change, SortDirection::Descending);
        assert_eq!(
            descriptor.compare(&row("A", 1.0), &row("B", 2.0)),
            Ordering::Less
        );
    }

    #[test]
    fn ascending_label_puts_larger_numbers_first() {
        let descriptor = SortDescriptor::new(Column::Change, SortDirection::Ascending);
        assert_eq!(
            descriptor.compare(&row("A", 1.0), &row("B", 2.0)),
            Ordering::Greater
        );
    }

    #[test]
    fn text_columns_use_locale_comparison() {
        let descriptor = SortDescriptor::new(Column::Symbol, SortDirection::Descending);
        assert_eq!(
            descriptor.compare(&row("aaa", 0.0), &row("BBB", 0.0)),
            Ordering::Less
        );
    }

    #[test]
    fn unsorted_compares_equal() {
        let descriptor = SortDescriptor::new(Column::Change, SortDirection::Unsorted);
        assert_eq!(
            descriptor.compare(&row("A", 1.0), &row("B", 2.0)),
            Ordering::Equal
        );
    }

    #[test]
    fn nan_sorts_after_numbers() {
        assert_eq!(compare_numbers(f64::NAN, 1.0), Ordering::Greater);
        assert_eq!(compare_numbers(-f64::NAN, f64::INFINITY), Ordering::Greater);
        assert_eq!(compare_numbers(f64::NAN, -f64::NAN), Ordering::Equal);
        assert_eq!(
            compare_numbers(f64::NEG_INFINITY, -1.0),
            Ordering::Less
        );
    }

    #[test]
    fn descriptor_serializes_wire_keys() {
        let json = serde_json::to_value(SortDescriptor::new(
            Column::ChangePercent,
            SortDirection::Ascending,
        ))
        .unwrap();
        assert_eq!(json["column"], "changePercent");
        assert_eq!(json["direction"], "ascending");
    }

    fn any_column() -> impl Strategy<Value = Column> {
        proptest::sample::select(Column::all().to_vec())
    }

    proptest! {
        #[test]
        fn at_most_one_column_active(ops in proptest::collection::vec(any_column(), 0..64)) {
            let mut state = SortState::default();
            for column in ops {
                let descriptor = state.cycle(column);
                prop_assert!(active_count(&state) <= 1);
                prop_assert_eq!(descriptor, state.active());
                prop_assert_eq!(state.direction_of(column), descriptor.direction);
                if descriptor.is_active() {
                    prop_assert_eq!(active_count(&state), 1);
                }
            }
        }
    }
}
