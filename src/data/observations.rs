//! Observation table — validated trip lines grouped into ordered baskets.
//!
//! Purpose
//! -------
//! Hold the joined trips/prices table that every other layer consumes. One
//! row is a single purchased item: `(user_id, item_id, session_id, quantity,
//! price)`. Rows sharing `(user_id, session_id)` form a basket whose internal
//! order is the row order.
//!
//! Key behaviors
//! -------------
//! - [`ObservationTable::new`] validates every row once (non-empty
//!   identifiers, finite quantity, finite and strictly positive price).
//! - [`ObservationTable::check_contiguous`] verifies that every basket
//!   occupies one contiguous run of rows.
//! - [`ObservationTable::sorted_by_basket`] produces the explicit pre-sort on
//!   `(user_id, session_id, original index)` for inputs whose baskets are
//!   interleaved.
//!
//! Invariants & assumptions
//! ------------------------
//! - The table is immutable after construction; accessors hand out shared
//!   slices only.
//! - Row order is meaningful: it defines the ordinal position of each item
//!   inside its basket.
//!
//! Conventions
//! -----------
//! - Identifiers are kept as raw strings; dense integer encoding is the job
//!   of [`crate::data::index`].
//! - Row indices are 0-based.
use std::collections::HashSet;

use crate::data::errors::{DataError, DataResult};
use ndarray::Array1;

/// One purchased item in one shopping trip, with its session price.
#[derive(Debug, Clone, PartialEq)]
pub struct TripLine {
    pub user_id: String,
    pub item_id: String,
    pub session_id: String,
    pub quantity: f64,
    pub price: f64,
}

impl TripLine {
    pub fn new(
        user_id: impl Into<String>, item_id: impl Into<String>, session_id: impl Into<String>,
        quantity: f64, price: f64,
    ) -> TripLine {
        TripLine {
            user_id: user_id.into(),
            item_id: item_id.into(),
            session_id: session_id.into(),
            quantity,
            price,
        }
    }

    /// Basket key `(user_id, session_id)`.
    pub fn basket_key(&self) -> (&str, &str) {
        (self.user_id.as_str(), self.session_id.as_str())
    }
}

/// `ObservationTable` — validated, immutable table of trip lines.
///
/// Invariants
/// ----------
/// - At least one row.
/// - Every identifier is non-empty.
/// - Every quantity is finite; every price is finite and `> 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    rows: Vec<TripLine>,
}

impl ObservationTable {
    /// Validate `rows` and wrap them in a table.
    ///
    /// # Errors
    /// - [`DataError::EmptyTable`] if `rows` is empty.
    /// - [`DataError::EmptyIdentifier`] for an empty user, item, or session id.
    /// - [`DataError::InvalidQuantity`] / [`DataError::InvalidPrice`] for the
    ///   first offending numeric value.
    pub fn new(rows: Vec<TripLine>) -> DataResult<ObservationTable> {
        if rows.is_empty() {
            return Err(DataError::EmptyTable);
        }
        for (row, line) in rows.iter().enumerate() {
            if line.user_id.is_empty() {
                return Err(DataError::EmptyIdentifier { row, column: "user_id" });
            }
            if line.item_id.is_empty() {
                return Err(DataError::EmptyIdentifier { row, column: "item_id" });
            }
            if line.session_id.is_empty() {
                return Err(DataError::EmptyIdentifier { row, column: "session_id" });
            }
            if !line.quantity.is_finite() {
                return Err(DataError::InvalidQuantity { row, value: line.quantity });
            }
            if !line.price.is_finite() || line.price <= 0.0 {
                return Err(DataError::InvalidPrice { row, value: line.price });
            }
        }
        Ok(ObservationTable { rows })
    }

    pub fn rows(&self) -> &[TripLine] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Natural log of every row's price, in row order.
    pub fn log_prices(&self) -> Array1<f64> {
        self.rows.iter().map(|r| r.price.ln()).collect()
    }

    /// Verify that each `(user_id, session_id)` basket is one contiguous run.
    ///
    /// # Errors
    /// Returns [`DataError::NonContiguousBasket`] at the first row where an
    /// already-closed basket reappears.
    pub fn check_contiguous(&self) -> DataResult<()> {
        let mut closed: HashSet<(&str, &str)> = HashSet::new();
        let mut current: Option<(&str, &str)> = None;
        for (row, line) in self.rows.iter().enumerate() {
            let key = line.basket_key();
            if current == Some(key) {
                continue;
            }
            if closed.contains(&key) {
                return Err(DataError::NonContiguousBasket {
                    user_id: line.user_id.clone(),
                    session_id: line.session_id.clone(),
                    row,
                });
            }
            if let Some(prev) = current {
                closed.insert(prev);
            }
            current = Some(key);
        }
        Ok(())
    }

    /// Stable re-order of the rows by `(user_id, session_id, original index)`.
    ///
    /// Items keep their relative order inside each basket, so ordinal
    /// positions are unchanged for tables that were already contiguous.
    pub fn sorted_by_basket(&self) -> ObservationTable {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a.basket_key().cmp(&b.basket_key()));
        ObservationTable { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Row validation in `ObservationTable::new`.
    // - Basket contiguity detection and the explicit pre-sort.
    // -------------------------------------------------------------------------

    fn line(user: &str, item: &str, session: &str) -> TripLine {
        TripLine::new(user, item, session, 1.0, 2.0)
    }

    #[test]
    // Purpose
    // -------
    // Reject an empty table and invalid prices.
    //
    // Given
    // -----
    // - No rows; then a row with price 0.
    //
    // Expect
    // ------
    // - `EmptyTable`, then `InvalidPrice { row: 1, .. }`.
    fn new_rejects_empty_table_and_non_positive_price() {
        assert_eq!(ObservationTable::new(vec![]).unwrap_err(), DataError::EmptyTable);

        let mut bad = line("u", "b", "s");
        bad.price = 0.0;
        let err = ObservationTable::new(vec![line("u", "a", "s"), bad]).unwrap_err();
        assert_eq!(err, DataError::InvalidPrice { row: 1, value: 0.0 });
    }

    #[test]
    // Purpose
    // -------
    // Detect an interleaved basket and fix it with the explicit pre-sort.
    //
    // Given
    // -----
    // - Rows: (u1,s1), (u2,s1), (u1,s1) — basket (u1,s1) resumes at row 2.
    //
    // Expect
    // ------
    // - `check_contiguous` fails at row 2.
    // - After `sorted_by_basket`, the check passes and u1's items keep their
    //   relative order (A before C).
    fn interleaved_basket_is_detected_and_sorted() {
        let table = ObservationTable::new(vec![
            line("u1", "A", "s1"),
            line("u2", "B", "s1"),
            line("u1", "C", "s1"),
        ])
        .unwrap();

        match table.check_contiguous() {
            Err(DataError::NonContiguousBasket { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected NonContiguousBasket, got {other:?}"),
        }

        let sorted = table.sorted_by_basket();
        assert!(sorted.check_contiguous().is_ok());
        let items: Vec<&str> = sorted.rows().iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(items, vec!["A", "C", "B"]);
    }
}
