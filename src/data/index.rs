//! Index Builder — dense identifiers, basket positions, and basket segments.
//!
//! Purpose
//! -------
//! Turn an [`ObservationTable`] into the integer structure the model needs:
//! dense user and item indices per row, the ordinal position of each row
//! inside its `(user_id, session_id)` basket, the basket-position scaling
//! factor, and the row range of every basket.
//!
//! Key behaviors
//! -------------
//! - [`IndexMapping::fit`] builds a bijection from raw identifiers to
//!   `0..n`, ordered by the sorted unique raw values.
//! - [`BasketIndex::build`] fits fresh user/item/session mappings;
//!   [`BasketIndex::with_mappings`] re-uses mappings from an existing model
//!   and fails on identifiers those mappings have never seen.
//! - Ordinal positions count same-basket rows strictly preceding a row; the
//!   scaling factor is `1 / ordinal` for `ordinal > 0` and `0` otherwise.
//!
//! Invariants & assumptions
//! ------------------------
//! - Baskets must be contiguous in row order. A basket that resumes after a
//!   different basket is rejected with [`DataError::NonContiguousBasket`];
//!   callers holding interleaved data sort first with
//!   [`ObservationTable::sorted_by_basket`].
//! - Segments partition `0..n_rows` in ascending order; the first row of each
//!   segment has ordinal 0.
//!
//! Conventions
//! -----------
//! - All indices are `usize` and 0-based.
//! - No randomness: the result depends only on the row order and the raw
//!   identifier values.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the two-basket `[A,B,C]` / `[B]` scenario, mapping
//!   round-trips, and rejection of unknown identifiers.
//! - A `proptest` property checks ordinal sequences and scaling factors over
//!   random basket layouts.
use std::{
    collections::{BTreeSet, HashMap},
    ops::Range,
};

use crate::data::{
    errors::{DataError, DataResult},
    observations::ObservationTable,
};

/// Bijection between raw identifiers and a dense range `0..len`.
///
/// Dense indices follow the lexicographic order of the raw values, so two
/// mappings fitted on the same set of identifiers are identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMapping {
    classes: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl IndexMapping {
    /// Fit a mapping from the sorted unique values of `values`.
    pub fn fit<'a, I>(values: I) -> IndexMapping
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<&str> = values.into_iter().collect();
        let classes: Vec<String> = unique.into_iter().map(str::to_string).collect();
        IndexMapping::from_classes(classes)
    }

    fn from_classes(classes: Vec<String>) -> IndexMapping {
        let lookup = classes.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect();
        IndexMapping { classes, lookup }
    }

    /// Dense index of `value`, if the mapping knows it.
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.lookup.get(value).copied()
    }

    /// Dense index of `value`, failing on identifiers outside the mapping.
    ///
    /// # Errors
    /// [`DataError::UnknownIdentifier`] tagged with `column`.
    pub fn encode_existing(&self, value: &str, column: &'static str) -> DataResult<usize> {
        self.encode(value)
            .ok_or_else(|| DataError::UnknownIdentifier { column, value: value.to_string() })
    }

    /// Raw identifier of a dense index.
    ///
    /// # Errors
    /// [`DataError::IndexOutOfRange`] if `index >= self.len()`.
    pub fn decode(&self, index: usize) -> DataResult<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(DataError::IndexOutOfRange { index, len: self.classes.len() })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Per-row integer structure of an observation table.
///
/// Fields
/// ------
/// - `users`, `items`, `sessions`: dense indices per row.
/// - `ordinal`: 0-based position of the row inside its basket.
/// - `scaling`: `1 / ordinal` for `ordinal > 0`, else `0.0`.
/// - `segments`: row range of each basket, in row order.
/// - `user_map`, `item_map`, `session_map`: mappings used for the encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct BasketIndex {
    users: Vec<usize>,
    items: Vec<usize>,
    sessions: Vec<usize>,
    ordinal: Vec<usize>,
    scaling: Vec<f64>,
    segments: Vec<Range<usize>>,
    user_map: IndexMapping,
    item_map: IndexMapping,
    session_map: IndexMapping,
}

impl BasketIndex {
    /// Fit fresh mappings on `table` and derive the basket structure.
    ///
    /// # Errors
    /// [`DataError::NonContiguousBasket`] if a basket is split across
    /// non-adjacent rows.
    pub fn build(table: &ObservationTable) -> DataResult<BasketIndex> {
        let rows = table.rows();
        let user_map = IndexMapping::fit(rows.iter().map(|r| r.user_id.as_str()));
        let item_map = IndexMapping::fit(rows.iter().map(|r| r.item_id.as_str()));
        let session_map = IndexMapping::fit(rows.iter().map(|r| r.session_id.as_str()));
        BasketIndex::with_mappings(table, user_map, item_map, Some(session_map))
    }

    /// Encode `table` through existing user/item mappings.
    ///
    /// Sessions are always allowed to be new; when `session_map` is `None` a
    /// mapping is fitted on `table`.
    ///
    /// # Errors
    /// - [`DataError::UnknownIdentifier`] for a user or item outside the
    ///   supplied mappings.
    /// - [`DataError::NonContiguousBasket`] as for [`BasketIndex::build`].
    pub fn with_mappings(
        table: &ObservationTable, user_map: IndexMapping, item_map: IndexMapping,
        session_map: Option<IndexMapping>,
    ) -> DataResult<BasketIndex> {
        table.check_contiguous()?;
        let rows = table.rows();
        let session_map = match session_map {
            Some(m) => m,
            None => IndexMapping::fit(rows.iter().map(|r| r.session_id.as_str())),
        };

        let n = rows.len();
        let mut users = Vec::with_capacity(n);
        let mut items = Vec::with_capacity(n);
        let mut sessions = Vec::with_capacity(n);
        let mut ordinal = Vec::with_capacity(n);
        let mut scaling = Vec::with_capacity(n);
        let mut segments: Vec<Range<usize>> = Vec::new();

        let mut start = 0usize;
        for (i, row) in rows.iter().enumerate() {
            users.push(user_map.encode_existing(&row.user_id, "user_id")?);
            items.push(item_map.encode_existing(&row.item_id, "item_id")?);
            sessions.push(session_map.encode_existing(&row.session_id, "session_id")?);

            if i > 0 && rows[i - 1].basket_key() != row.basket_key() {
                segments.push(start..i);
                start = i;
            }
            let pos = i - start;
            ordinal.push(pos);
            scaling.push(if pos > 0 { 1.0 / pos as f64 } else { 0.0 });
        }
        if n > 0 {
            segments.push(start..n);
        }

        Ok(BasketIndex {
            users,
            items,
            sessions,
            ordinal,
            scaling,
            segments,
            user_map,
            item_map,
            session_map,
        })
    }

    pub fn users(&self) -> &[usize] {
        &self.users
    }

    pub fn items(&self) -> &[usize] {
        &self.items
    }

    pub fn sessions(&self) -> &[usize] {
        &self.sessions
    }

    pub fn ordinal(&self) -> &[usize] {
        &self.ordinal
    }

    pub fn scaling(&self) -> &[f64] {
        &self.scaling
    }

    pub fn segments(&self) -> &[Range<usize>] {
        &self.segments
    }

    pub fn user_map(&self) -> &IndexMapping {
        &self.user_map
    }

    pub fn item_map(&self) -> &IndexMapping {
        &self.item_map
    }

    pub fn session_map(&self) -> &IndexMapping {
        &self.session_map
    }

    pub fn n_rows(&self) -> usize {
        self.items.len()
    }

    /// Number of distinct users (`U`).
    pub fn n_users(&self) -> usize {
        self.user_map.len()
    }

    /// Number of distinct items (`C`).
    pub fn n_items(&self) -> usize {
        self.item_map.len()
    }

    pub fn n_sessions(&self) -> usize {
        self.session_map.len()
    }

    pub fn n_baskets(&self) -> usize {
        self.segments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::observations::TripLine;
    use proptest::prelude::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Ordinal positions, scaling factors, and segments on a fixed scenario.
    // - Mapping round-trips and strict re-encoding.
    // - Ordinal/scaling invariants over random contiguous basket layouts.
    // -------------------------------------------------------------------------

    fn scenario() -> ObservationTable {
        ObservationTable::new(vec![
            TripLine::new("u1", "A", "s1", 1.0, 1.0),
            TripLine::new("u1", "B", "s1", 1.0, 2.0),
            TripLine::new("u1", "C", "s1", 1.0, 3.0),
            TripLine::new("u2", "B", "s2", 1.0, 2.5),
        ])
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Check the two-user scenario from end to end at the index level.
    //
    // Given
    // -----
    // - Baskets `[A, B, C]` for u1 and `[B]` for u2.
    //
    // Expect
    // ------
    // - Ordinals `[0, 1, 2, 0]`, scaling `[0, 1, 0.5, 0]`.
    // - Segments `0..3` and `3..4`; U = 2, C = 3.
    fn two_basket_scenario_has_expected_positions() {
        let index = BasketIndex::build(&scenario()).unwrap();

        assert_eq!(index.ordinal(), &[0, 1, 2, 0]);
        assert_eq!(index.scaling(), &[0.0, 1.0, 0.5, 0.0]);
        assert_eq!(index.segments(), &[0..3, 3..4]);
        assert_eq!(index.items(), &[0, 1, 2, 1]);
        assert_eq!((index.n_users(), index.n_items()), (2, 3));
    }

    #[test]
    // Purpose
    // -------
    // Decoding a dense index returns the raw identifier it came from.
    //
    // Given
    // -----
    // - A mapping fitted on unsorted identifiers with duplicates.
    //
    // Expect
    // ------
    // - `decode(encode(x)) == x` for every input; out-of-range decode fails.
    fn mapping_round_trips_and_rejects_out_of_range() {
        let raw = ["z", "a", "m", "a", "z"];
        let mapping = IndexMapping::fit(raw.iter().copied());

        assert_eq!(mapping.len(), 3);
        for value in raw {
            let idx = mapping.encode(value).unwrap();
            assert_eq!(mapping.decode(idx).unwrap(), value);
        }
        assert_eq!(mapping.decode(3).unwrap_err(), DataError::IndexOutOfRange { index: 3, len: 3 });
    }

    #[test]
    // Purpose
    // -------
    // Encoding a table through a different model's mappings must not
    // silently invent indices.
    //
    // Given
    // -----
    // - Mappings fitted on the scenario; a new table with unseen item "D".
    //
    // Expect
    // ------
    // - `UnknownIdentifier { column: "item_id", value: "D" }`.
    fn with_mappings_rejects_unseen_items() {
        let index = BasketIndex::build(&scenario()).unwrap();
        let fresh =
            ObservationTable::new(vec![TripLine::new("u1", "D", "s9", 1.0, 1.0)]).unwrap();

        let err = BasketIndex::with_mappings(
            &fresh,
            index.user_map().clone(),
            index.item_map().clone(),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DataError::UnknownIdentifier { column: "item_id", value: "D".to_string() }
        );
    }

    #[test]
    // Purpose
    // -------
    // Interleaved baskets are rejected instead of miscounted.
    //
    // Given
    // -----
    // - Rows (u1,s1), (u2,s1), (u1,s1).
    //
    // Expect
    // ------
    // - `NonContiguousBasket` from `build`.
    fn build_rejects_interleaved_baskets() {
        let table = ObservationTable::new(vec![
            TripLine::new("u1", "A", "s1", 1.0, 1.0),
            TripLine::new("u2", "A", "s1", 1.0, 1.0),
            TripLine::new("u1", "B", "s1", 1.0, 1.0),
        ])
        .unwrap();
        assert!(matches!(
            BasketIndex::build(&table),
            Err(DataError::NonContiguousBasket { row: 2, .. })
        ));
    }

    proptest! {
        #[test]
        // Purpose
        // -------
        // For any contiguous layout, each basket of size n has ordinals
        // 0..n and scaling 1/ordinal (0 for the first item).
        //
        // Given
        // -----
        // - 1..12 baskets of 1..6 items each, distinct (user, session) keys.
        //
        // Expect
        // ------
        // - Segments match the generated sizes and ordinals restart at 0.
        fn ordinals_restart_per_basket(sizes in prop::collection::vec(1usize..6, 1..12)) {
            let mut rows = Vec::new();
            for (b, &size) in sizes.iter().enumerate() {
                for j in 0..size {
                    rows.push(TripLine::new(
                        format!("u{}", b % 3),
                        format!("i{j}"),
                        format!("s{b}"),
                        1.0,
                        1.0,
                    ));
                }
            }
            let table = ObservationTable::new(rows).unwrap();
            let index = BasketIndex::build(&table).unwrap();

            prop_assert_eq!(index.n_baskets(), sizes.len());
            for (segment, &size) in index.segments().iter().zip(&sizes) {
                prop_assert_eq!(segment.len(), size);
                for (pos, row) in segment.clone().enumerate() {
                    prop_assert_eq!(index.ordinal()[row], pos);
                    let expected = if pos > 0 { 1.0 / pos as f64 } else { 0.0 };
                    prop_assert_eq!(index.scaling()[row], expected);
                }
            }
        }
    }
}
