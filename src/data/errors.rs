//! Errors for trip data loading, joining, and index construction.
//!
//! This module defines [`DataError`], the error type for everything that
//! happens before a model exists: reading the trips and prices files,
//! validating individual columns, joining the two tables, and deriving dense
//! indices and basket positions.
//!
//! ## Conventions
//! - **Line numbers are 1-based** (they point into a text file); row indices
//!   into an [`ObservationTable`](crate::data::ObservationTable) are 0-based.
//! - Column indices are 0-based and refer to the tab-separated layout of the
//!   file being read.
use std::path::PathBuf;

/// Result alias for data-layer operations that may produce [`DataError`].
pub type DataResult<T> = Result<T, DataError>;

/// Unified error type for the data layer.
///
/// Covers I/O and CSV failures, malformed columns, empty inputs, basket
/// contiguity violations, and unknown identifiers when encoding through an
/// existing mapping.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    // ---- Files ----
    /// The file could not be opened or read.
    #[error("Could not read {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// A record had the wrong number of columns.
    #[error("{path:?} line {line}: expected {expected} tab-separated columns, found {found}")]
    ColumnCount { path: PathBuf, line: u64, expected: usize, found: usize },

    /// A numeric column could not be parsed.
    #[error("{path:?} line {line}, column {column}: cannot parse '{value}' as a number")]
    Unparsable { path: PathBuf, line: u64, column: usize, value: String },

    // ---- Column values ----
    /// Quantity must be finite.
    #[error("Row {row}: quantity must be finite; got {value}")]
    InvalidQuantity { row: usize, value: f64 },

    /// Price must be finite and strictly positive (log-price is taken).
    #[error("Row {row}: price must be finite and > 0; got {value}")]
    InvalidPrice { row: usize, value: f64 },

    /// An identifier column was empty.
    #[error("Row {row}: identifier column '{column}' is empty")]
    EmptyIdentifier { row: usize, column: &'static str },

    // ---- Tables ----
    /// The observation table has no rows (e.g. every trip lacked a price).
    #[error("Observation table is empty.")]
    EmptyTable,

    /// Column vectors of an observation table have different lengths.
    #[error("Column '{column}' has length {found}, expected {expected}")]
    ColumnLengthMismatch { column: &'static str, expected: usize, found: usize },

    // ---- Baskets ----
    /// Rows of one (user, session) basket are interleaved with another basket.
    #[error(
        "Basket (user '{user_id}', session '{session_id}') is not contiguous: \
         it resumes at row {row} after a different basket"
    )]
    NonContiguousBasket { user_id: String, session_id: String, row: usize },

    // ---- Encoding ----
    /// Identifier not present in the mapping it is being encoded through.
    #[error("Identifier '{value}' in column '{column}' is not part of the fitted mapping")]
    UnknownIdentifier { column: &'static str, value: String },

    /// Dense index outside the mapping's range.
    #[error("Dense index {index} out of range for mapping of size {len}")]
    IndexOutOfRange { index: usize, len: usize },
}
