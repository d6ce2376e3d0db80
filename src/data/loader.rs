//! Trips / prices readers and the inner join that yields an observation table.
//!
//! Purpose
//! -------
//! Read the two header-less, tab-separated inputs and join them into an
//! [`ObservationTable`]:
//! - trips: `user_id, item_id, session_id, quantity`
//! - prices: `item_id, session_id, price`
//!
//! Key behaviors
//! -------------
//! - Column counts and numeric columns are checked record by record; errors
//!   name the file, the 1-based line, and the 0-based column.
//! - [`join`] is an inner join on `(item_id, session_id)` that keeps the trip
//!   order. Trips without a matching price are dropped; for duplicated price
//!   keys the first occurrence wins.
//!
//! Conventions
//! -----------
//! - Identifiers are taken verbatim (whitespace-trimmed) as strings.
//! - Readers are generic over `std::io::Read` so tests can feed in-memory
//!   buffers; the `load_*` helpers open files.
use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use crate::data::{
    errors::{DataError, DataResult},
    observations::{ObservationTable, TripLine},
};
use tracing::{debug, info};

const TRIP_COLUMNS: usize = 4;
const PRICE_COLUMNS: usize = 3;

/// One line of the trips file.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub user_id: String,
    pub item_id: String,
    pub session_id: String,
    pub quantity: f64,
}

/// One line of the prices file.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub item_id: String,
    pub session_id: String,
    pub price: f64,
}

/// Parse trip records from any reader; `path` is used for error messages only.
pub fn read_trips<R: Read>(reader: R, path: &Path) -> DataResult<Vec<TripRecord>> {
    read_records(reader, path, TRIP_COLUMNS, |fields, line| {
        Ok(TripRecord {
            user_id: fields[0].to_string(),
            item_id: fields[1].to_string(),
            session_id: fields[2].to_string(),
            quantity: parse_number(fields[3], path, line, 3)?,
        })
    })
}

/// Parse price records from any reader; `path` is used for error messages only.
pub fn read_prices<R: Read>(reader: R, path: &Path) -> DataResult<Vec<PriceRecord>> {
    read_records(reader, path, PRICE_COLUMNS, |fields, line| {
        Ok(PriceRecord {
            item_id: fields[0].to_string(),
            session_id: fields[1].to_string(),
            price: parse_number(fields[2], path, line, 2)?,
        })
    })
}

pub fn load_trips(path: impl AsRef<Path>) -> DataResult<Vec<TripRecord>> {
    let path = path.as_ref();
    read_trips(open(path)?, path)
}

pub fn load_prices(path: impl AsRef<Path>) -> DataResult<Vec<PriceRecord>> {
    let path = path.as_ref();
    read_prices(open(path)?, path)
}

/// Inner join of trips and prices on `(item_id, session_id)`, in trip order.
///
/// # Errors
/// - [`DataError::EmptyTable`] if no trip has a matching price.
/// - Any row-validation error from [`ObservationTable::new`].
pub fn join(trips: &[TripRecord], prices: &[PriceRecord]) -> DataResult<ObservationTable> {
    let mut lookup: HashMap<(&str, &str), f64> = HashMap::with_capacity(prices.len());
    for p in prices {
        lookup.entry((p.item_id.as_str(), p.session_id.as_str())).or_insert(p.price);
    }
    let rows: Vec<TripLine> = trips
        .iter()
        .filter_map(|t| {
            lookup.get(&(t.item_id.as_str(), t.session_id.as_str())).map(|&price| {
                TripLine::new(&t.user_id, &t.item_id, &t.session_id, t.quantity, price)
            })
        })
        .collect();
    debug!(trips = trips.len(), joined = rows.len(), "joined trips with prices");
    ObservationTable::new(rows)
}

/// Read both files and join them.
pub fn load_data(
    trips_path: impl AsRef<Path>, prices_path: impl AsRef<Path>,
) -> DataResult<ObservationTable> {
    let trips = load_trips(trips_path)?;
    let prices = load_prices(prices_path)?;
    let table = join(&trips, &prices)?;
    info!(rows = table.len(), dropped = trips.len() - table.len(), "loaded observation table");
    Ok(table)
}

// ---- Helper Methods ----

fn open(path: &Path) -> DataResult<File> {
    File::open(path).map_err(|e| DataError::Io { path: path.to_path_buf(), reason: e.to_string() })
}

fn read_records<R, T, F>(reader: R, path: &Path, columns: usize, mut build: F) -> DataResult<Vec<T>>
where
    R: Read,
    F: FnMut(&[&str], u64) -> DataResult<T>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut out = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|e| io_error(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != columns {
            return Err(DataError::ColumnCount {
                path: path.to_path_buf(),
                line,
                expected: columns,
                found: record.len(),
            });
        }
        let fields: Vec<&str> = record.iter().collect();
        out.push(build(&fields, line)?);
    }
    Ok(out)
}

fn parse_number(raw: &str, path: &Path, line: u64, column: usize) -> DataResult<f64> {
    raw.parse::<f64>().map_err(|_| DataError::Unparsable {
        path: path.to_path_buf(),
        line,
        column,
        value: raw.to_string(),
    })
}

fn io_error(path: &Path, err: csv::Error) -> DataError {
    DataError::Io { path: PathBuf::from(path), reason: err.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trips_fixture() -> Vec<TripRecord> {
        read_trips("1\tA\t10\t1\n1\tB\t10\t2\n2\tC\t11\t1\n".as_bytes(), Path::new("trips.tsv"))
            .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Verify the inner-join semantics: matching rows carry the right price,
    // unmatched trips disappear, and trip order is preserved.
    //
    // Given
    // -----
    // - Trips A@10, B@10, C@11; prices for (A,10) and (C,11) only, plus an
    //   unrelated (B,11).
    //
    // Expect
    // ------
    // - Two rows: A with price 1.5, C with price 3.0, in that order.
    fn join_keeps_matching_rows_with_their_price() {
        let prices = read_prices(
            "A\t10\t1.5\nB\t11\t9.0\nC\t11\t3.0\n".as_bytes(),
            Path::new("prices.tsv"),
        )
        .unwrap();

        let table = join(&trips_fixture(), &prices).unwrap();

        let got: Vec<(&str, f64)> =
            table.rows().iter().map(|r| (r.item_id.as_str(), r.price)).collect();
        assert_eq!(got, vec![("A", 1.5), ("C", 3.0)]);
    }

    #[test]
    // Purpose
    // -------
    // Surface malformed input as `DataError` with location details.
    //
    // Given
    // -----
    // - A trips record with three columns; a prices record with a
    //   non-numeric price.
    //
    // Expect
    // ------
    // - `ColumnCount { line: 1, expected: 4, found: 3 }`.
    // - `Unparsable { column: 2, value: "abc" }`.
    fn malformed_records_are_reported() {
        let err = read_trips("1\tA\t10\n".as_bytes(), Path::new("t.tsv")).unwrap_err();
        match err {
            DataError::ColumnCount { line, expected, found, .. } => {
                assert_eq!((line, expected, found), (1, 4, 3));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = read_prices("A\t10\tabc\n".as_bytes(), Path::new("p.tsv")).unwrap_err();
        match err {
            DataError::Unparsable { column, value, .. } => {
                assert_eq!(column, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // A join with no matches yields no table rather than an empty one.
    //
    // Given
    // -----
    // - Trips fixture and a prices list that matches nothing.
    //
    // Expect
    // ------
    // - `DataError::EmptyTable`.
    fn join_without_matches_is_an_error() {
        let prices = vec![PriceRecord {
            item_id: "Z".to_string(),
            session_id: "99".to_string(),
            price: 1.0,
        }];
        assert_eq!(join(&trips_fixture(), &prices).unwrap_err(), DataError::EmptyTable);
    }
}
