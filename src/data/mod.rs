//! data — trip tables, loaders, and the Index Builder.
//!
//! Purpose
//! -------
//! Own everything that happens before a model exists: reading the trips and
//! prices files, joining them into a validated [`ObservationTable`], and
//! deriving the dense indices and basket structure consumed by
//! [`crate::model`].
//!
//! Key behaviors
//! -------------
//! - [`loader`] reads header-less TSV inputs and performs the inner join on
//!   `(item_id, session_id)`.
//! - [`observations`] validates rows and checks basket contiguity.
//! - [`index`] produces [`BasketIndex`] (users, items, ordinal positions,
//!   scaling factors, basket segments) and the [`IndexMapping`]s behind it.
//!
//! Conventions
//! -----------
//! - All fallible operations return [`DataResult<T>`]; errors carry file
//!   paths, line numbers, or row indices where they exist.
//!
//! Downstream usage
//! ----------------
//! - The model layer takes an `ObservationTable` and builds its own
//!   `BasketIndex`; prediction re-encodes new tables through the model's
//!   mappings via [`BasketIndex::with_mappings`].

pub mod errors;
pub mod index;
pub mod loader;
pub mod observations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{DataError, DataResult};
pub use self::index::{BasketIndex, IndexMapping};
pub use self::loader::{join, load_data, load_prices, load_trips, PriceRecord, TripRecord};
pub use self::observations::{ObservationTable, TripLine};

pub mod prelude {
    pub use super::errors::{DataError, DataResult};
    pub use super::index::{BasketIndex, IndexMapping};
    pub use super::loader::load_data;
    pub use super::observations::{ObservationTable, TripLine};
}
