//! rust_shopper — sequential shopping-basket choice model with Bayesian inference.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and, with the `python-bindings`
//! feature, as the PyO3 bridge that exposes the model to Python through the
//! `_rust_shopper` extension module.
//!
//! Key behaviors
//! -------------
//! - [`data`] reads the trips and prices files, joins them, and builds the
//!   dense indices and basket structure.
//! - [`model`] turns an observation table and hyperparameters into a
//!   re-evaluable joint density over six latent tensors.
//! - [`inference`] fits that density by mean-field ADVI or MCMC (NUTS by
//!   default), on top of the argmin-based [`optimization`] layer.
//! - [`results`] serves summaries, traces, diagnostics and predictions.
//! - [`Shopper`] ties the pipeline together.
//!
//! Invariants & assumptions
//! ------------------------
//! - Rows of one basket are contiguous and in purchase order.
//! - Fits are deterministic for a fixed seed, regardless of the size of the
//!   rayon pool.
//!
//! Conventions
//! -----------
//! - Parameters live in one flat unconstrained vector; the `gamma` and `beta`
//!   blocks are stored on the log scale and reported exponentiated.
//! - Errors stay layer-specific internally and meet in [`ShopperError`].
//!
//! Downstream usage
//! ----------------
//! - Rust callers use [`Shopper`] or the [`prelude`].
//! - The `shopper` binary wraps the same pipeline for the command line.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; `tests/` runs the pipeline end to
//!   end from TSV files.

pub mod data;
pub mod errors;
pub mod inference;
pub mod model;
pub mod optimization;
pub mod results;
pub mod shopper;

#[cfg(feature = "python-bindings")]
pub mod python;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{ShopperError, ShopperResult};
pub use self::shopper::Shopper;

pub mod prelude {
    pub use crate::data::prelude::*;
    pub use crate::errors::{ShopperError, ShopperResult};
    pub use crate::inference::prelude::*;
    pub use crate::model::prelude::*;
    pub use crate::results::prelude::*;
    pub use crate::shopper::Shopper;
}

#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

/// `_rust_shopper` — Python extension module initializer.
///
/// Registers the [`python::PyShopper`] class (exposed as `Shopper`). Invoked
/// by Python when the compiled extension is imported.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_shopper<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyShopper>()?;
    Ok(())
}
