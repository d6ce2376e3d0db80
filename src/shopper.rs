//! Shopper — build, fit, inspect.
//!
//! Purpose
//! -------
//! One entry point over the whole pipeline: an observation table (or the two
//! TSV files behind it) and a [`ShopperConfig`] become a [`ShopperModel`],
//! and [`Shopper::fit`] turns that model into [`ShopperResults`].
//!
//! Key behaviors
//! -------------
//! - The model is built once and shared (`Arc`) with every result it
//!   produces; refitting with other options reuses it.
//! - Fits start from the model's prior-mean initial point.
//!
//! Downstream usage
//! ----------------
//! - The CLI and the Python module are thin wrappers around this type.
use std::{path::Path, sync::Arc};

use crate::{
    data::{ObservationTable, load_data},
    errors::ShopperResult,
    inference::{FitOptions, fit},
    model::{ShopperConfig, ShopperModel},
    results::ShopperResults,
};

#[derive(Debug, Clone)]
pub struct Shopper {
    table: ObservationTable,
    model: Arc<ShopperModel>,
}

impl Shopper {
    /// Build the model over `table`.
    ///
    /// # Errors
    /// - `Data` if baskets are not contiguous.
    /// - `Dimension` for invalid hyperparameters or count mismatches.
    pub fn new(table: ObservationTable, config: ShopperConfig) -> ShopperResult<Shopper> {
        let model = Arc::new(ShopperModel::build(&table, config)?);
        Ok(Shopper { table, model })
    }

    /// Load and join the trips and prices files, then build the model.
    pub fn from_files(
        trips: impl AsRef<Path>, prices: impl AsRef<Path>, config: ShopperConfig,
    ) -> ShopperResult<Shopper> {
        Shopper::new(load_data(trips, prices)?, config)
    }

    pub fn table(&self) -> &ObservationTable {
        &self.table
    }

    pub fn model(&self) -> &ShopperModel {
        &self.model
    }

    /// Run the inference method selected in `opts`.
    ///
    /// # Errors
    /// `Convergence` for invalid options or numerical instability; a failed
    /// fit produces no results.
    pub fn fit(&self, opts: &FitOptions) -> ShopperResult<ShopperResults> {
        let posterior = fit(self.model.as_ref(), &self.model.initial_point(), opts)?;
        Ok(ShopperResults::new(Arc::clone(&self.model), posterior, opts.seed)?)
    }
}
