//! PyO3 wrappers — the `_rust_shopper` classes.
//!
//! Purpose
//! -------
//! Expose [`Shopper`] to Python with the original keyword interface while
//! keeping all numerical work in the Rust core.
//!
//! Conventions
//! -----------
//! - String selectors (`method`, `diff`, `step`) parse case-insensitively.
//! - Every error surfaces as `ValueError` with the Rust message.
use std::str::FromStr;

use numpy::{PyArray2, ToPyArray};
use pyo3::{prelude::*, types::PyDict};

use crate::{
    data::load_data,
    errors::ShopperError,
    inference::{ConvergenceDiff, FitMethod, FitOptions, StepMethod},
    model::ShopperConfig,
    results::ShopperResults,
    shopper::Shopper,
};

/// Shopper — Python-facing wrapper for the sequential basket choice model.
///
/// Parameters
/// ----------
/// Constructed from Python via `Shopper(trips_path, prices_path, K=50, ...)`:
/// - `trips_path`, `prices_path`: `str`
///   Header-less TSV files as read by the Rust loader.
/// - `K`, `price_dim`: `usize`
///   Latent sizes.
/// - `rho_var`, `alpha_var`, `theta_var`, `lambda_var`: `f64`
///   Prior variances of the Normal blocks.
/// - `gamma_shape`, `gamma_rate`, `beta_shape`, `beta_rate`: `f64`
///   Gamma prior parameters of the price blocks.
///
/// Fields
/// ------
/// - `inner`: [`Shopper`]
/// - `results`: results of the last successful `fit`, if any.
#[pyclass(name = "Shopper", module = "rust_shopper")]
pub struct PyShopper {
    inner: Shopper,
    results: Option<ShopperResults>,
}

#[pymethods]
impl PyShopper {
    #[new]
    #[pyo3(signature = (
        trips_path, prices_path, K = 50, price_dim = 10, rho_var = 1.0, alpha_var = 1.0,
        theta_var = 1.0, lambda_var = 1.0, gamma_shape = 100.0, gamma_rate = 1000.0,
        beta_shape = 100.0, beta_rate = 1000.0
    ))]
    #[allow(non_snake_case, clippy::too_many_arguments)]
    pub fn new(
        trips_path: &str, prices_path: &str, K: usize, price_dim: usize, rho_var: f64,
        alpha_var: f64, theta_var: f64, lambda_var: f64, gamma_shape: f64, gamma_rate: f64,
        beta_shape: f64, beta_rate: f64,
    ) -> PyResult<PyShopper> {
        let config = ShopperConfig {
            k: K,
            price_dim,
            rho_var,
            alpha_var,
            theta_var,
            lambda_var,
            gamma_shape,
            gamma_rate,
            beta_shape,
            beta_rate,
            ..ShopperConfig::default()
        };
        let inner = Shopper::from_files(trips_path, prices_path, config)?;
        Ok(PyShopper { inner, results: None })
    }

    /// Fit with `N` iterations (ADVI) or draws per chain (MCMC).
    #[pyo3(signature = (N, method = "ADVI", diff = "relative", step = None, seed = 42))]
    #[allow(non_snake_case)]
    pub fn fit(
        &mut self, py: Python<'_>, N: usize, method: &str, diff: &str, step: Option<&str>,
        seed: u64,
    ) -> PyResult<()> {
        let method = FitMethod::from_str(method).map_err(ShopperError::from)?;
        let mut opts = FitOptions::new(N, method).map_err(ShopperError::from)?.with_seed(seed);
        if method == FitMethod::Advi {
            opts = opts.with_diff(ConvergenceDiff::from_str(diff).map_err(ShopperError::from)?);
        }
        if let Some(step) = step {
            opts = opts.with_step(StepMethod::from_str(step).map_err(ShopperError::from)?);
        }
        let inner = &self.inner;
        let results = py.allow_threads(|| inner.fit(&opts))?;
        self.results = Some(results);
        Ok(())
    }

    /// Summary rows as dictionaries.
    #[pyo3(signature = (draws = None))]
    pub fn summary<'py>(
        &self, py: Python<'py>, draws: Option<usize>,
    ) -> PyResult<Vec<Bound<'py, PyDict>>> {
        let summary = self.fitted()?.summary(draws).map_err(ShopperError::from)?;
        summary
            .rows
            .iter()
            .map(|r| {
                let d = PyDict::new_bound(py);
                d.set_item("name", &r.name)?;
                d.set_item("mean", r.mean)?;
                d.set_item("sd", r.sd)?;
                d.set_item("hdi_3%", r.hdi_low)?;
                d.set_item("hdi_97%", r.hdi_high)?;
                d.set_item("ess_bulk", r.ess_bulk)?;
                d.set_item("r_hat", r.r_hat)?;
                Ok(d)
            })
            .collect()
    }

    /// ELBO per iteration of an ADVI fit.
    pub fn elbo(&self) -> PyResult<Vec<f64>> {
        Ok(self.fitted()?.elbo_trace().map_err(ShopperError::from)?.to_vec())
    }

    /// Mean choice probabilities (`N × C`) for the trips and prices files.
    #[pyo3(signature = (trips_path, prices_path, draws = None))]
    pub fn predict<'py>(
        &self, py: Python<'py>, trips_path: &str, prices_path: &str, draws: Option<usize>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let table = load_data(trips_path, prices_path).map_err(ShopperError::from)?;
        let probs = self.fitted()?.predict(&table, draws)?;
        Ok(probs.to_pyarray_bound(py))
    }

    /// Argmax accuracy on the trips and prices files.
    #[pyo3(signature = (trips_path, prices_path, draws = None))]
    pub fn score(
        &self, trips_path: &str, prices_path: &str, draws: Option<usize>,
    ) -> PyResult<f64> {
        let table = load_data(trips_path, prices_path).map_err(ShopperError::from)?;
        Ok(self.fitted()?.score(&table, draws)?)
    }

    /// E-BFMI per chain of a Hamiltonian MCMC fit.
    pub fn energy_bfmi(&self) -> PyResult<Vec<f64>> {
        let energy = self.fitted()?.energy().map_err(ShopperError::from)?;
        Ok(energy.iter().map(|e| e.bfmi).collect())
    }
}

impl PyShopper {
    fn fitted(&self) -> PyResult<&ShopperResults> {
        self.results
            .as_ref()
            .ok_or_else(|| pyo3::exceptions::PyValueError::new_err("Call fit() first."))
    }
}
