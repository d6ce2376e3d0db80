//! Summary — per-parameter posterior statistics table.
//!
//! Purpose
//! -------
//! Reduce a [`TraceView`] of constrained draws to one row per scalar
//! parameter: mean, standard deviation, 94% highest-density interval, bulk
//! effective sample size and split R̂.
//!
//! Key behaviors
//! -------------
//! - Rows are computed in parallel over parameters and returned in layout
//!   order (`rho[..]`, `alpha[..]`, `theta[..]`, `lambda[..]`, `gamma[..]`,
//!   `beta[..]`).
//! - Moments pool all chains; ESS and R̂ keep the chain structure.
//! - `Display` renders an aligned text table; `Serialize` writes the HDI
//!   bounds under the keys `hdi_3%` and `hdi_97%`.
//!
//! Invariants & assumptions
//! ------------------------
//! - With fewer than four draws per chain the table is still produced, with
//!   `NaN` ESS and R̂, and a warning is logged.
use std::fmt;

use crate::results::diagnostics::{TraceView, ess_bulk, hdi, split_rhat};
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::warn;

/// Posterior mass covered by the reported interval.
pub const HDI_PROB: f64 = 0.94;

/// Statistics of one scalar parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub name: String,
    pub mean: f64,
    pub sd: f64,
    #[serde(rename = "hdi_3%")]
    pub hdi_low: f64,
    #[serde(rename = "hdi_97%")]
    pub hdi_high: f64,
    pub ess_bulk: f64,
    pub r_hat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn from_trace(trace: &TraceView) -> Summary {
        let (_, n_chains, n_draws) = trace.values.dim();
        if n_draws < 4 {
            warn!(
                n_chains,
                n_draws, "Fewer than 4 draws per chain; ESS and R-hat are not reported."
            );
        }
        let rows = (0..trace.names.len())
            .into_par_iter()
            .map(|p| {
                let chains = trace.chains_of(p);
                let pooled: Vec<f64> = chains.iter().flat_map(|c| c.iter().copied()).collect();
                let (hdi_low, hdi_high) = hdi(&pooled, HDI_PROB);
                SummaryRow {
                    name: trace.names[p].clone(),
                    mean: pooled.iter().mean(),
                    sd: pooled.iter().std_dev(),
                    hdi_low,
                    hdi_high,
                    ess_bulk: ess_bulk(&chains),
                    r_hat: split_rhat(&chains),
                }
            })
            .collect();
        Summary { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max(9);
        writeln!(
            f,
            "{:<width$} {:>9} {:>9} {:>9} {:>9} {:>9} {:>7}",
            "parameter", "mean", "sd", "hdi_3%", "hdi_97%", "ess_bulk", "r_hat"
        )?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<width$} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.1} {:>7.3}",
                r.name, r.mean, r.sd, r.hdi_low, r.hdi_high, r.ess_bulk, r.r_hat
            )?;
        }
        Ok(())
    }
}
