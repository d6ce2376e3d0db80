//! ShopperResults — diagnostics over a fitted posterior.
//!
//! Purpose
//! -------
//! Pair a [`Posterior`] with the model it was fitted on and expose the
//! summary, trace, energy and objective views with explicit capability
//! checks per posterior kind.
//!
//! Key behaviors
//! -------------
//! - Every view reports model-space values: log-scale blocks (`gamma`,
//!   `beta`) are exponentiated before summarizing.
//! - An approximation is sampled on demand with a generator seeded from the
//!   fit seed, so repeated calls with the same draw count agree.
//! - Views that a posterior kind cannot serve fail with [`UsageError`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The posterior dimension equals the model layout dimension; checked at
//!   construction.
//!
//! Conventions
//! -----------
//! - `draws` is mandatory (and must be nonzero) for approximations. Traces
//!   always use every kept draw; a `draws` argument is ignored.
use std::sync::Arc;

use crate::{
    inference::mcmc::{ChainRng, DrawSet},
    model::ShopperModel,
    results::{
        diagnostics::{ChainEnergy, TraceView},
        errors::{UsageError, UsageResult},
        posterior::Posterior,
        summary::Summary,
    },
};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ShopperResults {
    model: Arc<ShopperModel>,
    posterior: Posterior,
    seed: u64,
}

impl ShopperResults {
    /// # Errors
    /// [`UsageError::DimensionMismatch`] if the posterior was not fitted on a
    /// parameter vector of `model`'s layout.
    pub fn new(model: Arc<ShopperModel>, posterior: Posterior, seed: u64) -> UsageResult<Self> {
        let expected = model.layout().dim();
        if posterior.dim() != expected {
            return Err(UsageError::DimensionMismatch { expected, found: posterior.dim() });
        }
        Ok(ShopperResults { model, posterior, seed })
    }

    pub fn model(&self) -> &ShopperModel {
        &self.model
    }

    pub fn posterior(&self) -> &Posterior {
        &self.posterior
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Unconstrained draws grouped by chain (`draws × dim` per chain).
    ///
    /// An approximation contributes one pseudo-chain of `draws` samples.
    pub fn unconstrained_draws(
        &self, operation: &'static str, draws: Option<usize>,
    ) -> UsageResult<Vec<Array2<f64>>> {
        match &self.posterior {
            Posterior::Approximation(q) => {
                let n = draws.ok_or(UsageError::DrawsRequired { operation })?;
                if n == 0 {
                    return Err(UsageError::ZeroDraws { operation, draws: n });
                }
                let mut rng = ChainRng::seed_from_u64(self.seed);
                Ok(vec![q.sample(&mut rng, n)])
            }
            Posterior::Trace(set) => {
                if let Some(n) = draws {
                    debug!(operation, draws = n, "Draw count is ignored for sampled traces.");
                }
                Ok(set.chains.iter().map(|c| c.draws.clone()).collect())
            }
        }
    }

    /// Constrained per-parameter `chain × draw` arrays.
    pub fn trace(&self, draws: Option<usize>) -> UsageResult<TraceView> {
        self.trace_for("trace", draws)
    }

    /// Mean / sd / HDI / ESS / R̂ table over constrained draws.
    ///
    /// # Errors
    /// - [`UsageError::DrawsRequired`] for an approximation without `draws`.
    /// - [`UsageError::ZeroDraws`] for `draws == Some(0)` on an approximation.
    pub fn summary(&self, draws: Option<usize>) -> UsageResult<Summary> {
        Ok(Summary::from_trace(&self.trace_for("summary", draws)?))
    }

    /// Split R̂ per parameter of a sampled trace.
    pub fn rhat(&self) -> UsageResult<Array1<f64>> {
        self.draw_set("rhat")?;
        Ok(self.trace_for("rhat", None)?.rhat())
    }

    /// Per-chain energy diagnostic of a Hamiltonian trace.
    ///
    /// # Errors
    /// - [`UsageError::NotSampled`] for an approximation.
    /// - [`UsageError::EnergyUnavailable`] when the step method has no
    ///   energy.
    /// - [`UsageError::NoSamplerStats`] when the trace was fitted without the
    ///   rich representation.
    pub fn energy(&self) -> UsageResult<Vec<ChainEnergy>> {
        let operation = "energy";
        let set = self.draw_set(operation)?;
        if !set.records_energy {
            return Err(UsageError::EnergyUnavailable { step: set.step });
        }
        set.chains
            .iter()
            .map(|c| {
                let stats = c.stats.as_ref().ok_or(UsageError::NoSamplerStats { operation })?;
                Ok(ChainEnergy::new(stats.iter().filter_map(|s| s.energy).collect()))
            })
            .collect()
    }

    /// ELBO estimate per iteration of a variational fit.
    pub fn elbo_trace(&self) -> UsageResult<&[f64]> {
        self.posterior
            .as_approximation()
            .map(|q| q.hist.as_slice())
            .ok_or(UsageError::NotVariational { operation: "elbo_trace" })
    }

    fn draw_set(&self, operation: &'static str) -> UsageResult<&DrawSet> {
        self.posterior.as_trace().ok_or(UsageError::NotSampled { operation })
    }

    fn trace_for(&self, operation: &'static str, draws: Option<usize>) -> UsageResult<TraceView> {
        let layout = self.model.layout();
        let chains: Vec<Array2<f64>> = self
            .unconstrained_draws(operation, draws)?
            .into_iter()
            .map(|mut chain| {
                for mut row in chain.rows_mut() {
                    let constrained = layout.constrain(row.view());
                    row.assign(&constrained);
                }
                chain
            })
            .collect();
        let views: Vec<_> = chains.iter().map(|c| c.view()).collect();
        Ok(TraceView::from_chains(layout.parameter_names(), &views))
    }
}
