//! Mean-field Gaussian approximation in unconstrained space.
//!
//! `q(θ) = Π_j N(θ_j | μ_j, σ_j²)` with `σ = softplus(ρ)`, so `(μ, ρ)` are
//! unconstrained. Draws are returned in the same unconstrained space as the
//! model's parameter vector; constraining happens in the results layer.
use crate::optimization::numerical_stability::{MIN_SCALE, safe_softplus};
use ndarray::{Array1, Array2, s};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Serialize;

/// Fitted variational posterior.
///
/// - `mu`, `rho`: variational parameters, each of the model's dimension.
/// - `hist`: ELBO estimate of every iteration, in order.
/// - `iterations`: iterations actually run.
/// - `converged_at`: iteration at which the parameter-change rule fired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanFieldApproximation {
    pub mu: Array1<f64>,
    pub rho: Array1<f64>,
    pub hist: Vec<f64>,
    pub iterations: usize,
    pub converged_at: Option<usize>,
}

impl MeanFieldApproximation {
    /// Split a concatenated `[μ; ρ]` vector.
    pub fn from_params(
        params: &Array1<f64>, hist: Vec<f64>, iterations: usize, converged_at: Option<usize>,
    ) -> MeanFieldApproximation {
        let d = params.len() / 2;
        MeanFieldApproximation {
            mu: params.slice(s![..d]).to_owned(),
            rho: params.slice(s![d..]).to_owned(),
            hist,
            iterations,
            converged_at,
        }
    }

    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    /// Standard deviations `softplus(ρ)`, floored at [`MIN_SCALE`].
    pub fn std(&self) -> Array1<f64> {
        self.rho.mapv(|r| safe_softplus(r).max(MIN_SCALE))
    }

    /// `n` independent draws, one per row.
    pub fn sample<R: Rng>(&self, rng: &mut R, n: usize) -> Array2<f64> {
        let sd = self.std();
        let mut out = Array2::<f64>::zeros((n, self.dim()));
        for mut row in out.rows_mut() {
            for ((x, &m), &s) in row.iter_mut().zip(self.mu.iter()).zip(sd.iter()) {
                let eps: f64 = rng.sample(StandardNormal);
                *x = m + s * eps;
            }
        }
        out
    }

    /// Differential entropy of `q`.
    pub fn entropy(&self) -> f64 {
        let d = self.dim() as f64;
        self.std().mapv(f64::ln).sum() + 0.5 * d * (1.0 + (2.0 * std::f64::consts::PI).ln())
    }
}
