//! Reparameterized ELBO estimator as an `argmin` gradient problem.
//!
//! For `φ = [μ; ρ]`, `σ = softplus(ρ)`, one draw `ε ~ N(0, I)` and
//! `z = μ + σ ⊙ ε`:
//!
//! ```text
//! ELBO(φ) ≈ log p(z) + Σ ln σ + d/2 · (1 + ln 2π)
//! ∇_μ     = ∇ log p(z)
//! ∇_ρ     = (∇ log p(z) ⊙ ε + 1/σ) ⊙ logistic(ρ)
//! ```
//!
//! The estimate and its gradient share one draw, so they are returned
//! together as an [`ElboStep`] from `Gradient::gradient`.
use std::cell::RefCell;

use crate::{
    inference::errors::{ensure_finite_grad, ensure_finite_value},
    optimization::{
        loglik_optimizer::{LogDensity, Theta},
        numerical_stability::{MIN_SCALE, safe_logistic, safe_softplus},
    },
};
use argmin::core::{Error, Gradient};
use ndarray::{Array1, s};
use rand::Rng;
use rand_distr::StandardNormal;
use rand_xoshiro::{Xoshiro256PlusPlus, rand_core::SeedableRng};

/// One stochastic ELBO evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ElboStep {
    pub elbo: f64,
    /// Gradient of the ELBO estimate with respect to `[μ; ρ]`.
    pub grad: Array1<f64>,
}

/// Monte-Carlo ELBO of a [`LogDensity`] under a mean-field Gaussian.
pub struct ElboObjective<'a, F: LogDensity> {
    f: &'a F,
    rng: RefCell<Xoshiro256PlusPlus>,
}

impl<'a, F: LogDensity> ElboObjective<'a, F> {
    pub fn new(f: &'a F, seed: u64) -> Self {
        ElboObjective { f, rng: RefCell::new(Xoshiro256PlusPlus::seed_from_u64(seed)) }
    }

    /// Draw `ε` and evaluate the estimator at `φ`.
    pub fn step(&self, phi: &Array1<f64>) -> Result<ElboStep, Error> {
        let d = phi.len() / 2;
        let mu = phi.slice(s![..d]);
        let rho = phi.slice(s![d..]);
        let sigma = rho.mapv(|r| safe_softplus(r).max(MIN_SCALE));
        let eps: Array1<f64> = {
            let mut rng = self.rng.borrow_mut();
            (0..d).map(|_| rng.sample::<f64, _>(StandardNormal)).collect()
        };
        let z: Theta = &mu + &(&sigma * &eps);

        let logp = ensure_finite_value(self.f.value(&z)?, "advi")?;
        let g = self.f.grad(&z)?;
        ensure_finite_grad(&g, "advi")?;

        let d_f = d as f64;
        let entropy =
            sigma.mapv(f64::ln).sum() + 0.5 * d_f * (1.0 + (2.0 * std::f64::consts::PI).ln());

        let mut grad = Array1::<f64>::zeros(2 * d);
        grad.slice_mut(s![..d]).assign(&g);
        for j in 0..d {
            grad[d + j] = (g[j] * eps[j] + 1.0 / sigma[j]) * safe_logistic(rho[j]);
        }
        Ok(ElboStep { elbo: logp + entropy, grad })
    }
}

impl<'a, F: LogDensity> Gradient for ElboObjective<'a, F> {
    type Param = Array1<f64>;
    type Gradient = ElboStep;

    fn gradient(&self, phi: &Self::Param) -> Result<Self::Gradient, Error> {
        self.step(phi)
    }
}
