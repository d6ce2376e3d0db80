//! Shared sampler seam and per-draw statistics.
use crate::{inference::errors::InferenceResult, optimization::loglik_optimizer::Theta};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;

/// Generator every chain owns.
pub type ChainRng = Xoshiro256PlusPlus;

/// Statistics of a single transition.
///
/// - `energy`: Hamiltonian of the selected state; `None` for samplers
///   without one.
/// - `step_size`: step size (or proposal scale) used by the transition.
/// - `tree_depth`: NUTS doubling depth, `0` otherwise.
/// - `n_steps`: leapfrog steps or proposals evaluated.
/// - `accept_stat`: mean acceptance probability of the transition.
/// - `diverging`: the energy error exceeded the divergence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplerStats {
    pub energy: Option<f64>,
    pub step_size: f64,
    pub tree_depth: usize,
    pub n_steps: usize,
    pub accept_stat: f64,
    pub diverging: bool,
}

/// A Markov transition kernel with its own tuning state.
///
/// The kernel owns the chain's current position, set when it is built.
/// Iterations are numbered from 0; those below the kernel's tuning length
/// adapt, the rest are frozen.
pub trait Transition {
    fn name(&self) -> &'static str;

    /// Advance one iteration.
    fn step(&mut self, iter: usize, rng: &mut ChainRng) -> InferenceResult<SamplerStats>;

    fn position(&self) -> &Theta;
}
