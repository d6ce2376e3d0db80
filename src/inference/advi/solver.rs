//! Adagrad-window ascent on the ELBO, as an `argmin` [`Solver`].
//!
//! Each iteration draws one ELBO estimate, then moves
//!
//! ```text
//! φ ← φ + lr · g / sqrt(Σ_{last `window` steps} g² + eps)
//! ```
//!
//! where the window includes the current gradient. After the step the
//! parameter-change rule in [`ParameterConvergence`] may end the run early.
use crate::inference::{advi::objective::ElboStep, options::ConvergenceDiff};
use argmin::core::{
    ArgminError, Error, Gradient, IterState, KV, Problem, Solver, State, TerminationReason,
    TerminationStatus,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// State carried between ADVI iterations: `φ` and the last gradient.
pub type AdviState = IterState<Array1<f64>, Array1<f64>, (), (), (), f64>;

const RELATIVE_FLOOR: f64 = 1e-6;

/// Stop when the parameter vector stops moving.
///
/// The first observed `φ` becomes the reference. Every `every` iterations
/// (from iteration `every` on) the elementwise difference to the reference
/// is measured, its ∞-norm compared with `tolerance`, and the reference
/// replaced by the current `φ`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConvergence {
    every: usize,
    tolerance: f64,
    diff: ConvergenceDiff,
    prev: Option<Array1<f64>>,
}

impl ParameterConvergence {
    pub fn new(every: usize, tolerance: f64, diff: ConvergenceDiff) -> Self {
        ParameterConvergence { every, tolerance, diff, prev: None }
    }

    /// Feed iteration `i`'s post-update parameters; `true` once converged.
    pub fn check(&mut self, i: usize, current: &Array1<f64>) -> bool {
        let Some(prev) = self.prev.as_ref() else {
            self.prev = Some(current.clone());
            return false;
        };
        if i % self.every != 0 || i < self.every {
            return false;
        }
        let norm = current
            .iter()
            .zip(prev.iter())
            .map(|(&c, &p)| match self.diff {
                ConvergenceDiff::Absolute => (c - p).abs(),
                ConvergenceDiff::Relative => {
                    ((c - p).abs() + RELATIVE_FLOOR) / (p.abs() + RELATIVE_FLOOR)
                }
            })
            .fold(0.0_f64, f64::max);
        self.prev = Some(current.clone());
        debug!(iteration = i, norm, "ADVI parameter change");
        norm < self.tolerance
    }
}

/// Windowed adagrad ascent with an early-stop rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdagradWindow {
    learning_rate: f64,
    window: usize,
    epsilon: f64,
    squares: VecDeque<Array1<f64>>,
    convergence: ParameterConvergence,
    converged: bool,
}

impl AdagradWindow {
    pub fn new(
        learning_rate: f64, window: usize, epsilon: f64, convergence: ParameterConvergence,
    ) -> Self {
        AdagradWindow {
            learning_rate,
            window,
            epsilon,
            squares: VecDeque::with_capacity(window),
            convergence,
            converged: false,
        }
    }

    /// Apply one ascent step to `phi` in place.
    fn ascend(&mut self, phi: &mut Array1<f64>, grad: &Array1<f64>) {
        if self.squares.len() == self.window {
            self.squares.pop_front();
        }
        self.squares.push_back(grad.mapv(|g| g * g));
        for (j, x) in phi.iter_mut().enumerate() {
            let accu: f64 = self.squares.iter().map(|sq| sq[j]).sum();
            *x += self.learning_rate * grad[j] / (accu + self.epsilon).sqrt();
        }
    }
}

impl<O> Solver<O, AdviState> for AdagradWindow
where
    O: Gradient<Param = Array1<f64>, Gradient = ElboStep>,
{
    const NAME: &'static str = "AdagradWindow";

    fn next_iter(
        &mut self, problem: &mut Problem<O>, mut state: AdviState,
    ) -> Result<(AdviState, Option<KV>), Error> {
        let i = state.get_iter() as usize;
        let mut phi = state.take_param().ok_or_else(|| ArgminError::NotInitialized {
            text: "AdagradWindow requires an initial parameter vector".to_string(),
        })?;
        let ElboStep { elbo, grad } = problem.gradient(&phi)?;
        self.ascend(&mut phi, &grad);

        if i % self.convergence.every == 0 {
            debug!(iteration = i, elbo, "ADVI progress");
        }
        if self.convergence.check(i, &phi) {
            info!("Convergence achieved at {i}");
            self.converged = true;
        }
        Ok((state.param(phi).cost(-elbo).gradient(grad), None))
    }

    fn terminate(&mut self, _state: &AdviState) -> TerminationStatus {
        if self.converged {
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        } else {
            TerminationStatus::NotTerminated
        }
    }
}
