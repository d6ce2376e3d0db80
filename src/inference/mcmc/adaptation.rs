//! Step-size and mass-matrix adaptation for the gradient-based samplers.
//!
//! Purpose
//! -------
//! Tune the leapfrog step size towards a target acceptance statistic and
//! estimate a diagonal inverse mass from the tuning draws. Both are frozen
//! once tuning ends.
//!
//! Key behaviors
//! -------------
//! - [`DualAveraging`]: Nesterov dual averaging on `log ε` with
//!   `μ = ln(10 ε₀)`, `γ = 0.05`, `t₀ = 10`, `κ = 0.75`.
//! - [`RunningVariance`]: Welford accumulator with the regularized estimate
//!   `n/(n+5) · var + 1e-3 · 5/(n+5)`.
//! - [`mass_windows`]: the tuning schedule. A fast initial buffer (75
//!   iterations), then doubling slow windows starting at 25, then a fast
//!   terminal buffer (50). Short tuning runs fall back to 15% / 75% / 10%.
//! - [`Adaptation`] combines the three and restarts dual averaging after
//!   every mass update.
//! - [`find_reasonable_epsilon`]: initial step-size heuristic that doubles or
//!   halves `ε` until the one-step acceptance ratio crosses ½.
//!
//! Invariants & assumptions
//! ------------------------
//! - Adaptation is only fed tuning iterations, i.e. `iter < tune`.
//! - After the last tuning iteration the step size is the dual-averaging
//!   iterate average `exp(log ε̄)`.
use crate::{
    inference::{
        errors::{InferenceError, InferenceResult},
        mcmc::hamiltonian::{DiagMass, Potential, leapfrog},
    },
    optimization::loglik_optimizer::{LogDensity, Theta},
};
use ndarray::Array1;
use rand::Rng;
use tracing::debug;

const GAMMA: f64 = 0.05;
const T0: f64 = 10.0;
const KAPPA: f64 = 0.75;

const INIT_BUFFER: usize = 75;
const TERM_BUFFER: usize = 50;
const BASE_WINDOW: usize = 25;

const MAX_SEARCH_STEPS: usize = 100;

// ---- Dual averaging ----

#[derive(Debug, Clone, PartialEq)]
pub struct DualAveraging {
    target: f64,
    mu: f64,
    h_bar: f64,
    log_eps_bar: f64,
    t: f64,
}

impl DualAveraging {
    pub fn new(target: f64, eps0: f64) -> Self {
        DualAveraging { target, mu: (10.0 * eps0).ln(), h_bar: 0.0, log_eps_bar: 0.0, t: 0.0 }
    }

    /// Forget history and recentre on `eps`.
    pub fn restart(&mut self, eps: f64) {
        *self = DualAveraging::new(self.target, eps);
    }

    /// Feed one acceptance statistic; returns the next step size.
    pub fn update(&mut self, accept_stat: f64) -> f64 {
        self.t += 1.0;
        let eta = 1.0 / (self.t + T0);
        self.h_bar = (1.0 - eta) * self.h_bar + eta * (self.target - accept_stat);
        let log_eps = self.mu - self.t.sqrt() / GAMMA * self.h_bar;
        let w = self.t.powf(-KAPPA);
        self.log_eps_bar = w * log_eps + (1.0 - w) * self.log_eps_bar;
        log_eps.exp()
    }

    /// Averaged step size, `None` before the first update.
    pub fn final_step(&self) -> Option<f64> {
        (self.t > 0.0).then(|| self.log_eps_bar.exp())
    }
}

// ---- Variance estimation ----

/// Welford running mean and variance per coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningVariance {
    n: usize,
    mean: Array1<f64>,
    m2: Array1<f64>,
}

impl RunningVariance {
    pub fn new(dim: usize) -> Self {
        RunningVariance { n: 0, mean: Array1::zeros(dim), m2: Array1::zeros(dim) }
    }

    pub fn count(&self) -> usize {
        self.n
    }

    pub fn push(&mut self, x: &Theta) {
        self.n += 1;
        let n = self.n as f64;
        for ((m, s), &xi) in self.mean.iter_mut().zip(self.m2.iter_mut()).zip(x.iter()) {
            let delta = xi - *m;
            *m += delta / n;
            *s += delta * (xi - *m);
        }
    }

    /// Sample variance, shrunk towards `1e-3`.
    pub fn regularized(&self) -> Array1<f64> {
        let n = self.n as f64;
        let var = if self.n > 1 { &self.m2 / (n - 1.0) } else { Array1::zeros(self.m2.len()) };
        var.mapv(|v| (n / (n + 5.0)) * v + 1e-3 * (5.0 / (n + 5.0)))
    }

    pub fn reset(&mut self) {
        *self = RunningVariance::new(self.mean.len());
    }
}

// ---- Schedule ----

/// Slow windows `[start, end)` of a tuning run of length `tune`.
pub fn mass_windows(tune: usize) -> Vec<(usize, usize)> {
    let (init, term) = if tune < INIT_BUFFER + TERM_BUFFER + BASE_WINDOW {
        (tune * 15 / 100, tune / 10)
    } else {
        (INIT_BUFFER, TERM_BUFFER)
    };
    let last = tune - term;
    let mut size = if tune < INIT_BUFFER + TERM_BUFFER + BASE_WINDOW {
        last - init
    } else {
        BASE_WINDOW
    };
    let mut windows = Vec::new();
    let mut start = init;
    while start < last && size > 0 {
        let mut end = (start + size).min(last);
        if end + 2 * size > last {
            end = last;
        }
        windows.push((start, end));
        start = end;
        size *= 2;
    }
    windows
}

// ---- Combined adapter ----

/// Dual averaging plus windowed diagonal mass estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct Adaptation {
    tune: usize,
    windows: Vec<(usize, usize)>,
    dual: DualAveraging,
    variance: RunningVariance,
}

impl Adaptation {
    pub fn new(tune: usize, target: f64, eps0: f64, dim: usize) -> Self {
        Adaptation {
            tune,
            windows: mass_windows(tune),
            dual: DualAveraging::new(target, eps0),
            variance: RunningVariance::new(dim),
        }
    }

    pub fn is_tuning(&self, iter: usize) -> bool {
        iter < self.tune
    }

    /// Adapt after tuning iteration `iter` that ended at `q`.
    ///
    /// Returns the step size for the next iteration; updates `mass` at the
    /// end of each slow window.
    pub fn update(
        &mut self, iter: usize, accept_stat: f64, q: &Theta, mass: &mut DiagMass,
    ) -> f64 {
        let mut eps = self.dual.update(accept_stat);
        if let Some(&(_, end)) = self.windows.iter().find(|(s, e)| (*s..*e).contains(&iter)) {
            self.variance.push(q);
            if iter + 1 == end {
                *mass = DiagMass::from_inverse(self.variance.regularized());
                debug!(iteration = iter, draws = self.variance.count(), "Updated mass matrix");
                self.variance.reset();
                if iter + 1 < self.tune {
                    self.dual.restart(eps);
                }
            }
        }
        if iter + 1 == self.tune {
            eps = self.dual.final_step().unwrap_or(eps);
            debug!(step_size = eps, "Tuning finished");
        }
        eps
    }
}

// ---- Initial step size ----

/// Heuristic initial step size from Hoffman and Gelman (2014), Algorithm 4.
///
/// Non-finite trajectories halve `ε` until a finite one is found.
///
/// # Errors
/// - [`InferenceError::StepSizeSearch`] if no finite trajectory is found, or
///   `ε` collapses to zero.
pub fn find_reasonable_epsilon<F: LogDensity, R: Rng>(
    potential: &Potential<'_, F>, mass: &DiagMass, q: &Theta, rng: &mut R,
) -> InferenceResult<f64> {
    let mut start = potential.point(q.clone())?;
    start.p = mass.sample_momentum(rng);
    let h0 = mass.energy(&start);
    let log_ratio = |eps: f64| -> Option<f64> {
        let next = leapfrog(potential, mass, &start, eps).ok()?;
        let h1 = mass.energy(&next);
        h1.is_finite().then_some(h0 - h1)
    };

    let mut eps = 1.0_f64;
    let mut first = None;
    for _ in 0..MAX_SEARCH_STEPS {
        if let Some(lr) = log_ratio(eps) {
            first = Some(lr);
            break;
        }
        eps *= 0.5;
    }
    let first = first.ok_or(InferenceError::StepSizeSearch {
        reason: "no finite leapfrog step was found",
    })?;

    let a: f64 = if first > 0.5_f64.ln() { 1.0 } else { -1.0 };
    let mut lr = first;
    for _ in 0..MAX_SEARCH_STEPS {
        if a * lr <= -a * 2.0_f64.ln() {
            break;
        }
        let next = eps * 2.0_f64.powf(a);
        match log_ratio(next) {
            Some(value) => {
                eps = next;
                lr = value;
            }
            None => break,
        }
    }
    if !(eps > 0.0 && eps.is_finite()) {
        return Err(InferenceError::StepSizeSearch { reason: "step size collapsed to zero" });
    }
    Ok(eps)
}
