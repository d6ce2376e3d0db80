//! High-level entry point for maximizing a [`LogDensity`].
//!
//! Selects an L-BFGS solver with either Hager–Zhang or More–Thuente line
//! search, wraps the density in an `ArgMinAdapter` (which *minimizes*
//! `-ℓ(θ)`), and delegates the run to `run_lbfgs`.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogDensity, MapOptions},
    },
};

/// Maximize `ℓ(θ)` with L-BFGS from `theta0`.
///
/// Used for MAP estimates, which can seed the samplers.
///
/// # Errors
/// - Propagates any error from `f.check`.
/// - Propagates builder errors and runtime errors (e.g., line search
///   failures) from `run_lbfgs`.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use rust_shopper::optimization::errors::OptResult;
/// use rust_shopper::optimization::loglik_optimizer::{maximize, LogDensity, MapOptions, Theta};
///
/// struct Bowl;
/// impl LogDensity for Bowl {
///     fn dim(&self) -> usize { 3 }
///     fn value(&self, theta: &Theta) -> OptResult<f64> { Ok(-theta.dot(theta)) }
///     fn check(&self, _: &Theta) -> OptResult<()> { Ok(()) }
/// }
///
/// let out = maximize(&Bowl, array![0.1, -0.2, 0.3], &MapOptions::default())?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), rust_shopper::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogDensity>(
    f: &F, theta0: Theta, opts: &MapOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0)?;
    let problem = ArgMinAdapter::new(f);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}
