//! Drives an `argmin` L-BFGS solve of the negated log density and reads the
//! final state back as an [`OptimOutcome`].
//!
//! The MAP point found here seeds the MCMC chains; its log density is
//! reported with the sign restored (argmin minimizes `-log p`).
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{Grad, LogDensity, MapOptions, OptimOutcome, Theta, adapter::ArgMinAdapter},
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, IterState, Solver, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;
use tracing::debug;

type MapState = IterState<Theta, Grad, (), (), (), f64>;

/// Run `solver` from `theta0` on the adapted log density.
///
/// `opts.tols.max_iter` caps the iteration count. With the `obs_slog`
/// feature and `opts.verbose`, progress is streamed to the terminal.
///
/// # Errors
/// - Any `argmin` runtime error, converted through `From<argmin::core::Error>`.
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MapOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogDensity,
    S: Solver<ArgMinAdapter<'a, F>, MapState> + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_start(&theta0, &problem)?;
    }
    let max_iter = opts.tols.max_iter;
    let executor = Executor::new(problem, solver).configure(|state| match max_iter {
        Some(n) => state.param(theta0).max_iters(n as u64),
        None => state.param(theta0),
    });
    #[cfg(feature = "obs_slog")]
    let executor = if opts.verbose {
        executor.add_observer(
            argmin_observer_slog::SlogLogger::term_noblock(),
            argmin::core::observers::ObserverMode::Always,
        )
    } else {
        executor
    };
    let state = executor.run()?.state().clone();
    into_outcome(state)
}

fn into_outcome(mut state: MapState) -> OptResult<OptimOutcome> {
    let iterations = state.get_iter();
    let status = state.get_termination_status().clone();
    let counts = state.get_func_counts().clone();
    let log_density = -state.get_best_cost();
    debug!(iterations, log_density, status = ?status, "MAP search finished");
    let grad = state.take_gradient();
    OptimOutcome::new(state.take_best_param(), log_density, status, iterations, counts, grad)
}

#[cfg(feature = "obs_slog")]
fn log_start<F: LogDensity>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()> {
    let log_density = -problem.cost(theta0)?;
    let grad_norm = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    tracing::info!(log_density, grad_norm = ?grad_norm, "MAP start");
    Ok(())
}
