//! Drive the ADVI solver with the `argmin` executor.
use crate::{
    inference::{
        advi::{
            approximation::MeanFieldApproximation,
            objective::ElboObjective,
            observer::ElboHistory,
            solver::{AdagradWindow, ParameterConvergence},
        },
        errors::{InferenceError, InferenceResult},
        options::{AdviOptions, ConvergenceDiff},
    },
    optimization::loglik_optimizer::{LogDensity, Theta},
};
use argmin::core::{Executor, State, TerminationReason, TerminationStatus, observers::ObserverMode};
use ndarray::{Array1, Axis, concatenate};
use tracing::info;

/// Fit a mean-field Gaussian to `f` by stochastic ELBO ascent.
///
/// Starts from `μ = initial`, `ρ = 0` and runs at most `n` iterations, each
/// with one Monte-Carlo draw from a generator seeded with `seed`. `diff`
/// selects the parameter-change measure of the early-stop rule.
///
/// # Errors
/// - [`InferenceError::Optimizer`] if `initial` fails [`LogDensity::check`].
/// - [`InferenceError::NonFiniteLogDensity`] / [`InferenceError::NonFiniteGradient`]
///   when a draw lands where the density is not finite.
pub fn fit_advi<F: LogDensity>(
    f: &F, initial: &Theta, n: usize, seed: u64, opts: &AdviOptions, diff: ConvergenceDiff,
) -> InferenceResult<MeanFieldApproximation> {
    opts.validate()?;
    f.check(initial)?;
    let phi0 = concatenate(Axis(0), &[initial.view(), Array1::<f64>::zeros(initial.len()).view()])
        .map_err(|e| InferenceError::InvalidOption {
            name: "initial point",
            value: e.to_string(),
            reason: "Initial point could not be stacked with the scale parameters.",
        })?;

    let rule = ParameterConvergence::new(opts.every, opts.tolerance, diff);
    let solver = AdagradWindow::new(opts.learning_rate, opts.window, opts.epsilon, rule);
    let history = ElboHistory::new();
    info!(iterations = n, dim = f.dim(), ?diff, "Starting ADVI.");

    let result = Executor::new(ElboObjective::new(f, seed), solver)
        .configure(|state| state.param(phi0).max_iters(n as u64))
        .add_observer(history.clone(), ObserverMode::Always)
        .run()?;
    let state = result.state();
    let phi = state.get_param().cloned().ok_or_else(|| InferenceError::InvalidOption {
        name: "n",
        value: n.to_string(),
        reason: "ADVI finished without a parameter vector.",
    })?;

    let hist = history.values()?;
    let converged_at = match state.get_termination_status() {
        TerminationStatus::Terminated(TerminationReason::SolverConverged) => {
            hist.len().checked_sub(1)
        }
        _ => None,
    };
    let iterations = hist.len();
    info!(iterations, ?converged_at, "Done fitting ADVI.");
    Ok(MeanFieldApproximation::from_params(&phi, hist, iterations, converged_at))
}
