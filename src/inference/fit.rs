//! Fit dispatch: route a [`FitOptions`] to ADVI or MCMC.
use crate::{
    inference::{
        advi::fit_advi,
        errors::InferenceResult,
        mcmc::sample_chains,
        options::{FitMethod, FitOptions},
    },
    optimization::loglik_optimizer::{LogDensity, Theta},
    results::posterior::Posterior,
};
use tracing::{info, warn};

/// Fit `f` from `initial` with the method selected in `opts`.
///
/// Options that only apply to the other method are ignored with a warning.
///
/// # Errors
/// - [`InferenceError::InvalidOption`](crate::inference::errors::InferenceError::InvalidOption)
///   for out-of-range option values.
/// - Convergence-class errors from the selected engine.
pub fn fit<F: LogDensity>(f: &F, initial: &Theta, opts: &FitOptions) -> InferenceResult<Posterior> {
    opts.validate()?;
    info!(method = ?opts.method, n = opts.n, seed = opts.seed, "Starting fit.");
    let posterior = match opts.method {
        FitMethod::Advi => {
            if let Some(step) = opts.step {
                warn!(step = step.name(), "Step method is ignored by ADVI.");
            }
            if opts.rich_trace.is_some() {
                warn!("Rich-trace flag is ignored by ADVI.");
            }
            let q = fit_advi(f, initial, opts.n, opts.seed, &opts.advi, opts.diff_mode())?;
            Posterior::Approximation(q)
        }
        FitMethod::Mcmc => {
            if let Some(diff) = opts.diff {
                warn!(?diff, "Convergence diff mode is ignored by MCMC.");
            }
            let set = sample_chains(
                f,
                initial,
                opts.n,
                opts.seed,
                &opts.sample,
                opts.step_method(),
                opts.keeps_sampler_stats(),
            )?;
            Posterior::Trace(set)
        }
    };
    info!(kind = posterior.kind(), "Done fitting.");
    Ok(posterior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{
        errors::InferenceError,
        mcmc::test_support::StdNormal,
        options::{ConvergenceDiff, StepMethod},
    };
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Each method yields its own posterior kind, and options for the other
    // method do not change the outcome.
    //
    // Given
    // -----
    // - 1-d standard normal; ADVI (n = 50) with a stray step method, and
    //   MCMC (n = 20, tune 20) with a stray diff mode.
    //
    // Expect
    // ------
    // - `Approximation` with 50 ELBO values, identical to a run without the
    //   stray option; `Trace` with 20 draws per chain.
    fn dispatches_by_method() {
        let f = StdNormal(1);
        let x0 = array![0.0];
        let advi = FitOptions::new(50, FitMethod::Advi).unwrap();
        let q = fit(&f, &x0, &advi).unwrap();
        let q_stray = fit(&f, &x0, &advi.clone().with_step(StepMethod::Nuts)).unwrap();
        assert_eq!(q, q_stray);
        assert_eq!(q.as_approximation().map(|a| a.hist.len()), Some(50));

        let mut mcmc = FitOptions::new(20, FitMethod::Mcmc).unwrap();
        mcmc.sample.tune = 20;
        let trace = fit(&f, &x0, &mcmc.with_diff(ConvergenceDiff::Absolute)).unwrap();
        assert_eq!(trace.as_trace().map(|t| t.n_draws()), Some(20));
    }

    #[test]
    // Purpose
    // -------
    // Invalid values are errors, not warnings.
    //
    // Given
    // -----
    // - n = 0; and an ADVI learning rate of 0.
    //
    // Expect
    // ------
    // - `InvalidOption` in both cases.
    fn invalid_values_fail() {
        assert!(matches!(
            FitOptions::new(0, FitMethod::Advi),
            Err(InferenceError::InvalidOption { name: "n", .. })
        ));
        let mut opts = FitOptions::new(10, FitMethod::Advi).unwrap();
        opts.advi.learning_rate = 0.0;
        assert!(matches!(
            fit(&StdNormal(1), &array![0.0], &opts),
            Err(InferenceError::InvalidOption { .. })
        ));
    }
}
