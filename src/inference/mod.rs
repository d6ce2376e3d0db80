//! inference — turn a log density into a fitted posterior.
//!
//! Purpose
//! -------
//! Drive one of two iterative engines over the unconstrained parameter
//! vector of a model: mean-field ADVI, which ends in a variational
//! approximation, or MCMC, which ends in a set of posterior draws.
//!
//! Key behaviors
//! -------------
//! - [`FitOptions`] is the fit entry point's argument list; enumerated
//!   selectors ([`FitMethod`], [`ConvergenceDiff`], [`StepMethod`]) parse
//!   case-insensitively.
//! - [`fit`] validates the options and dispatches to [`advi::fit_advi`] or
//!   [`mcmc::sample_chains`].
//! - [`InferenceError`] covers non-finite densities and gradients, invalid
//!   options, and optimizer failures.
//!
//! Invariants & assumptions
//! ------------------------
//! - Both engines are deterministic for a fixed seed.
//! - Numerical instability aborts the fit; nothing is retried.
//!
//! Conventions
//! -----------
//! - The engines see the model only through
//!   [`LogDensity`](crate::optimization::loglik_optimizer::LogDensity).
//!
//! Downstream usage
//! ----------------
//! - The `Shopper` facade calls [`fit`] with the model's initial point and
//!   wraps the resulting [`Posterior`](crate::results::Posterior).
//!
//! Testing notes
//! -------------
//! - Engines are exercised on Gaussian targets with known moments; the
//!   full Shopper pipeline is covered by the integration tests.

pub mod advi;
pub mod errors;
pub mod fit;
pub mod mcmc;
pub mod options;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{InferenceError, InferenceResult};
pub use self::fit::fit;
pub use self::options::{
    AdviOptions, ConvergenceDiff, FitMethod, FitOptions, NutsOptions, SampleOptions, StepMethod,
};

pub mod prelude {
    pub use super::errors::{InferenceError, InferenceResult};
    pub use super::fit::fit;
    pub use super::options::{ConvergenceDiff, FitMethod, FitOptions, StepMethod};
}
