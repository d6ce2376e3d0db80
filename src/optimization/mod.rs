//! optimization — log-density seam, MAP optimizer, numerical helpers, and the
//! optimizer error surface.
//!
//! Purpose
//! -------
//! Collect the pieces shared by every inference path: the [`LogDensity`]
//! trait the model implements, an Argmin-backed L-BFGS maximizer for MAP
//! estimates, overflow-safe transforms, and [`errors::OptError`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Everything operates on the flat unconstrained vector `θ`; invalid
//!   states are reported as `OptError`, not panics.
//! - Model errors raised while evaluating a density travel as
//!   `OptError::Model`.
//!
//! Downstream usage
//! ----------------
//! - `inference` wraps `OptError` in its own error type and drives
//!   `LogDensity` directly for ADVI and MCMC.
//!
//! [`LogDensity`]: loglik_optimizer::LogDensity

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
