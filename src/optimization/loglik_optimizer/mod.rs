//! loglik_optimizer — argmin-powered log-density interface and MAP optimizer.
//!
//! Purpose
//! -------
//! Define the seam every inference engine talks to, [`LogDensity`], and a
//! high-level L-BFGS maximizer ([`maximize`]) used for MAP estimates and
//! sampler starting points.
//!
//! Key behaviors
//! -------------
//! - Convert densities `ℓ(θ)` into Argmin cost functions `c(θ) = -ℓ(θ)` via
//!   [`adapter::ArgMinAdapter`], with a finite-difference gradient fallback
//!   for densities without an analytic gradient.
//! - [`maximize`] validates the start with [`LogDensity::check`], builds the
//!   solver selected by [`traits::LineSearcher`] ([`builders`]), runs it
//!   ([`run::run_lbfgs`]), and normalizes the result into [`OptimOutcome`].
//! - [`validation`] centralizes gradient, tolerance, and outcome checks.
//!
//! Invariants & assumptions
//! ------------------------
//! - Densities are maximized; user code implements `ℓ(θ)` and `∇ℓ(θ)`,
//!   **never** the cost directly.
//! - Invalid inputs are recoverable [`OptError`](crate::optimization::errors::OptError)
//!   values, not panics.
//!
//! Conventions
//! -----------
//! - Parameters live in an unconstrained space as [`Theta`]. Constraining
//!   transforms belong to the model layer.
//! - [`OptimOutcome::value`] is expressed in terms of `ℓ`, not the cost.
//!
//! Downstream usage
//! ----------------
//! - `ShopperModel` implements [`LogDensity`]; ADVI and the samplers call
//!   `value`/`grad` directly, while the MAP start goes through [`maximize`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover adapter sign conventions and FD fallback, builder
//!   wiring, validation helpers, option parsing, and a quadratic MAP solve.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogDensity, MapOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LogDensity, MapOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
