//! numerical_stability — overflow-safe scalar transforms and softmax helpers.
//!
//! Purpose
//! -------
//! Collect the small numerical primitives shared by the model and the
//! inference engines: the softplus/logistic pair used by the variational
//! scale parameters, and max-shifted log-sum-exp / softmax used by the
//! per-row choice likelihood.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are assumed finite unless documented otherwise; shape and domain
//!   validation happens in the model and inference layers.
//! - `softmax_in_place` always produces a probability vector summing to 1
//!   (within rounding) for finite utilities.
//!
//! Conventions
//! -----------
//! - Pure functions over `f64` and `ndarray` 1-D containers; no logging, no
//!   global state.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] check round-trips across the
//!   softplus cutoff, tail stability of the logistic, and mass conservation
//!   of softmax for large utilities.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    MIN_SCALE, log_sum_exp, safe_logistic, safe_softplus, safe_softplus_inv, softmax_in_place,
};

pub mod prelude {
    pub use super::transformations::{
        log_sum_exp, safe_logistic, safe_softplus, safe_softplus_inv, softmax_in_place,
    };
}
