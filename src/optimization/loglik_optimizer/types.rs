//! loglik_optimizer::types — numeric aliases shared by the MAP optimizer and
//! the inference engines.
//!
//! Purpose
//! -------
//! Give the flat unconstrained parameter vector, its gradient, and the
//! scalar objective one name each, so the ADVI solver, the samplers, and
//! the L-BFGS path agree on shapes without repeating `ndarray` generics.
//!
//! Conventions
//! -----------
//! - `Theta` and `Grad` are always the length of the model's parameter
//!   layout; `Cost` is a log density or its negation depending on context.
//! - The L-BFGS aliases pin Argmin's `(Param, Gradient, Float)` generics to
//!   these types.
//!
//! Testing notes
//! -------------
//! - Aliases only; exercised by the optimizer and inference tests.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::Array1;
use std::collections::HashMap;

/// Unconstrained parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Gradient `∇ℓ(θ)` or `∇c(θ)`, same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective: `ℓ(θ)` at the density boundary, `-ℓ(θ)` inside argmin.
pub type Cost = f64;

/// Argmin function-evaluation counters (`"cost_count"`, `"gradient_count"`, ...).
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Hager–Zhang line search over `(Theta, Grad, Cost)`.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search over `(Theta, Grad, Cost)`.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// L-BFGS solver wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS solver wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
