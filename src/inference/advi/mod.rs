//! advi — mean-field automatic differentiation variational inference.
//!
//! Purpose
//! -------
//! Approximate the posterior of a [`LogDensity`](crate::optimization::loglik_optimizer::LogDensity)
//! by a diagonal Gaussian in unconstrained space, fitted by stochastic
//! ascent on the evidence lower bound.
//!
//! Key behaviors
//! -------------
//! - [`ElboObjective`] draws one reparameterized sample per call and returns
//!   the ELBO estimate together with its gradient.
//! - [`AdagradWindow`] is an `argmin` solver applying windowed adagrad steps
//!   and stopping early through [`ParameterConvergence`].
//! - [`ElboHistory`] observes every iteration and records the ELBO.
//! - [`fit_advi`] wires these into an `argmin` executor.
//!
//! Invariants & assumptions
//! ------------------------
//! - The variational scale is `softplus(ρ)`, so the whole parameter vector
//!   `[μ; ρ]` is unconstrained.
//! - Runs are deterministic for a fixed seed.
//!
//! Testing notes
//! -------------
//! - A degenerate fit (negligible learning rate) must stop at the first
//!   convergence check; a Gaussian target must be recovered.

pub mod approximation;
pub mod objective;
pub mod observer;
pub mod run;
pub mod solver;

pub use self::approximation::MeanFieldApproximation;
pub use self::objective::{ElboObjective, ElboStep};
pub use self::observer::ElboHistory;
pub use self::run::fit_advi;
pub use self::solver::{AdagradWindow, AdviState, ParameterConvergence};
