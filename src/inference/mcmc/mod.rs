//! mcmc — Markov chain Monte Carlo samplers.
//!
//! Purpose
//! -------
//! Draw from the posterior of a [`LogDensity`](crate::optimization::loglik_optimizer::LogDensity)
//! with one of three transition kernels, several chains in parallel.
//!
//! Key behaviors
//! -------------
//! - [`Nuts`]: No-U-Turn sampler, the default.
//! - [`Hmc`]: static-trajectory Hamiltonian Monte Carlo.
//! - [`Metropolis`]: Gaussian random walk with scale tuning.
//! - [`adaptation`] tunes the step size and diagonal mass of the
//!   Hamiltonian kernels during the discarded tuning phase.
//! - [`sample_chains`] seeds, starts, and runs the chains and collects a
//!   [`DrawSet`].
//!
//! Invariants & assumptions
//! ------------------------
//! - A chain's output depends only on the density, the options, and its
//!   seed; the thread it runs on does not matter.
//! - Non-finite densities or gradients abort the run. Large but finite
//!   energy errors are recorded as divergences instead.
//!
//! Downstream usage
//! ----------------
//! - `results` wraps [`DrawSet`] as the trace posterior and reads the
//!   per-draw energy for the E-BFMI diagnostic.

pub mod adaptation;
pub mod chains;
pub mod hamiltonian;
pub mod hmc;
pub mod metropolis;
pub mod nuts;
pub mod traits;

pub use self::chains::{Chain, DrawSet, sample_chains};
pub use self::hmc::Hmc;
pub use self::metropolis::Metropolis;
pub use self::nuts::Nuts;
pub use self::traits::{ChainRng, SamplerStats, Transition};
