//! results — what a fit hands back to the caller.
//!
//! Purpose
//! -------
//! Hold the fitted [`Posterior`] next to its model and serve the views a
//! caller inspects after fitting: the summary table, the trace, convergence
//! and energy diagnostics, the ELBO history, and posterior-predictive
//! probabilities.
//!
//! Key behaviors
//! -------------
//! - [`ShopperResults`] checks the posterior kind at every accessor and
//!   fails with [`UsageError`] on a mismatch.
//! - [`diagnostics`] implements split R̂, bulk ESS, HDI and E-BFMI on plain
//!   per-chain sequences.
//! - [`summary`] assembles the per-parameter table.
//!
//! Conventions
//! -----------
//! - Reported values are in model space; the posterior itself stays in the
//!   unconstrained space the engines work in.

pub mod accessor;
pub mod diagnostics;
pub mod errors;
pub mod posterior;
pub mod predict;
pub mod summary;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::accessor::ShopperResults;
pub use self::diagnostics::{ChainEnergy, TraceView};
pub use self::errors::{UsageError, UsageResult};
pub use self::posterior::Posterior;
pub use self::summary::{Summary, SummaryRow};

pub mod prelude {
    pub use super::accessor::ShopperResults;
    pub use super::errors::{UsageError, UsageResult};
    pub use super::posterior::Posterior;
    pub use super::summary::Summary;
}
