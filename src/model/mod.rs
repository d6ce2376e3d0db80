//! model — the Shopper probabilistic choice model.
//!
//! Purpose
//! -------
//! Declare the six latent tensors, their priors, the utility function that
//! combines them with basket order and price, and the per-row choice
//! likelihood, as one explicit graph object ([`ShopperModel`]) that inference
//! can evaluate any number of times.
//!
//! Key behaviors
//! -------------
//! - [`ShopperConfig`] carries hyperparameters and optional declared counts.
//! - [`ParamLayout`] maps the tensors into a flat unconstrained vector; the
//!   price-sensitivity tensors live in log space.
//! - [`utility`] computes baseline and combined utilities and the
//!   basket-context recurrence.
//! - [`ShopperModel`] evaluates the log joint density and its analytic
//!   gradient, in parallel over baskets.
//!
//! Conventions
//! -----------
//! - Configuration and dimension problems are [`ModelError`]s.
//!
//! Downstream usage
//! ----------------
//! - `inference` sees the model only through `LogDensity`; `results` uses
//!   the layout for parameter names and `probabilities_for` for prediction.

pub mod config;
pub mod errors;
pub mod layout;
pub mod priors;
pub mod shopper;
pub mod utility;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::config::ShopperConfig;
pub use self::errors::{ModelError, ModelResult};
pub use self::layout::{Latent, LatentHandle, ParamLayout};
pub use self::priors::Prior;
pub use self::shopper::ShopperModel;
pub use self::utility::{CandidatePrices, LatentValues};

pub mod prelude {
    pub use super::config::ShopperConfig;
    pub use super::errors::{ModelError, ModelResult};
    pub use super::layout::Latent;
    pub use super::shopper::ShopperModel;
}
