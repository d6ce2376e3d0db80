//! Usage errors of the results accessor.
//!
//! [`UsageError`] is raised when an accessor is called on a posterior kind
//! that cannot serve it, or with arguments that kind requires but were not
//! given. Nothing here is numerical; a usage error never invalidates the
//! posterior.

pub type UsageResult<T> = Result<T, UsageError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// An approximation must be sampled, so a draw count is mandatory.
    #[error("Usage Error: '{operation}' on a variational approximation requires a draw count")]
    DrawsRequired { operation: &'static str },

    /// A draw count of zero was requested.
    #[error("Usage Error: '{operation}' needs at least one draw, got {draws}")]
    ZeroDraws { operation: &'static str, draws: usize },

    #[error("Usage Error: '{operation}' is only available for sampling posteriors")]
    NotSampled { operation: &'static str },

    #[error("Usage Error: '{operation}' is only available for variational posteriors")]
    NotVariational { operation: &'static str },

    /// The trace was fitted without the rich representation.
    #[error("Usage Error: '{operation}' needs per-draw sampler statistics; refit with the rich trace")]
    NoSamplerStats { operation: &'static str },

    /// The step method does not define an energy.
    #[error("Usage Error: the '{step}' step method records no energy")]
    EnergyUnavailable { step: &'static str },

    /// Prediction input does not match the fitted model.
    #[error("Usage Error: parameter draws have length {found}, the model expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}
