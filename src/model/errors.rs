//! Errors for model construction and parameter-vector handling.
//!
//! [`ModelError`] is the dimension-error class: hyperparameters that cannot
//! size the latent tensors, priors with invalid parameters, declared entity
//! counts that disagree with the encoded data, and parameter vectors whose
//! length or contents do not fit the model's layout.
//!
//! ## Conventions
//! - Indices into a flat parameter vector are 0-based.
//! - Tensor names are the short latent names (`rho`, `alpha`, `theta`,
//!   `lambda`, `gamma`, `beta`).

/// Result alias for model-layer operations that may produce [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    // ---- Hyperparameters ----
    /// A latent dimension (`k`, `price_dim`) is zero.
    #[error("Hyperparameter '{name}' must be at least 1; got {value}")]
    ZeroDimension { name: &'static str, value: usize },

    /// Prior hyperparameters must be finite and strictly positive.
    #[error("Hyperparameter '{name}' is invalid ({value}): {reason}")]
    InvalidHyperparameter { name: &'static str, value: f64, reason: &'static str },

    /// The prior distribution rejected its parameters.
    #[error("Invalid prior for '{name}': {reason}")]
    InvalidPrior { name: &'static str, reason: String },

    /// A configuration document could not be read or parsed.
    #[error("Invalid model configuration: {reason}")]
    InvalidConfig { reason: String },

    // ---- Data / declared shapes ----
    /// Declared number of users or items differs from the encoded data.
    #[error("Declared {entity} count {declared} does not match {observed} observed in the data")]
    CountMismatch { entity: &'static str, declared: usize, observed: usize },

    /// The model needs at least one observation row.
    #[error("Cannot build a model without observations")]
    NoObservations,

    // ---- Parameter vectors ----
    /// Flat parameter vector length does not match the layout.
    #[error("Parameter vector length mismatch: expected {expected}, found {found}")]
    ThetaLengthMismatch { expected: usize, found: usize },

    /// Parameter vector entries must be finite.
    #[error("Parameter vector entry {index} is not finite: {value}")]
    NonFiniteTheta { index: usize, value: f64 },

    /// A tensor view could not be formed from the flat vector.
    #[error("Cannot view '{name}' with shape {rows}x{cols}: {reason}")]
    TensorShape { name: &'static str, rows: usize, cols: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Make sure count mismatches render both sides of the comparison.
    //
    // Given
    // -----
    // - A `CountMismatch` for items, declared 5 vs observed 3.
    //
    // Expect
    // ------
    // - The message names the entity and both counts.
    fn count_mismatch_message_names_both_counts() {
        let msg =
            ModelError::CountMismatch { entity: "item", declared: 5, observed: 3 }.to_string();
        assert!(msg.contains("item") && msg.contains('5') && msg.contains('3'));
    }
}
