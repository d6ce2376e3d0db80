//! Unified error handling for inference routines.
//!
//! [`InferenceError`] is the convergence-error class: non-finite log
//! densities or gradients met while optimizing the variational objective or
//! simulating a Markov chain, invalid fit options, and failures passed up
//! from the optimization layer or the `argmin` executor. None of these are
//! retried; a failed fit yields no posterior.
use crate::optimization::errors::OptError;
use argmin::core::Error;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    // ---- Numerical instability ----
    /// The log density evaluated to NaN or ±∞.
    #[error("Inference Error: non-finite log density {value} during {stage}")]
    NonFiniteLogDensity { value: f64, stage: &'static str },

    /// A gradient entry evaluated to NaN or ±∞.
    #[error("Inference Error: non-finite gradient at index {index} ({value}) during {stage}")]
    NonFiniteGradient { index: usize, value: f64, stage: &'static str },

    /// The sampler could not find a usable initial step size.
    #[error("Inference Error: step size search failed ({reason})")]
    StepSizeSearch { reason: &'static str },

    // ---- Options ----
    /// A fit option is out of range.
    #[error("Inference Error: invalid option '{name}' = {value}: {reason}")]
    InvalidOption { name: &'static str, value: String, reason: &'static str },

    /// An enumerated option could not be parsed.
    #[error("Inference Error: unknown {kind} '{name}'; expected one of {expected}")]
    UnknownChoice { kind: &'static str, name: String, expected: &'static str },

    // ---- Passthrough ----
    /// Failure inside the optimization layer (model errors included).
    #[error("Inference Error: {0}")]
    Optimizer(#[from] OptError),
}

impl From<Error> for InferenceError {
    fn from(err: Error) -> Self {
        match err.downcast::<InferenceError>() {
            Ok(inference_err) => inference_err,
            Err(err) => InferenceError::Optimizer(OptError::from(err)),
        }
    }
}

impl From<crate::model::errors::ModelError> for InferenceError {
    fn from(err: crate::model::errors::ModelError) -> Self {
        InferenceError::Optimizer(OptError::Model(err))
    }
}

/// Reject a non-finite log density.
pub(crate) fn ensure_finite_value(value: f64, stage: &'static str) -> InferenceResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InferenceError::NonFiniteLogDensity { value, stage })
    }
}

/// Reject a gradient with any non-finite entry, reporting the first.
pub(crate) fn ensure_finite_grad(
    grad: &ndarray::Array1<f64>, stage: &'static str,
) -> InferenceResult<()> {
    match grad.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        Some((index, &value)) => Err(InferenceError::NonFiniteGradient { index, value, stage }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Errors boxed through argmin keep their identity, and non-finite
    // gradients name the first bad index.
    //
    // Given
    // -----
    // - A boxed `NonFiniteLogDensity`, a boxed `OptError::NonFiniteCost`,
    //   and the gradient [0, NaN, ∞].
    //
    // Expect
    // ------
    // - Round-trips to `NonFiniteLogDensity` and `Optimizer(NonFiniteCost)`.
    // - `NonFiniteGradient { index: 1 }`.
    fn errors_survive_argmin_boxing() {
        let boxed: Error =
            InferenceError::NonFiniteLogDensity { value: f64::NAN, stage: "advi" }.into();
        assert!(matches!(
            InferenceError::from(boxed),
            InferenceError::NonFiniteLogDensity { stage: "advi", .. }
        ));

        let boxed: Error = OptError::NonFiniteCost { value: 1.0 }.into();
        assert_eq!(
            InferenceError::from(boxed),
            InferenceError::Optimizer(OptError::NonFiniteCost { value: 1.0 })
        );

        let err = ensure_finite_grad(&array![0.0, f64::NAN, f64::INFINITY], "nuts").unwrap_err();
        assert!(matches!(err, InferenceError::NonFiniteGradient { index: 1, .. }));
    }
}
