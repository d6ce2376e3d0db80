//! Checks shared by the MAP optimizer and its options.
//!
//! - Tolerances ([`verify_tol_grad`], [`verify_tol_cost`]) are optional, but
//!   when present must be finite and strictly positive.
//! - Gradients ([`validate_grad`]) must match the problem dimension and be
//!   finite everywhere.
//! - Results ([`validate_theta_hat`], [`validate_value`]) must exist and be
//!   finite before they are handed to a sampler as a starting point.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta},
};
use ndarray::Array1;

/// Position and value of the first non-finite entry.
fn first_non_finite(values: &Array1<f64>) -> Option<(usize, f64)> {
    values.iter().copied().enumerate().find(|(_, v)| !v.is_finite())
}

fn tolerance_reason(tol: f64) -> Option<&'static str> {
    if !tol.is_finite() {
        Some("Tolerance must be finite.")
    } else if tol <= 0.0 {
        Some("Tolerance must be positive.")
    } else {
        None
    }
}

/// # Errors
/// [`OptError::InvalidTolGrad`] for a non-finite or non-positive value.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| tolerance_reason(t).map(|r| (t, r))) {
        Some((tol, reason)) => Err(OptError::InvalidTolGrad { tol, reason }),
        None => Ok(()),
    }
}

/// # Errors
/// [`OptError::InvalidTolCost`] for a non-finite or non-positive value.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| tolerance_reason(t).map(|r| (t, r))) {
        Some((tol, reason)) => Err(OptError::InvalidTolCost { tol, reason }),
        None => Ok(()),
    }
}

/// # Errors
/// - [`OptError::GradientDimMismatch`] if `grad.len() != dim`.
/// - [`OptError::InvalidGradient`] for the first non-finite entry.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match first_non_finite(grad) {
        Some((index, value)) => Err(OptError::InvalidGradient {
            index,
            value,
            reason: "Gradient elements must be finite.",
        }),
        None => Ok(()),
    }
}

/// Unwrap the optimizer's best parameter vector.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if the solver produced none.
/// - [`OptError::InvalidThetaHat`] for the first non-finite entry.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    if let Some((index, value)) = first_non_finite(&theta) {
        return Err(OptError::InvalidThetaHat {
            index,
            value,
            reason: "Parameter estimates must be finite.",
        });
    }
    Ok(theta)
}

/// # Errors
/// [`OptError::NonFiniteCost`] if the log density is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if value.is_finite() { Ok(()) } else { Err(OptError::NonFiniteCost { value }) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Gradient validation reports the first offending entry.
    //
    // Given
    // -----
    // - A length-3 gradient with `+∞` at index 1, and a length mismatch.
    //
    // Expect
    // ------
    // - `InvalidGradient { index: 1 }` and `GradientDimMismatch`.
    fn validate_grad_reports_first_bad_entry() {
        let g = array![0.0, f64::INFINITY, f64::NAN];
        assert!(matches!(validate_grad(&g, 3), Err(OptError::InvalidGradient { index: 1, .. })));
        assert_eq!(
            validate_grad(&g, 2),
            Err(OptError::GradientDimMismatch { expected: 2, found: 3 })
        );
    }

    #[test]
    // Purpose
    // -------
    // Tolerances are optional but must be positive and finite when given.
    //
    // Given
    // -----
    // - `None`, `Some(1e-6)`, `Some(0.0)` and `Some(NaN)`.
    //
    // Expect
    // ------
    // - The first two pass; zero is "positive"-rejected, NaN "finite"-rejected.
    fn tolerances_must_be_positive_and_finite() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_cost(Some(1e-6)).is_ok());
        assert_eq!(
            verify_tol_cost(Some(0.0)),
            Err(OptError::InvalidTolCost { tol: 0.0, reason: "Tolerance must be positive." })
        );
        assert!(matches!(
            verify_tol_grad(Some(f64::NAN)),
            Err(OptError::InvalidTolGrad { reason: "Tolerance must be finite.", .. })
        ));
        assert!(validate_theta_hat(None).is_err());
        assert!(validate_value(f64::NEG_INFINITY).is_err());
    }
}
