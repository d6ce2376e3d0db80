//! Adapter that exposes a [`LogDensity`] as an `argmin` problem.
//!
//! We convert a *maximization* of a log density `ℓ(θ)` into a *minimization*
//! problem by defining the cost as `c(θ) = -ℓ(θ)`. Analytic gradients (if
//! provided) are negated accordingly. If a gradient is not provided, we
//! finite-difference the **cost** closure, so no sign flip is needed in that
//! branch.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        traits::LogDensity,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Bridges a [`LogDensity`] to `argmin`'s `CostFunction` and `Gradient`.
///
/// - `CostFunction::cost` returns `-ℓ(θ)`.
/// - `Gradient::gradient` returns:
///   - `-∇ℓ(θ)` if the density provides an analytic gradient, or
///   - a finite-difference gradient of the cost (no sign flip needed).
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogDensity> {
    pub f: &'a F,
}

impl<'a, F: LogDensity> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F) -> Self {
        Self { f }
    }
}

impl<'a, F: LogDensity> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate the cost `c(θ) = -ℓ(θ)`.
    ///
    /// # Errors
    /// - Propagates any `OptError` from `value`.
    /// - `NonFiniteCost` if `ℓ(θ)` is not finite.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogDensity> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate the gradient of the cost at `θ`.
    ///
    /// Without an analytic gradient, central differences are tried first;
    /// if any cost evaluation fails or the result does not validate, a
    /// forward difference is taken instead. The FD closure cannot return
    /// `Result`, so the first error is parked in `closure_err` and the
    /// closure yields `NaN`.
    ///
    /// # Errors
    /// - Propagates errors from `grad` other than `GradientNotImplemented`.
    /// - Propagates cost-evaluation errors captured during FD.
    /// - Returns validation errors for wrong dimension or non-finite entries.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = theta.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                run_fd_diff(theta, &cost_func, &closure_err)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Forward-difference gradient of `func` at `theta`, with error capture.
///
/// # Errors
/// Returns any error captured while evaluating `func`, or the validation
/// error of the resulting gradient.
fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> Result<Grad, Error> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use ndarray::array;

    struct Quadratic {
        analytic: bool,
    }

    impl LogDensity for Quadratic {
        fn dim(&self) -> usize {
            2
        }
        fn value(&self, theta: &Theta) -> OptResult<f64> {
            Ok(-(theta[0] - 1.0).powi(2) - 2.0 * (theta[1] + 0.5).powi(2))
        }
        fn check(&self, _theta: &Theta) -> OptResult<()> {
            Ok(())
        }
        fn grad(&self, theta: &Theta) -> OptResult<Grad> {
            if self.analytic {
                Ok(array![-2.0 * (theta[0] - 1.0), -4.0 * (theta[1] + 0.5)])
            } else {
                Err(OptError::GradientNotImplemented)
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Cost and gradient carry the sign flip, and the FD fallback agrees with
    // the analytic path.
    //
    // Given
    // -----
    // - ℓ(θ) = -(θ₀ − 1)² − 2(θ₁ + 0.5)² at θ = [0, 0].
    //
    // Expect
    // ------
    // - cost = 1.5; cost gradient ≈ [-2, 2] for both paths.
    fn adapter_flips_sign_and_falls_back_to_fd() {
        let theta = array![0.0, 0.0];
        for analytic in [true, false] {
            let model = Quadratic { analytic };
            let adapter = ArgMinAdapter::new(&model);
            assert!((adapter.cost(&theta).unwrap() - 1.5).abs() < 1e-12);
            let g = adapter.gradient(&theta).unwrap();
            assert!((g[0] + 2.0).abs() < 1e-5 && (g[1] - 2.0).abs() < 1e-5, "analytic={analytic}");
        }
    }
}
