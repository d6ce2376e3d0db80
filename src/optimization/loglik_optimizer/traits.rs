//! The density seam between the Shopper model and its fitters.
//!
//! [`LogDensity`] is what the model implements and what ADVI, the MCMC
//! samplers and the MAP search all consume. [`MapOptions`], [`Tolerances`]
//! and [`LineSearcher`] configure the MAP search; [`OptimOutcome`] is what
//! it returns.
//!
//! Gradients are always `∇ℓ(θ)` of the log density. Only the argmin adapter
//! sees the negated cost.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Unnormalized log density over an unconstrained parameter vector.
///
/// The model owns its data, so no payload travels with `θ`. Implementors
/// must be `Sync`: samplers evaluate the same density from several chains.
///
/// Required:
/// - `dim() -> usize`: length of `θ`.
/// - `value(&Theta) -> OptResult<Cost>`: evaluate `ℓ(θ)`.
/// - `check(&Theta) -> OptResult<()>`: reject obviously invalid `θ`.
///   Called once before optimization or sampling.
///
/// Optional:
/// - `grad(&Theta) -> OptResult<Grad>`: analytic gradient `∇ℓ(θ)`.
///   If not implemented, finite differences are used by the adapter.
pub trait LogDensity: Sync {
    // Required methods
    fn dim(&self) -> usize;
    fn value(&self, theta: &Theta) -> OptResult<Cost>;
    fn check(&self, theta: &Theta) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// L-BFGS line search. Parses case-insensitively from `"MoreThuente"` or
/// `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Settings for the MAP search that places the MCMC starting point.
///
/// `lbfgs_mem` is the L-BFGS history length (`None` keeps 7). `verbose`
/// only has an effect with the `obs_slog` feature.
///
/// The default stops at a gradient norm of `1e-6` or after 300 iterations,
/// using More-Thuente line search.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MapOptions {
    /// # Errors
    /// [`OptError::InvalidLBFGSMem`] for a zero history length.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(300) },
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules for the MAP search: gradient norm, cost change and an
/// iteration cap. At least one must be set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Result of `maximize`: the best unconstrained point and its log density.
///
/// `converged` is false only when argmin stopped without a termination
/// status; `grad_norm` is the norm of the last gradient it kept.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// # Errors
    /// A missing or non-finite `theta_hat`, or a non-finite `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            other => (true, format!("{other:?}")),
        };
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Line-search names parse case-insensitively; unknown names fail.
    //
    // Given
    // -----
    // - "hagerzhang", "MORETHUENTE", "bisection".
    //
    // Expect
    // ------
    // - The two known names parse; the third yields `InvalidLineSearch`.
    fn line_searcher_parses_case_insensitively() {
        assert_eq!("hagerzhang".parse::<LineSearcher>().unwrap(), LineSearcher::HagerZhang);
        assert_eq!("MORETHUENTE".parse::<LineSearcher>().unwrap(), LineSearcher::MoreThuente);
        assert!(matches!(
            "bisection".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Tolerances require at least one stopping rule and positive values.
    //
    // Given
    // -----
    // - All-`None` tolerances, a negative gradient tolerance, max_iter 0.
    //
    // Expect
    // ------
    // - `NoTolerancesProvided`, `InvalidTolGrad`, and `InvalidMaxIter`.
    fn tolerances_reject_empty_and_invalid_values() {
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(Some(-1.0), None, None),
            Err(OptError::InvalidTolGrad { .. })
        ));
        assert!(matches!(
            Tolerances::new(None, None, Some(0)),
            Err(OptError::InvalidMaxIter { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Outcomes classify termination and reject non-finite estimates.
    //
    // Given
    // -----
    // - A finite θ with `NotTerminated`, and a θ containing NaN.
    //
    // Expect
    // ------
    // - `converged == false` for the first; `InvalidThetaHat` for the second.
    fn outcome_validates_estimates() {
        let out = OptimOutcome::new(
            Some(array![1.0, 2.0]),
            -3.0,
            TerminationStatus::NotTerminated,
            4,
            FnEvalMap::new(),
            Some(array![3.0, 4.0]),
        )
        .unwrap();
        assert!(!out.converged);
        assert_eq!(out.grad_norm, Some(5.0));

        let bad = OptimOutcome::new(
            Some(array![f64::NAN]),
            0.0,
            TerminationStatus::NotTerminated,
            0,
            FnEvalMap::new(),
            None,
        );
        assert!(matches!(bad, Err(OptError::InvalidThetaHat { index: 0, .. })));
    }
}
