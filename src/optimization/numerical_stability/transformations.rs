//! Numerical stability utilities.
//!
//! Provides safe implementations of common nonlinear transforms
//! that are prone to overflow/underflow in naïve form, using explicit
//! cutoffs (`x > 20.0`) to keep `f64` arithmetic in a well-conditioned regime.
//!
//! # Provided items
//! - [`safe_softplus(x)`]: stable `ln(1 + exp(x))`, ℝ → (0, ∞).
//! - [`safe_softplus_inv(x)`]: inverse of softplus, (0, ∞) → ℝ.
//! - [`safe_logistic(x)`]: stable `1 / (1 + exp(-x))`, the softplus derivative.
//! - [`log_sum_exp(xs)`]: max-shifted `ln Σ exp(x_i)`.
//! - [`softmax_in_place(xs)`]: overwrite utilities with choice probabilities.
use ndarray::{ArrayBase, ArrayViewMut1, Data, Ix1};

/// Lower bound applied to standard deviations derived from softplus.
pub const MIN_SCALE: f64 = 1e-12;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// - For `x > 20`, `softplus(x) ≈ x`.
/// - Otherwise `ln1p(exp(x))`, which stays accurate for large negative `x`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Stable inverse of softplus on `(0, ∞)`: `t = ln(exp(x) - 1)`.
///
/// - For `x > 20`, `t ≈ x`.
/// - Otherwise `ln(expm1(x))`.
///
/// `x` must be finite and `> 0`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// Numerically stable logistic function `σ(x) = 1 / (1 + exp(-x))`.
///
/// Branches on the sign of `x` so that `exp` is only ever taken of a
/// non-positive argument.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `ln Σ exp(x_i)` with a max shift.
///
/// Returns `-∞` for an empty input or when every entry is `-∞`; a `NaN`
/// anywhere propagates.
pub fn log_sum_exp<S>(xs: &ArrayBase<S, Ix1>) -> f64
where
    S: Data<Elem = f64>,
{
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if xs.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    max + xs.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}

/// Replace `xs` by `softmax(xs)` and return the log normalizer.
///
/// The returned value is `log_sum_exp(xs)` of the input, so callers can
/// recover `ln p_c = x_c − lse` without a second pass.
pub fn softmax_in_place(mut xs: ArrayViewMut1<f64>) -> f64 {
    let lse = log_sum_exp(&xs);
    xs.mapv_inplace(|v| (v - lse).exp());
    lse
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    // Purpose
    // -------
    // Softplus and its inverse round-trip on both sides of the cutoff.
    //
    // Given
    // -----
    // - x in {-5, 0.1, 3, 25}.
    //
    // Expect
    // ------
    // - `safe_softplus_inv(safe_softplus(x)) ≈ x`.
    fn softplus_round_trips_across_cutoff() {
        for x in [-5.0, 0.1, 3.0, 25.0] {
            assert!((safe_softplus_inv(safe_softplus(x)) - x).abs() < 1e-9, "x = {x}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Logistic is the derivative of softplus and stays finite in the tails.
    //
    // Given
    // -----
    // - x in {-800, -2, 0, 2, 800}.
    //
    // Expect
    // ------
    // - Finite output in [0, 1]; σ(0) = 0.5; central difference of softplus
    //   matches σ at moderate x.
    fn logistic_is_stable_and_matches_softplus_slope() {
        for x in [-800.0, -2.0, 0.0, 2.0, 800.0] {
            let s = safe_logistic(x);
            assert!(s.is_finite() && (0.0..=1.0).contains(&s));
        }
        assert_eq!(safe_logistic(0.0), 0.5);
        let h = 1e-6;
        for x in [-2.0, 0.5, 2.0] {
            let slope = (safe_softplus(x + h) - safe_softplus(x - h)) / (2.0 * h);
            assert!((slope - safe_logistic(x)).abs() < 1e-6);
        }
    }

    #[test]
    // Purpose
    // -------
    // Softmax of large utilities neither overflows nor loses mass.
    //
    // Given
    // -----
    // - Utilities [1000, 1001, 999].
    //
    // Expect
    // ------
    // - Probabilities sum to 1; the returned normalizer is ≈ 1001.4076.
    fn softmax_sums_to_one_for_large_inputs() {
        let mut u: Array1<f64> = array![1000.0, 1001.0, 999.0];
        let lse = softmax_in_place(u.view_mut());
        assert!((u.sum() - 1.0).abs() < 1e-12);
        assert!((lse - 1001.407_605_964_444).abs() < 1e-9);
        assert_eq!(log_sum_exp(&Array1::<f64>::zeros(0)), f64::NEG_INFINITY);
    }
}
