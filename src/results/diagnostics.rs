//! Posterior diagnostics on per-chain draw sequences.
//!
//! Purpose
//! -------
//! Convergence and efficiency statistics for one scalar parameter observed
//! across chains, plus the energy diagnostic of Hamiltonian samplers.
//!
//! Key behaviors
//! -------------
//! - [`split_rhat`]: rank-normalized split R̂, the larger of the bulk and
//!   folded-tail values.
//! - [`ess_bulk`]: bulk effective sample size from rank-normalized split
//!   chains, autocorrelations truncated with Geyer's initial monotone
//!   sequence.
//! - [`hdi`]: narrowest interval containing a given posterior mass.
//! - [`ebfmi`]: energy Bayesian fraction of missing information.
//!
//! Invariants & assumptions
//! ------------------------
//! - All chains passed together have the same length.
//! - Fewer than four draws per chain, non-finite values, or zero variance
//!   yield `NaN` rather than an error.
//!
//! Conventions
//! -----------
//! - Splitting halves each chain; an odd middle draw is dropped.
//! - Ranks are average ranks over all pooled draws, mapped to normal scores
//!   with `Φ⁻¹((r - 3/8) / (S + 1/4))`.
use ndarray::{Array1, Array3, ArrayView1, ArrayView2};
use serde::Serialize;
use statrs::{
    distribution::{ContinuousCDF, Normal},
    statistics::{Data, Median, Statistics},
};

const MIN_DRAWS: usize = 4;

// ---- Chain preparation ----

fn split_chains(chains: &[ArrayView1<f64>]) -> Vec<Vec<f64>> {
    chains
        .iter()
        .flat_map(|c| {
            let half = c.len() / 2;
            let n = c.len();
            [c.iter().take(half).copied().collect(), c.iter().skip(n - half).copied().collect()]
        })
        .collect()
}

fn valid(chains: &[Vec<f64>]) -> bool {
    chains.iter().all(|c| c.len() >= MIN_DRAWS / 2 && c.iter().all(|v| v.is_finite()))
        && !chains.is_empty()
}

/// Replace every value by its normal score among all pooled values.
fn z_scale(chains: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut pooled: Vec<(f64, usize, usize)> = chains
        .iter()
        .enumerate()
        .flat_map(|(c, xs)| xs.iter().enumerate().map(move |(i, &x)| (x, c, i)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    let size = pooled.len() as f64;
    let mut out: Vec<Vec<f64>> = chains.iter().map(|c| vec![0.0; c.len()]).collect();
    let normal = match Normal::new(0.0, 1.0) {
        Ok(n) => n,
        Err(_) => return out,
    };
    let mut start = 0;
    while start < pooled.len() {
        let mut end = start + 1;
        while end < pooled.len() && pooled[end].0 == pooled[start].0 {
            end += 1;
        }
        // Average 1-based rank of the tie group.
        let rank = (start + end + 1) as f64 / 2.0;
        let z = normal.inverse_cdf((rank - 0.375) / (size + 0.25));
        for &(_, c, i) in &pooled[start..end] {
            out[c][i] = z;
        }
        start = end;
    }
    out
}

// ---- R-hat ----

fn rhat_raw(chains: &[Vec<f64>]) -> f64 {
    let n = chains[0].len() as f64;
    let means: Vec<f64> = chains.iter().map(|c| c.iter().mean()).collect();
    let within = chains.iter().map(|c| c.iter().variance()).collect::<Vec<f64>>().iter().mean();
    let between = n * means.iter().variance();
    if !(within > 0.0) {
        return f64::NAN;
    }
    ((between / within + n - 1.0) / n).sqrt()
}

/// Rank-normalized split R̂ of one parameter across `chains`.
pub fn split_rhat(chains: &[ArrayView1<f64>]) -> f64 {
    let split = split_chains(chains);
    if !valid(&split) {
        return f64::NAN;
    }
    let bulk = rhat_raw(&z_scale(&split));
    let median = Data::new(split.iter().flatten().copied().collect::<Vec<f64>>()).median();
    let folded: Vec<Vec<f64>> =
        split.iter().map(|c| c.iter().map(|x| (x - median).abs()).collect()).collect();
    let tail = rhat_raw(&z_scale(&folded));
    bulk.max(tail)
}

// ---- ESS ----

/// Biased autocovariance of `x` at `lag`.
fn autocov(x: &[f64], mean: f64, lag: usize) -> f64 {
    let n = x.len();
    let sum: f64 = (0..n - lag).map(|i| (x[i] - mean) * (x[i + lag] - mean)).sum();
    sum / n as f64
}

fn ess_raw(chains: &[Vec<f64>]) -> f64 {
    let m = chains.len();
    let n = chains[0].len();
    let means: Vec<f64> = chains.iter().map(|c| c.iter().mean()).collect();
    let mean_acov = |lag: usize| {
        chains.iter().zip(&means).map(|(c, &mu)| autocov(c, mu, lag)).sum::<f64>() / m as f64
    };

    let nf = n as f64;
    let mean_var = mean_acov(0) * nf / (nf - 1.0);
    let mut var_plus = mean_var * (nf - 1.0) / nf;
    if m > 1 {
        var_plus += means.iter().variance();
    }
    if !(var_plus > 0.0) {
        return f64::NAN;
    }

    let mut rho = vec![0.0; n];
    rho[0] = 1.0;
    let mut rho_even = 1.0;
    let mut rho_odd = 1.0 - (mean_var - mean_acov(1)) / var_plus;
    rho[1] = rho_odd;
    let mut t = 1;
    while t < n - 3 && rho_even + rho_odd > 0.0 {
        rho_even = 1.0 - (mean_var - mean_acov(t + 1)) / var_plus;
        rho_odd = 1.0 - (mean_var - mean_acov(t + 2)) / var_plus;
        if rho_even + rho_odd >= 0.0 {
            rho[t + 1] = rho_even;
            rho[t + 2] = rho_odd;
        }
        t += 2;
    }
    // `max_t` is -1 when no lag pair was accepted.
    let max_t = t as isize - 2;
    let last = (max_t + 1) as usize;
    if rho_even > 0.0 {
        rho[last] = rho_even;
    }

    // Initial monotone sequence.
    let mut t = 1;
    while (t as isize) <= max_t - 2 {
        if rho[t + 1] + rho[t + 2] > rho[t - 1] + rho[t] {
            rho[t + 1] = (rho[t - 1] + rho[t]) / 2.0;
            rho[t + 2] = rho[t + 1];
        }
        t += 2;
    }

    let total = (m * n) as f64;
    let tau = -1.0 + 2.0 * rho[..last].iter().sum::<f64>() + rho[last];
    let tau = tau.max(1.0 / total.log10());
    total / tau
}

/// Bulk effective sample size of one parameter across `chains`.
pub fn ess_bulk(chains: &[ArrayView1<f64>]) -> f64 {
    let split = split_chains(chains);
    if !valid(&split) || split[0].len() < MIN_DRAWS {
        return f64::NAN;
    }
    ess_raw(&z_scale(&split))
}

// ---- Intervals ----

/// Highest-density interval with mass `prob` of a sample.
///
/// Returns `(NaN, NaN)` for an empty or non-finite sample.
pub fn hdi(values: &[f64], prob: f64) -> (f64, f64) {
    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        return (f64::NAN, f64::NAN);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let inc = (prob * n as f64).floor() as usize;
    let n_intervals = n - inc;
    let best = (0..n_intervals)
        .min_by(|&a, &b| (sorted[a + inc] - sorted[a]).total_cmp(&(sorted[b + inc] - sorted[b])))
        .unwrap_or(0);
    (sorted[best], sorted[best + inc])
}

// ---- Energy ----

/// E-BFMI of one chain's energy sequence.
pub fn ebfmi(energy: &[f64]) -> f64 {
    if energy.len() < 2 {
        return f64::NAN;
    }
    let num: f64 = energy.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    let denom = energy.iter().variance() * (energy.len() - 1) as f64;
    if denom > 0.0 { num / denom } else { f64::NAN }
}

/// Energy diagnostic of one chain.
///
/// - `marginal`: centred energy `E - Ē`.
/// - `transition`: energy changes `E_t - E_{t-1}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainEnergy {
    pub energy: Vec<f64>,
    pub marginal: Vec<f64>,
    pub transition: Vec<f64>,
    pub bfmi: f64,
}

impl ChainEnergy {
    pub fn new(energy: Vec<f64>) -> ChainEnergy {
        let mean = energy.iter().mean();
        let marginal = energy.iter().map(|e| e - mean).collect();
        let transition = energy.windows(2).map(|w| w[1] - w[0]).collect();
        let bfmi = ebfmi(&energy);
        ChainEnergy { energy, marginal, transition, bfmi }
    }
}

// ---- Trace view ----

/// Constrained draws laid out `parameter × chain × draw`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceView {
    pub names: Vec<String>,
    pub values: Array3<f64>,
}

impl TraceView {
    /// Stack per-chain `draws × parameters` matrices.
    pub fn from_chains(names: Vec<String>, chains: &[ArrayView2<f64>]) -> TraceView {
        let n_chains = chains.len();
        let n_draws = chains.first().map_or(0, |c| c.nrows());
        let dim = names.len();
        let mut values = Array3::<f64>::zeros((dim, n_chains, n_draws));
        for (c, chain) in chains.iter().enumerate() {
            for (d, row) in chain.rows().into_iter().enumerate() {
                for (p, &x) in row.iter().enumerate().take(dim) {
                    values[[p, c, d]] = x;
                }
            }
        }
        TraceView { names, values }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// `chain × draw` array of one parameter.
    pub fn get(&self, name: &str) -> Option<ArrayView2<'_, f64>> {
        self.index_of(name).map(|p| self.values.index_axis(ndarray::Axis(0), p))
    }

    /// Per-chain sequences of parameter `p`.
    pub fn chains_of(&self, p: usize) -> Vec<ArrayView1<'_, f64>> {
        let block = self.values.index_axis(ndarray::Axis(0), p);
        (0..block.nrows()).map(|c| block.index_axis_move(ndarray::Axis(0), c)).collect()
    }

    /// Split R̂ for every parameter, in name order.
    pub fn rhat(&self) -> Array1<f64> {
        (0..self.names.len()).map(|p| split_rhat(&self.chains_of(p))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};
    use rand::SeedableRng;
    use rand_distr::{Distribution, StandardNormal};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn white_noise(seed: u64, n: usize, shift: f64) -> Array1<f64> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        (0..n).map(|_| shift + Distribution::<f64>::sample(&StandardNormal, &mut rng)).collect()
    }

    #[test]
    // Purpose
    // -------
    // Well-mixed chains give R̂ ≈ 1 and ESS near the draw count; shifted
    // chains are flagged.
    //
    // Given
    // -----
    // - Four chains of 500 iid N(0, 1) draws; and the same with one chain
    //   shifted by +3.
    //
    // Expect
    // ------
    // - R̂ < 1.02 and ESS > 1000 for iid chains.
    // - R̂ > 1.2 when one chain is shifted.
    fn rhat_and_ess_on_white_noise() {
        let chains: Vec<Array1<f64>> = (0..4).map(|s| white_noise(s, 500, 0.0)).collect();
        let views: Vec<_> = chains.iter().map(|c| c.view()).collect();
        let rhat = split_rhat(&views);
        let ess = ess_bulk(&views);
        assert!(rhat < 1.02, "rhat = {rhat}");
        assert!(ess > 1000.0, "ess = {ess}");

        let mut shifted = chains.clone();
        shifted[0] += 3.0;
        let views: Vec<_> = shifted.iter().map(|c| c.view()).collect();
        assert!(split_rhat(&views) > 1.2);
    }

    #[test]
    // Purpose
    // -------
    // Strong autocorrelation lowers the ESS.
    //
    // Given
    // -----
    // - One AR(1) chain with coefficient 0.9 and 2000 draws.
    //
    // Expect
    // ------
    // - ESS well below 2000 / 5.
    fn ess_drops_with_autocorrelation() {
        let noise = white_noise(9, 2000, 0.0);
        let mut x = Array1::<f64>::zeros(2000);
        for t in 1..2000 {
            x[t] = 0.9 * x[t - 1] + noise[t];
        }
        let ess = ess_bulk(&[x.view()]);
        assert!(ess < 400.0, "ess = {ess}");
    }

    #[test]
    // Purpose
    // -------
    // The HDI is the narrowest window holding the requested mass, and
    // degenerate inputs are NaN.
    //
    // Given
    // -----
    // - Values 0..=9 with one outlier at 100 replacing 9; prob 0.8.
    // - Three draws for R̂.
    //
    // Expect
    // ------
    // - HDI (0, 8).
    // - R̂ of a 3-draw chain is NaN.
    fn hdi_and_degenerate_cases() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 100.0];
        assert_eq!(hdi(&values, 0.8), (0.0, 8.0));
        assert!(split_rhat(&[array![1.0, 2.0, 3.0].view()]).is_nan());
    }

    #[test]
    // Purpose
    // -------
    // E-BFMI is large for independent energies and small for a random walk.
    //
    // Given
    // -----
    // - 2000 iid N(0, 1) energies; and their cumulative sum.
    //
    // Expect
    // ------
    // - iid: E-BFMI ≈ 2 (between 1.7 and 2.3).
    // - random walk: E-BFMI < 0.1.
    fn ebfmi_separates_mixing_regimes() {
        let e = white_noise(4, 2000, 0.0);
        let iid = ebfmi(e.as_slice().unwrap());
        assert!(iid > 1.7 && iid < 2.3, "bfmi = {iid}");

        let mut walk = e.to_vec();
        for t in 1..walk.len() {
            walk[t] += walk[t - 1];
        }
        assert!(ebfmi(&walk) < 0.1);

        let energy = ChainEnergy::new(vec![1.0, 3.0, 2.0]);
        assert_eq!(energy.transition, vec![2.0, -1.0]);
        assert!((energy.marginal.iter().sum::<f64>()).abs() < 1e-12);
    }
}
