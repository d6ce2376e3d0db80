//! Random-walk Metropolis with acceptance-rate scale tuning.
//!
//! Proposals are `q' = q + s · z`, `z ~ N(0, I)`. While tuning, the scale
//! `s` is rescaled every [`TUNE_INTERVAL`] iterations from the acceptance
//! rate observed over the interval.
use crate::{
    inference::{
        errors::InferenceResult,
        mcmc::{
            hamiltonian::Potential,
            traits::{ChainRng, SamplerStats, Transition},
        },
    },
    optimization::loglik_optimizer::{LogDensity, Theta},
};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

pub const TUNE_INTERVAL: usize = 100;

/// Scale multiplier for an interval acceptance rate.
pub fn tune_factor(acceptance: f64) -> f64 {
    match acceptance {
        a if a < 0.001 => 0.1,
        a if a < 0.05 => 0.5,
        a if a < 0.2 => 0.9,
        a if a > 0.95 => 10.0,
        a if a > 0.75 => 2.0,
        a if a > 0.5 => 1.1,
        _ => 1.0,
    }
}

pub struct Metropolis<'a, F: LogDensity> {
    potential: Potential<'a, F>,
    scale: f64,
    tune: usize,
    accepted: usize,
    q: Theta,
    logp: f64,
}

impl<'a, F: LogDensity> Metropolis<'a, F> {
    pub fn new(f: &'a F, scale: f64, tune: usize, q0: Theta) -> InferenceResult<Self> {
        let potential = Potential::new(f, "metropolis");
        let logp = potential.value(&q0)?;
        Ok(Metropolis { potential, scale, tune, accepted: 0, q: q0, logp })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl<'a, F: LogDensity> Transition for Metropolis<'a, F> {
    fn name(&self) -> &'static str {
        "Metropolis"
    }

    fn step(&mut self, iter: usize, rng: &mut ChainRng) -> InferenceResult<SamplerStats> {
        let used_scale = self.scale;
        let proposal = self.q.mapv(|x| {
            let z: f64 = rng.sample(StandardNormal);
            x + used_scale * z
        });
        let logp = self.potential.value(&proposal)?;
        let accept_stat = (logp - self.logp).exp().min(1.0);
        if rng.gen::<f64>() < accept_stat {
            self.q = proposal;
            self.logp = logp;
            self.accepted += 1;
        }

        if iter < self.tune && (iter + 1) % TUNE_INTERVAL == 0 {
            let rate = self.accepted as f64 / TUNE_INTERVAL as f64;
            self.scale *= tune_factor(rate);
            debug!(iteration = iter, acceptance = rate, scale = self.scale, "Metropolis tuning");
        }
        if (iter + 1) % TUNE_INTERVAL == 0 {
            self.accepted = 0;
        }
        Ok(SamplerStats {
            energy: None,
            step_size: used_scale,
            tree_depth: 0,
            n_steps: 1,
            accept_stat,
            diverging: false,
        })
    }

    fn position(&self) -> &Theta {
        &self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::mcmc::test_support::{StdNormal, moments};
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    // Purpose
    // -------
    // The tuning table matches the documented acceptance bands.
    //
    // Given
    // -----
    // - Acceptance rates across every band.
    //
    // Expect
    // ------
    // - Factors 0.1, 0.5, 0.9, 1, 1.1, 2, 10.
    fn tune_factor_bands() {
        let cases = [
            (0.0, 0.1),
            (0.01, 0.5),
            (0.1, 0.9),
            (0.3, 1.0),
            (0.6, 1.1),
            (0.8, 2.0),
            (0.99, 10.0),
        ];
        for (rate, factor) in cases {
            assert_eq!(tune_factor(rate), factor, "rate {rate}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Tuning shrinks an oversized proposal, and the chain targets N(0, 1).
    //
    // Given
    // -----
    // - 1-d standard normal, initial scale 50, 2000 tuning and 20 000 kept
    //   draws.
    //
    // Expect
    // ------
    // - Final scale below 50; no energy recorded.
    // - Mean within 0.15 of 0, variance within 0.25 of 1.
    fn tunes_and_samples() {
        let f = StdNormal(1);
        let mut rng = ChainRng::seed_from_u64(9);
        let tune = 2000;
        let mut mh = Metropolis::new(&f, 50.0, tune, array![0.0]).unwrap();
        let mut draws = Vec::new();
        for iter in 0..tune + 20_000 {
            let stats = mh.step(iter, &mut rng).unwrap();
            if iter >= tune {
                assert!(stats.energy.is_none());
                draws.push(mh.position().clone());
            }
        }
        assert!(mh.scale() < 50.0);
        let (mean, var) = moments(&draws);
        assert!(mean[0].abs() < 0.15, "mean = {mean}");
        assert!((var[0] - 1.0).abs() < 0.25, "var = {var}");
    }
}
