//! Static-trajectory Hamiltonian Monte Carlo.
//!
//! Each transition integrates a fixed number of leapfrog steps with the step
//! size jittered uniformly in `[0.85, 1.15] · ε`, and accepts the endpoint
//! with probability `min(1, exp(H₀ - H₁))`. During tuning the
//! step size and diagonal mass adapt exactly as for NUTS, starting from the
//! user-supplied step size.
use crate::{
    inference::{
        errors::InferenceResult,
        mcmc::{
            adaptation::Adaptation,
            hamiltonian::{DiagMass, PhasePoint, Potential, leapfrog},
            traits::{ChainRng, SamplerStats, Transition},
        },
    },
    optimization::loglik_optimizer::{LogDensity, Theta},
};
use rand::Rng;

const JITTER_LOW: f64 = 0.85;
const JITTER_HIGH: f64 = 1.15;

pub struct Hmc<'a, F: LogDensity> {
    potential: Potential<'a, F>,
    n_steps: usize,
    max_energy_error: f64,
    mass: DiagMass,
    step_size: f64,
    adaptation: Adaptation,
    current: PhasePoint,
}

impl<'a, F: LogDensity> Hmc<'a, F> {
    pub fn new(
        f: &'a F, step_size: f64, n_steps: usize, target_accept: f64, max_energy_error: f64,
        tune: usize, q0: Theta,
    ) -> InferenceResult<Self> {
        let potential = Potential::new(f, "hmc");
        let current = potential.point(q0)?;
        Ok(Hmc {
            adaptation: Adaptation::new(tune, target_accept, step_size, f.dim()),
            mass: DiagMass::identity(f.dim()),
            potential,
            n_steps,
            max_energy_error,
            step_size,
            current,
        })
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }
}

impl<'a, F: LogDensity> Transition for Hmc<'a, F> {
    fn name(&self) -> &'static str {
        "HMC"
    }

    fn step(&mut self, iter: usize, rng: &mut ChainRng) -> InferenceResult<SamplerStats> {
        let mut start = self.current.clone();
        start.p = self.mass.sample_momentum(rng);
        let h0 = self.mass.energy(&start);

        let eps = self.step_size * rng.gen_range(JITTER_LOW..JITTER_HIGH);
        let mut end = start.clone();
        for _ in 0..self.n_steps {
            end = leapfrog(&self.potential, &self.mass, &end, eps)?;
        }
        let h1 = self.mass.energy(&end);
        let diverging = h1 - h0 > self.max_energy_error;
        let accept_stat = if diverging { 0.0 } else { (h0 - h1).exp().min(1.0) };

        let (mut next, energy) =
            if !diverging && rng.gen::<f64>() < accept_stat { (end, h1) } else { (start, h0) };

        if self.adaptation.is_tuning(iter) {
            self.step_size = self.adaptation.update(iter, accept_stat, &next.q, &mut self.mass);
        }
        next.p.fill(0.0);
        self.current = next;
        Ok(SamplerStats {
            energy: Some(energy),
            step_size: eps,
            tree_depth: 0,
            n_steps: self.n_steps,
            accept_stat,
            diverging,
        })
    }

    fn position(&self) -> &Theta {
        &self.current.q
    }
}
