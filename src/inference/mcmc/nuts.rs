//! No-U-Turn Sampler with slice sampling and dual-averaging adaptation.
//!
//! Follows Hoffman and Gelman (2014), Algorithm 6, with a diagonal mass
//! matrix: the trajectory doubles in a random direction until either end
//! turns back on the other (measured with velocities `M⁻¹ p`), a leaf's
//! energy exceeds the slice by more than `max_energy_error` (a divergence),
//! or the maximum depth is reached. The draw is chosen uniformly among
//! in-slice leaves by progressive sampling.
use crate::{
    inference::{
        errors::InferenceResult,
        mcmc::{
            adaptation::{Adaptation, find_reasonable_epsilon},
            hamiltonian::{DiagMass, PhasePoint, Potential, leapfrog},
            traits::{ChainRng, SamplerStats, Transition},
        },
        options::NutsOptions,
    },
    optimization::loglik_optimizer::{LogDensity, Theta},
};
use rand::Rng;

/// NUTS kernel over a [`LogDensity`].
pub struct Nuts<'a, F: LogDensity> {
    potential: Potential<'a, F>,
    opts: NutsOptions,
    mass: DiagMass,
    step_size: f64,
    adaptation: Adaptation,
    current: PhasePoint,
}

/// Result of building one (sub)tree.
struct Tree {
    minus: PhasePoint,
    plus: PhasePoint,
    proposal: PhasePoint,
    proposal_energy: f64,
    n_valid: usize,
    keep_going: bool,
    alpha: f64,
    n_alpha: usize,
    diverging: bool,
}

impl<'a, F: LogDensity> Nuts<'a, F> {
    /// Place the chain at `q0`, pick an initial step size and prepare
    /// `tune` iterations of adaptation.
    pub fn new(
        f: &'a F, opts: NutsOptions, tune: usize, q0: Theta, rng: &mut ChainRng,
    ) -> InferenceResult<Self> {
        let potential = Potential::new(f, "nuts");
        let mass = DiagMass::identity(f.dim());
        let step_size = find_reasonable_epsilon(&potential, &mass, &q0, rng)?;
        let adaptation = Adaptation::new(tune, opts.target_accept, step_size, f.dim());
        let current = potential.point(q0)?;
        Ok(Nuts { potential, opts, mass, step_size, adaptation, current })
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn mass(&self) -> &DiagMass {
        &self.mass
    }

    fn no_u_turn(&self, minus: &PhasePoint, plus: &PhasePoint) -> bool {
        let dq = &plus.q - &minus.q;
        dq.dot(&self.mass.velocity(&minus.p)) >= 0.0 && dq.dot(&self.mass.velocity(&plus.p)) >= 0.0
    }

    fn build_tree(
        &self, rng: &mut ChainRng, point: &PhasePoint, log_u: f64, direction: f64, depth: usize,
        h0: f64,
    ) -> InferenceResult<(Tree, usize)> {
        if depth == 0 {
            let next = leapfrog(&self.potential, &self.mass, point, direction * self.step_size)?;
            let h = self.mass.energy(&next);
            let n_valid = usize::from(log_u <= -h);
            let diverging = log_u >= self.opts.max_energy_error - h;
            let tree = Tree {
                minus: next.clone(),
                plus: next.clone(),
                proposal: next,
                proposal_energy: h,
                n_valid,
                keep_going: !diverging,
                alpha: (h0 - h).exp().min(1.0),
                n_alpha: 1,
                diverging,
            };
            return Ok((tree, 1));
        }

        let (mut tree, mut steps) = self.build_tree(rng, point, log_u, direction, depth - 1, h0)?;
        if !tree.keep_going {
            return Ok((tree, steps));
        }
        let edge = if direction < 0.0 { &tree.minus } else { &tree.plus };
        let (inner, inner_steps) = self.build_tree(rng, edge, log_u, direction, depth - 1, h0)?;
        steps += inner_steps;

        let total = tree.n_valid + inner.n_valid;
        if total > 0 && rng.gen::<f64>() < inner.n_valid as f64 / total as f64 {
            tree.proposal = inner.proposal;
            tree.proposal_energy = inner.proposal_energy;
        }
        if direction < 0.0 {
            tree.minus = inner.minus;
        } else {
            tree.plus = inner.plus;
        }
        tree.alpha += inner.alpha;
        tree.n_alpha += inner.n_alpha;
        tree.n_valid = total;
        tree.diverging |= inner.diverging;
        tree.keep_going = inner.keep_going && self.no_u_turn(&tree.minus, &tree.plus);
        Ok((tree, steps))
    }
}

impl<'a, F: LogDensity> Transition for Nuts<'a, F> {
    fn name(&self) -> &'static str {
        "NUTS"
    }

    fn step(&mut self, iter: usize, rng: &mut ChainRng) -> InferenceResult<SamplerStats> {
        let mut start = self.current.clone();
        start.p = self.mass.sample_momentum(rng);
        let h0 = self.mass.energy(&start);
        let log_u = -h0 + rng.gen::<f64>().ln();

        let mut minus = start.clone();
        let mut plus = start.clone();
        let mut chosen = start.clone();
        let mut chosen_energy = h0;
        let mut n_valid = 1usize;
        let (mut alpha, mut n_alpha) = (0.0, 0usize);
        let mut diverging = false;
        let mut depth = 0;
        let mut n_steps = 0;

        while depth < self.opts.max_tree_depth {
            let direction = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            let edge = if direction < 0.0 { &minus } else { &plus };
            let (tree, steps) = self.build_tree(rng, edge, log_u, direction, depth, h0)?;
            n_steps += steps;
            depth += 1;
            if direction < 0.0 {
                minus = tree.minus;
            } else {
                plus = tree.plus;
            }
            alpha += tree.alpha;
            n_alpha += tree.n_alpha;
            diverging |= tree.diverging;
            if !tree.keep_going {
                break;
            }
            if rng.gen::<f64>() < (tree.n_valid as f64 / n_valid as f64).min(1.0) {
                chosen = tree.proposal;
                chosen_energy = tree.proposal_energy;
            }
            n_valid += tree.n_valid;
            if !self.no_u_turn(&minus, &plus) {
                break;
            }
        }

        let accept_stat = if n_alpha > 0 { alpha / n_alpha as f64 } else { 0.0 };
        let used_step = self.step_size;
        if self.adaptation.is_tuning(iter) {
            self.step_size = self.adaptation.update(iter, accept_stat, &chosen.q, &mut self.mass);
        }
        chosen.p.fill(0.0);
        self.current = chosen;
        Ok(SamplerStats {
            energy: Some(chosen_energy),
            step_size: used_step,
            tree_depth: depth,
            n_steps,
            accept_stat,
            diverging,
        })
    }

    fn position(&self) -> &Theta {
        &self.current.q
    }
}
