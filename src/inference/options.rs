//! Fit options — method selectors and validated configuration for ADVI and
//! MCMC.
//!
//! Purpose
//! -------
//! Carry everything the fit entry point accepts: the draw/iteration count,
//! the method selector, an optional stepping rule (sampling only), the
//! convergence-difference mode (variational only), the rich-trace flag
//! (sampling only), and the seed, plus per-engine tuning knobs.
//!
//! Key behaviors
//! -------------
//! - [`FitMethod`], [`ConvergenceDiff`], and [`StepMethod`] parse
//!   case-insensitively through `FromStr`.
//! - [`FitOptions::validate`] rejects values no engine can run with; option
//!   and method mismatches are only warned about by `fit`.
//!
//! Conventions
//! -----------
//! - Defaults follow the reference settings: seed 42, adagrad-window with
//!   learning rate 1e-3, checks every 100 iterations at tolerance 1e-3 on the
//!   relative difference, 1000 tuning steps, 2 chains, NUTS at target
//!   acceptance 0.8.
use crate::inference::errors::{InferenceError, InferenceResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Inference procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMethod {
    /// Mean-field automatic differentiation variational inference.
    Advi,
    /// Markov-chain Monte Carlo.
    Mcmc,
}

impl FromStr for FitMethod {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "advi" => Ok(FitMethod::Advi),
            "mcmc" => Ok(FitMethod::Mcmc),
            _ => Err(InferenceError::UnknownChoice {
                kind: "fit method",
                name: s.to_string(),
                expected: "'ADVI' or 'MCMC'",
            }),
        }
    }
}

/// How the ADVI parameter change between checks is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceDiff {
    /// `(|Δ| + 1e-6) / (|prev| + 1e-6)`, elementwise.
    #[default]
    Relative,
    /// `|Δ|`, elementwise.
    Absolute,
}

impl FromStr for ConvergenceDiff {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relative" => Ok(ConvergenceDiff::Relative),
            "absolute" => Ok(ConvergenceDiff::Absolute),
            _ => Err(InferenceError::UnknownChoice {
                kind: "convergence diff",
                name: s.to_string(),
                expected: "'relative' or 'absolute'",
            }),
        }
    }
}

/// MCMC stepping rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum StepMethod {
    /// No-U-Turn sampler with step-size and mass-matrix adaptation.
    #[default]
    Nuts,
    /// Static-trajectory Hamiltonian Monte Carlo.
    Hmc { step_size: f64, n_steps: usize },
    /// Gaussian random-walk Metropolis with scale tuning.
    Metropolis { scale: f64 },
}

impl StepMethod {
    pub const DEFAULT_HMC: StepMethod = StepMethod::Hmc { step_size: 0.1, n_steps: 20 };
    pub const DEFAULT_METROPOLIS: StepMethod = StepMethod::Metropolis { scale: 1.0 };

    pub fn name(&self) -> &'static str {
        match self {
            StepMethod::Nuts => "NUTS",
            StepMethod::Hmc { .. } => "HMC",
            StepMethod::Metropolis { .. } => "Metropolis",
        }
    }

    /// `true` when draws carry a Hamiltonian energy.
    pub fn records_energy(&self) -> bool {
        !matches!(self, StepMethod::Metropolis { .. })
    }

    pub fn validate(&self) -> InferenceResult<()> {
        match *self {
            StepMethod::Nuts => Ok(()),
            StepMethod::Hmc { step_size, n_steps } => {
                positive("hmc.step_size", step_size)?;
                if n_steps == 0 {
                    return Err(InferenceError::InvalidOption {
                        name: "hmc.n_steps",
                        value: n_steps.to_string(),
                        reason: "At least one leapfrog step is required.",
                    });
                }
                Ok(())
            }
            StepMethod::Metropolis { scale } => positive("metropolis.scale", scale),
        }
    }
}

impl FromStr for StepMethod {
    type Err = InferenceError;

    /// Parse `"nuts"`, `"hmc"`, or `"metropolis"` with default settings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nuts" => Ok(StepMethod::Nuts),
            "hmc" => Ok(StepMethod::DEFAULT_HMC),
            "metropolis" => Ok(StepMethod::DEFAULT_METROPOLIS),
            _ => Err(InferenceError::UnknownChoice {
                kind: "step method",
                name: s.to_string(),
                expected: "'NUTS', 'HMC' or 'Metropolis'",
            }),
        }
    }
}

/// Variational settings.
///
/// - `learning_rate`, `window`, `epsilon`: adagrad-window step.
/// - `every`, `tolerance`: convergence check cadence and threshold.
/// - `diff`: default difference mode when the fit call does not choose one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviOptions {
    pub learning_rate: f64,
    pub window: usize,
    pub epsilon: f64,
    pub every: usize,
    pub tolerance: f64,
    pub diff: ConvergenceDiff,
}

impl Default for AdviOptions {
    fn default() -> Self {
        AdviOptions {
            learning_rate: 1e-3,
            window: 10,
            epsilon: 0.1,
            every: 100,
            tolerance: 1e-3,
            diff: ConvergenceDiff::Relative,
        }
    }
}

impl AdviOptions {
    pub fn validate(&self) -> InferenceResult<()> {
        positive("advi.learning_rate", self.learning_rate)?;
        positive("advi.epsilon", self.epsilon)?;
        positive("advi.tolerance", self.tolerance)?;
        at_least_one("advi.window", self.window)?;
        at_least_one("advi.every", self.every)
    }
}

/// NUTS-specific settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutsOptions {
    /// Dual-averaging target for the mean acceptance statistic.
    pub target_accept: f64,
    pub max_tree_depth: usize,
    /// Energy error above which a transition is flagged divergent.
    pub max_energy_error: f64,
}

impl Default for NutsOptions {
    fn default() -> Self {
        NutsOptions { target_accept: 0.8, max_tree_depth: 10, max_energy_error: 1000.0 }
    }
}

/// Sampling settings.
///
/// - `tune`: adaptation iterations per chain, discarded.
/// - `chains`: independent chains; chain `c` is seeded with `seed + c`.
/// - `jitter`: half-width of the uniform start perturbation.
/// - `map_start`: start chains from an L-BFGS MAP estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleOptions {
    pub tune: usize,
    pub chains: usize,
    pub jitter: f64,
    pub map_start: bool,
    pub nuts: NutsOptions,
}

impl Default for SampleOptions {
    fn default() -> Self {
        SampleOptions {
            tune: 1000,
            chains: 2,
            jitter: 1.0,
            map_start: false,
            nuts: NutsOptions::default(),
        }
    }
}

impl SampleOptions {
    pub fn validate(&self) -> InferenceResult<()> {
        at_least_one("sample.chains", self.chains)?;
        at_least_one("nuts.max_tree_depth", self.nuts.max_tree_depth)?;
        positive("nuts.max_energy_error", self.nuts.max_energy_error)?;
        let t = self.nuts.target_accept;
        if !(t > 0.0 && t < 1.0) {
            return Err(InferenceError::InvalidOption {
                name: "nuts.target_accept",
                value: t.to_string(),
                reason: "Target acceptance must lie strictly between 0 and 1.",
            });
        }
        if !self.jitter.is_finite() || self.jitter < 0.0 {
            return Err(InferenceError::InvalidOption {
                name: "sample.jitter",
                value: self.jitter.to_string(),
                reason: "Jitter must be finite and non-negative.",
            });
        }
        Ok(())
    }
}

/// Arguments of one fit call.
///
/// `step` and `rich_trace` apply to MCMC only, `diff` to ADVI only; a value
/// given for the other method is ignored with a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// ADVI iterations or retained draws per chain.
    pub n: usize,
    pub method: FitMethod,
    pub step: Option<StepMethod>,
    pub diff: Option<ConvergenceDiff>,
    pub rich_trace: Option<bool>,
    pub seed: u64,
    pub advi: AdviOptions,
    pub sample: SampleOptions,
}

impl FitOptions {
    pub const DEFAULT_SEED: u64 = 42;

    /// Options for `n` iterations/draws of `method`, everything else default.
    pub fn new(n: usize, method: FitMethod) -> InferenceResult<FitOptions> {
        let opts = FitOptions {
            n,
            method,
            step: None,
            diff: None,
            rich_trace: None,
            seed: Self::DEFAULT_SEED,
            advi: AdviOptions::default(),
            sample: SampleOptions::default(),
        };
        opts.validate()?;
        Ok(opts)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_step(mut self, step: StepMethod) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_diff(mut self, diff: ConvergenceDiff) -> Self {
        self.diff = Some(diff);
        self
    }

    pub fn with_rich_trace(mut self, rich: bool) -> Self {
        self.rich_trace = Some(rich);
        self
    }

    /// Effective difference mode for ADVI.
    pub fn diff_mode(&self) -> ConvergenceDiff {
        self.diff.unwrap_or(self.advi.diff)
    }

    /// Effective stepping rule for MCMC.
    pub fn step_method(&self) -> StepMethod {
        self.step.unwrap_or_default()
    }

    /// Effective rich-trace flag for MCMC (defaults to `true`).
    pub fn keeps_sampler_stats(&self) -> bool {
        self.rich_trace.unwrap_or(true)
    }

    pub fn validate(&self) -> InferenceResult<()> {
        at_least_one("n", self.n)?;
        match self.method {
            FitMethod::Advi => self.advi.validate(),
            FitMethod::Mcmc => {
                self.sample.validate()?;
                self.step_method().validate()
            }
        }
    }
}

// ---- Helpers ----

fn positive(name: &'static str, value: f64) -> InferenceResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InferenceError::InvalidOption {
            name,
            value: value.to_string(),
            reason: "Value must be finite and strictly positive.",
        })
    }
}

fn at_least_one(name: &'static str, value: usize) -> InferenceResult<()> {
    if value == 0 {
        return Err(InferenceError::InvalidOption {
            name,
            value: value.to_string(),
            reason: "Value must be at least 1.",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Selectors parse case-insensitively and reject unknown names.
    //
    // Given
    // -----
    // - "ADVI", "mcmc", "Absolute", "hmc", "gibbs".
    //
    // Expect
    // ------
    // - Known names map to their variants; "gibbs" is `UnknownChoice`.
    fn selectors_parse_case_insensitively() {
        assert_eq!("ADVI".parse::<FitMethod>().unwrap(), FitMethod::Advi);
        assert_eq!("mcmc".parse::<FitMethod>().unwrap(), FitMethod::Mcmc);
        assert_eq!("Absolute".parse::<ConvergenceDiff>().unwrap(), ConvergenceDiff::Absolute);
        assert_eq!("hmc".parse::<StepMethod>().unwrap(), StepMethod::DEFAULT_HMC);
        assert!(matches!(
            "gibbs".parse::<StepMethod>(),
            Err(InferenceError::UnknownChoice { kind: "step method", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Invalid values are errors regardless of the method they belong to.
    //
    // Given
    // -----
    // - n = 0; a negative learning rate; an HMC rule with zero steps.
    //
    // Expect
    // ------
    // - `InvalidOption` naming the offending field each time.
    fn invalid_values_are_rejected() {
        assert!(matches!(
            FitOptions::new(0, FitMethod::Advi),
            Err(InferenceError::InvalidOption { name: "n", .. })
        ));

        let mut opts = FitOptions::new(10, FitMethod::Advi).unwrap();
        opts.advi.learning_rate = -1.0;
        assert!(matches!(
            opts.validate(),
            Err(InferenceError::InvalidOption { name: "advi.learning_rate", .. })
        ));

        let opts = FitOptions::new(10, FitMethod::Mcmc)
            .unwrap()
            .with_step(StepMethod::Hmc { step_size: 0.1, n_steps: 0 });
        assert!(matches!(
            opts.validate(),
            Err(InferenceError::InvalidOption { name: "hmc.n_steps", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Effective settings fall back to the documented defaults.
    //
    // Given
    // -----
    // - `FitOptions::new(100, Mcmc)` without overrides.
    //
    // Expect
    // ------
    // - Seed 42, NUTS, stats kept, relative diff.
    fn effective_defaults() {
        let opts = FitOptions::new(100, FitMethod::Mcmc).unwrap();
        assert_eq!(opts.seed, 42);
        assert_eq!(opts.step_method(), StepMethod::Nuts);
        assert!(opts.keeps_sampler_stats());
        assert_eq!(opts.diff_mode(), ConvergenceDiff::Relative);
    }
}
