//! The fitted posterior, in whichever representation the engine produced.
use crate::inference::{advi::MeanFieldApproximation, mcmc::DrawSet};
use serde::Serialize;

/// Output of a fit.
///
/// - `Approximation`: a variational approximation that must be sampled on
///   demand.
/// - `Trace`: posterior draws from one or more Markov chains.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Posterior {
    Approximation(MeanFieldApproximation),
    Trace(DrawSet),
}

impl Posterior {
    pub fn kind(&self) -> &'static str {
        match self {
            Posterior::Approximation(_) => "approximation",
            Posterior::Trace(_) => "trace",
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            Posterior::Approximation(q) => q.dim(),
            Posterior::Trace(set) => set.dim(),
        }
    }

    pub fn as_approximation(&self) -> Option<&MeanFieldApproximation> {
        match self {
            Posterior::Approximation(q) => Some(q),
            Posterior::Trace(_) => None,
        }
    }

    pub fn as_trace(&self) -> Option<&DrawSet> {
        match self {
            Posterior::Trace(set) => Some(set),
            Posterior::Approximation(_) => None,
        }
    }
}
