//! Observer recording the ELBO of every ADVI iteration.
use argmin::core::{ArgminError, Error, KV, State, observers::Observe};
use std::sync::{Arc, Mutex};

/// Shared ELBO history; clones append to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct ElboHistory {
    values: Arc<Mutex<Vec<f64>>>,
}

impl ElboHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the values recorded so far.
    pub fn values(&self) -> Result<Vec<f64>, Error> {
        let guard = self.values.lock().map_err(|_| ArgminError::ConditionViolated {
            text: "ELBO history lock poisoned".to_string(),
        })?;
        Ok(guard.clone())
    }
}

impl<I> Observe<I> for ElboHistory
where
    I: State<Float = f64>,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        let mut guard = self.values.lock().map_err(|_| ArgminError::ConditionViolated {
            text: "ELBO history lock poisoned".to_string(),
        })?;
        // The solver stores the negated ELBO as its cost.
        guard.push(-state.get_cost());
        Ok(())
    }
}
