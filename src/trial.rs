//! Trial implementation for tracking sampled parameters and trial state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::distribution::{Distribution, ParamValue};
use crate::error::{Error, Result};
use crate::sampler::{CompletedTrial, Sampler};
use crate::types::TrialState;

/// A single proposal being evaluated.
///
/// Trials are created by [`Optimizer::ask`](crate::Optimizer::ask) and sample every
/// parameter through the study's sampler. A trial stays `Running` until its
/// value is told back to the study.
#[derive(Clone)]
pub struct Trial {
    id: u64,
    state: TrialState,
    params: HashMap<String, ParamValue>,
    distributions: HashMap<String, Distribution>,
    sampler: Arc<dyn Sampler>,
}

impl core::fmt::Debug for Trial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Trial")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("params", &self.params)
            .field("distributions", &self.distributions)
            .finish_non_exhaustive()
    }
}

impl Trial {
    pub(crate) fn new(id: u64, sampler: Arc<dyn Sampler>) -> Self {
        Self {
            id,
            state: TrialState::Running,
            params: HashMap::new(),
            distributions: HashMap::new(),
            sampler,
        }
    }

    /// Returns the study-internal number of this trial.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the current state of this trial.
    #[must_use]
    pub fn state(&self) -> TrialState {
        self.state
    }

    /// Returns the sampled parameters by name.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, ParamValue> {
        &self.params
    }

    /// Returns the parameter distributions by name.
    #[must_use]
    pub fn distributions(&self) -> &HashMap<String, Distribution> {
        &self.distributions
    }

    /// Samples parameter `name` from `distribution`.
    ///
    /// Suggesting the same name twice with the same distribution returns the
    /// cached value.
    ///
    /// # Errors
    ///
    /// Returns `Error::ParameterConflict` if `name` was already sampled from
    /// a different distribution.
    pub fn suggest(
        &mut self,
        name: &str,
        distribution: &Distribution,
        history: &[CompletedTrial],
    ) -> Result<ParamValue> {
        if let Some(existing) = self.distributions.get(name) {
            if existing == distribution {
                if let Some(value) = self.params.get(name) {
                    return Ok(value.clone());
                }
            }
            return Err(Error::ParameterConflict {
                name: name.to_string(),
                reason: "parameter was previously sampled with a different distribution"
                    .to_string(),
            });
        }

        let value = self.sampler.sample(name, distribution, self.id, history);
        self.distributions
            .insert(name.to_string(), distribution.clone());
        self.params.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Completes the trial with an objective value.
    pub(crate) fn into_completed(mut self, value: f64) -> CompletedTrial {
        self.state = TrialState::Complete;
        CompletedTrial::new(self.id, self.params, self.distributions, value)
    }
}
