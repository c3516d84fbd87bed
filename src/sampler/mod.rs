//! Sampler trait and the two search strategies.
//!
//! | Sampler | Algorithm | Used for |
//! |---------|-----------|----------|
//! | [`TpeSampler`](tpe::TpeSampler) | Tree-Parzen Estimator | categorical, mixed or one-dimensional spaces |
//! | [`CmaEsSampler`](cma_es::CmaEsSampler) | CMA-ES | purely numeric spaces with two or more dimensions |

pub mod cma_es;
pub mod tpe;

use std::collections::HashMap;

use crate::distribution::{Distribution, ParamValue};
use crate::types::Direction;

/// A completed trial with its parameters, distributions, and objective value.
#[derive(Clone, Debug)]
pub struct CompletedTrial {
    /// The study-internal trial number.
    pub id: u64,
    /// The sampled parameter values, keyed by parameter name.
    pub params: HashMap<String, ParamValue>,
    /// The parameter distributions used, keyed by parameter name.
    pub distributions: HashMap<String, Distribution>,
    /// The objective value reported for the trial.
    pub value: f64,
}

impl CompletedTrial {
    /// Creates a new completed trial.
    #[must_use]
    pub fn new(
        id: u64,
        params: HashMap<String, ParamValue>,
        distributions: HashMap<String, Distribution>,
        value: f64,
    ) -> Self {
        Self {
            id,
            params,
            distributions,
            value,
        }
    }

    /// Returns the value of parameter `name` if it was sampled from `distribution`.
    #[must_use]
    pub fn param_from(&self, name: &str, distribution: &Distribution) -> Option<&ParamValue> {
        match self.distributions.get(name) {
            Some(d) if d == distribution => self.params.get(name),
            _ => None,
        }
    }
}

/// Trait for pluggable parameter sampling strategies.
///
/// Samplers are called once per parameter per trial, in declaration order,
/// with the study's completed history. They carry their own optimization
/// [`Direction`] so that history can be ranked without the study's help.
pub trait Sampler: Send + Sync {
    /// Samples a value for parameter `name` from `distribution`.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name, used to find the same parameter in history.
    /// * `distribution` - The parameter distribution to sample from.
    /// * `trial_id` - The study-internal number of the trial being sampled for.
    /// * `history` - Completed trials in completion order.
    fn sample(
        &self,
        name: &str,
        distribution: &Distribution,
        trial_id: u64,
        history: &[CompletedTrial],
    ) -> ParamValue;

    /// The direction this sampler ranks history in.
    fn direction(&self) -> Direction;
}
