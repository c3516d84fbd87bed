//! Coordinator configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. The server binary layers defaults, an optional JSON file
//! and `FORGE_OPTIMIZER_*` environment variables on top of these types.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do when a server's later suggest declares a differently shaped
/// space than the one its optimizer was created with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapePolicy {
    /// Proceed against the existing optimizer with the new space.
    #[default]
    Preserve,
    /// Fail the suggest with an invalid-input error.
    Reject,
}

/// TPE settings applied to every new TPE instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpeConfig {
    /// Fraction of trials treated as good, in (0, 1).
    pub gamma: f64,
    /// Completed trials sampled uniformly before TPE takes over.
    pub n_startup_trials: usize,
    /// Candidates scored per parameter.
    pub n_ei_candidates: usize,
}

impl Default for TpeConfig {
    fn default() -> Self {
        Self {
            gamma: 0.25,
            n_startup_trials: 10,
            n_ei_candidates: 24,
        }
    }
}

/// CMA-ES settings applied to every new CMA-ES instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmaEsConfig {
    /// Initial step size; derived from the bounds when unset.
    pub sigma0: Option<f64>,
    /// Candidates per generation; derived from the dimension when unset.
    pub population_size: Option<usize>,
}

/// Top-level configuration of a [`Coordinator`](crate::Coordinator).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Seed for every new instance's sampler; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Handling of differently shaped spaces for an existing server.
    pub shape_policy: ShapePolicy,
    /// TPE settings.
    pub tpe: TpeConfig,
    /// CMA-ES settings.
    pub cma_es: CmaEsConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            seed: Some(42),
            shape_policy: ShapePolicy::default(),
            tpe: TpeConfig::default(),
            cma_es: CmaEsConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGamma` for a gamma outside (0, 1) and
    /// `Error::InvalidConfig` for the other out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if !(self.tpe.gamma > 0.0 && self.tpe.gamma < 1.0) {
            return Err(Error::InvalidGamma(self.tpe.gamma));
        }
        if self.tpe.n_ei_candidates == 0 {
            return Err(Error::InvalidConfig(
                "tpe.n_ei_candidates must be at least 1".to_string(),
            ));
        }
        if let Some(sigma0) = self.cma_es.sigma0 {
            if !(sigma0.is_finite() && sigma0 > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "cma_es.sigma0 must be positive, got {sigma0}"
                )));
            }
        }
        if let Some(lambda) = self.cma_es.population_size {
            if lambda < 2 {
                return Err(Error::InvalidConfig(format!(
                    "cma_es.population_size must be at least 2, got {lambda}"
                )));
            }
        }
        Ok(())
    }
}
