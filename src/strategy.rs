//! Search strategy selection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{CmaEsConfig, TpeConfig};
use crate::error::Result;
use crate::sampler::Sampler;
use crate::sampler::cma_es::CmaEsSampler;
use crate::sampler::tpe::TpeSampler;
use crate::space::SearchSpace;
use crate::types::Direction;

/// The search algorithm behind an optimizer instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Tree-structured Parzen Estimator.
    #[serde(rename = "tpe")]
    Tpe,
    /// Covariance Matrix Adaptation Evolution Strategy.
    #[serde(rename = "cmaes")]
    CmaEs,
}

impl Strategy {
    /// Picks the strategy for a space.
    ///
    /// CMA-ES needs at least two numeric dimensions to build a covariance
    /// model; anything with a categorical, or fewer than two parameters,
    /// goes to TPE.
    #[must_use]
    pub fn select(space: &SearchSpace) -> Self {
        if space.len() >= 2 && space.is_all_numeric() {
            Self::CmaEs
        } else {
            Self::Tpe
        }
    }

    /// Returns the wire name, `"tpe"` or `"cmaes"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tpe => "tpe",
            Self::CmaEs => "cmaes",
        }
    }

    /// Builds a sampler implementing this strategy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `tpe` or `cma_es` is out of range.
    pub fn build_sampler(
        self,
        direction: Direction,
        seed: Option<u64>,
        tpe: &TpeConfig,
        cma_es: &CmaEsConfig,
    ) -> Result<Arc<dyn Sampler>> {
        Ok(match self {
            Self::Tpe => Arc::new(
                TpeSampler::builder()
                    .direction(direction)
                    .gamma(tpe.gamma)
                    .n_startup_trials(tpe.n_startup_trials)
                    .n_ei_candidates(tpe.n_ei_candidates)
                    .maybe_seed(seed)
                    .build()?,
            ),
            Self::CmaEs => {
                let mut builder = CmaEsSampler::builder()
                    .direction(direction)
                    .maybe_seed(seed);
                if let Some(sigma0) = cma_es.sigma0 {
                    builder = builder.sigma0(sigma0);
                }
                if let Some(lambda) = cma_es.population_size {
                    builder = builder.population_size(lambda);
                }
                Arc::new(builder.build()?)
            }
        })
    }
}

impl core::fmt::Display for Strategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
