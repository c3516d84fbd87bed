use std::sync::Arc;

use crate::config::{CmaEsConfig, TpeConfig};
use crate::error::Result;
use crate::sampler::Sampler;
use crate::strategy::Strategy;
use crate::types::Direction;

use super::Study;

/// A builder for constructing [`Study`] instances with a fluent API.
///
/// Created via [`Study::builder()`].
///
/// # Defaults
///
/// - Direction: [`Minimize`](Direction::Minimize)
/// - Strategy: [`Tpe`](Strategy::Tpe)
/// - Seed: OS entropy
///
/// # Examples
///
/// ```
/// use forge_optimizer::prelude::*;
///
/// let study = Study::builder()
///     .name("forge_opt_svc-a")
///     .maximize()
///     .strategy(Strategy::CmaEs)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// assert_eq!(study.direction(), Direction::Maximize);
/// assert_eq!(study.strategy(), Strategy::CmaEs);
/// ```
pub struct StudyBuilder {
    name: String,
    direction: Direction,
    strategy: Strategy,
    seed: Option<u64>,
    tpe: TpeConfig,
    cma_es: CmaEsConfig,
    sampler: Option<Arc<dyn Sampler>>,
}

impl StudyBuilder {
    pub(super) fn new() -> Self {
        Self {
            name: String::new(),
            direction: Direction::Minimize,
            strategy: Strategy::Tpe,
            seed: None,
            tpe: TpeConfig::default(),
            cma_es: CmaEsConfig::default(),
            sampler: None,
        }
    }

    /// Set the instance identity.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the optimization direction to minimize (the default).
    #[must_use]
    pub fn minimize(mut self) -> Self {
        self.direction = Direction::Minimize;
        self
    }

    /// Set the optimization direction to maximize.
    #[must_use]
    pub fn maximize(mut self) -> Self {
        self.direction = Direction::Maximize;
        self
    }

    /// Set the optimization direction explicitly.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the search strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Seed the sampler for reproducible proposals.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set an optional seed; `None` draws from OS entropy.
    #[must_use]
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// TPE settings, used when the strategy is [`Strategy::Tpe`].
    #[must_use]
    pub fn tpe(mut self, config: TpeConfig) -> Self {
        self.tpe = config;
        self
    }

    /// CMA-ES settings, used when the strategy is [`Strategy::CmaEs`].
    #[must_use]
    pub fn cma_es(mut self, config: CmaEsConfig) -> Self {
        self.cma_es = config;
        self
    }

    /// Use a prebuilt sampler instead of building one from the strategy.
    ///
    /// The sampler should rank history in the study's direction.
    #[must_use]
    pub fn sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Some(Arc::new(sampler));
        self
    }

    /// Build the [`Study`] with the configured options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the strategy settings are out of range.
    pub fn build(self) -> Result<Study> {
        let sampler = match self.sampler {
            Some(sampler) => sampler,
            None => self
                .strategy
                .build_sampler(self.direction, self.seed, &self.tpe, &self.cma_es)?,
        };

        Ok(Study::new(self.name, self.direction, self.strategy, sampler))
    }
}
