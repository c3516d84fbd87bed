//! Tree-Parzen Estimator (TPE) sampler.
//!
//! TPE models P(x|y) instead of P(y|x): completed trials are split into a
//! "good" group (the best `gamma` fraction) and a "bad" group, a kernel
//! density estimator is fitted to each, and the candidate with the highest
//! l(x)/g(x) ratio is proposed.

use parking_lot::Mutex;
use rand::Rng;
use rand::rngs::StdRng;

use crate::distribution::{Distribution, ParamValue};
use crate::error::{Error, Result};
use crate::kde::KernelDensityEstimator;
use crate::rng_util;
use crate::sampler::{CompletedTrial, Sampler};
use crate::types::Direction;

/// A Tree-Parzen Estimator sampler.
///
/// During the startup phase (fewer than `n_startup_trials` completed trials)
/// values are drawn uniformly at random.
///
/// # Examples
///
/// ```
/// use forge_optimizer::Direction;
/// use forge_optimizer::sampler::tpe::TpeSampler;
///
/// let sampler = TpeSampler::builder()
///     .direction(Direction::Maximize)
///     .gamma(0.15)
///     .n_startup_trials(20)
///     .seed(42)
///     .build()
///     .unwrap();
/// ```
pub struct TpeSampler {
    direction: Direction,
    /// Fraction of trials to consider as "good".
    gamma: f64,
    n_startup_trials: usize,
    n_ei_candidates: usize,
    /// Fixed KDE bandwidth; Scott's rule when `None`.
    kde_bandwidth: Option<f64>,
    rng: Mutex<StdRng>,
}

impl TpeSampler {
    /// Creates a minimizing TPE sampler with default settings.
    ///
    /// - gamma: 0.25
    /// - `n_startup_trials`: 10
    /// - `n_ei_candidates`: 24
    #[must_use]
    pub fn new() -> Self {
        Self {
            direction: Direction::Minimize,
            gamma: 0.25,
            n_startup_trials: 10,
            n_ei_candidates: 24,
            kde_bandwidth: None,
            rng: Mutex::new(rng_util::make_rng(None)),
        }
    }

    /// Creates a builder for configuring a TPE sampler.
    #[must_use]
    pub fn builder() -> TpeSamplerBuilder {
        TpeSamplerBuilder::new()
    }

    /// Splits history into (good, bad) by the gamma quantile of the loss.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn split_trials<'a>(
        &self,
        history: &'a [CompletedTrial],
    ) -> (Vec<&'a CompletedTrial>, Vec<&'a CompletedTrial>) {
        if history.len() < 2 {
            return (vec![], vec![]);
        }

        let direction = self.direction;
        let mut sorted: Vec<&CompletedTrial> = history.iter().collect();
        sorted.sort_by(|a, b| {
            direction
                .loss(a.value)
                .partial_cmp(&direction.loss(b.value))
                .unwrap_or(core::cmp::Ordering::Equal)
        });

        // keep at least one trial on each side
        let n_good = ((history.len() as f64 * self.gamma).ceil() as usize)
            .max(1)
            .min(history.len() - 1);

        let bad = sorted.split_off(n_good);
        (sorted, bad)
    }

    fn sample_tpe_float(
        &self,
        d: &crate::distribution::FloatDistribution,
        good_values: &[f64],
        bad_values: &[f64],
        rng: &mut StdRng,
    ) -> Result<f64> {
        let to_internal = |v: f64| if d.log_scale { v.ln() } else { v };
        let (internal_low, internal_high) = (to_internal(d.low), to_internal(d.high));
        let good: Vec<f64> = good_values.iter().map(|&v| to_internal(v)).collect();
        let bad: Vec<f64> = bad_values.iter().map(|&v| to_internal(v)).collect();

        let best = self.best_candidate(good, bad, internal_low, internal_high, rng)?;

        let value = if d.log_scale { best.exp() } else { best };
        Ok(d.snap(value))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn sample_tpe_int(
        &self,
        d: &crate::distribution::IntDistribution,
        good_values: &[i64],
        bad_values: &[i64],
        rng: &mut StdRng,
    ) -> Result<i64> {
        let to_internal = |v: f64| if d.log_scale { v.ln() } else { v };
        let (internal_low, internal_high) =
            (to_internal(d.low as f64), to_internal(d.high as f64));
        let good: Vec<f64> = good_values.iter().map(|&v| to_internal(v as f64)).collect();
        let bad: Vec<f64> = bad_values.iter().map(|&v| to_internal(v as f64)).collect();

        let best = self.best_candidate(good, bad, internal_low, internal_high, rng)?;
        let raw = if d.log_scale { best.exp() } else { best };
        Ok(d.snap(raw))
    }

    /// Draws `n_ei_candidates` from l(x) and keeps the one maximizing l(x)/g(x).
    fn best_candidate(
        &self,
        good: Vec<f64>,
        bad: Vec<f64>,
        low: f64,
        high: f64,
        rng: &mut StdRng,
    ) -> Result<f64> {
        let (l_kde, g_kde) = match self.kde_bandwidth {
            Some(bw) => (
                KernelDensityEstimator::with_bandwidth(good, bw)?,
                KernelDensityEstimator::with_bandwidth(bad, bw)?,
            ),
            None => (
                KernelDensityEstimator::new(good)?,
                KernelDensityEstimator::new(bad)?,
            ),
        };

        let mut best_candidate = f64::midpoint(low, high);
        let mut best_ratio = f64::NEG_INFINITY;

        for _ in 0..self.n_ei_candidates {
            let candidate = l_kde.sample(rng).clamp(low, high);
            let l_density = l_kde.pdf(candidate);
            let g_density = g_kde.pdf(candidate);

            let ratio = if g_density < f64::EPSILON {
                if l_density > f64::EPSILON {
                    f64::INFINITY
                } else {
                    0.0
                }
            } else {
                l_density / g_density
            };

            if ratio > best_ratio {
                best_ratio = ratio;
                best_candidate = candidate;
            }
        }

        Ok(best_candidate)
    }

    /// Samples a categorical index proportionally to Laplace-smoothed l/g ratios.
    #[allow(clippy::cast_precision_loss)]
    fn sample_tpe_categorical(
        n_choices: usize,
        good_indices: &[usize],
        bad_indices: &[usize],
        rng: &mut StdRng,
    ) -> usize {
        let mut good_counts = vec![0usize; n_choices];
        let mut bad_counts = vec![0usize; n_choices];
        for &idx in good_indices {
            good_counts[idx] += 1;
        }
        for &idx in bad_indices {
            bad_counts[idx] += 1;
        }

        let good_total = good_indices.len() as f64 + n_choices as f64;
        let bad_total = bad_indices.len() as f64 + n_choices as f64;

        let weights: Vec<f64> = good_counts
            .iter()
            .zip(&bad_counts)
            .map(|(&g, &b)| ((g as f64 + 1.0) / good_total) / ((b as f64 + 1.0) / bad_total))
            .collect();

        let total_weight: f64 = weights.iter().sum();
        let threshold = rng.random::<f64>() * total_weight;

        let mut cumulative = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            cumulative += w;
            if cumulative >= threshold {
                return i;
            }
        }
        n_choices - 1
    }
}

impl Default for TpeSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`TpeSampler`].
#[derive(Debug, Clone)]
pub struct TpeSamplerBuilder {
    direction: Direction,
    gamma: f64,
    n_startup_trials: usize,
    n_ei_candidates: usize,
    kde_bandwidth: Option<f64>,
    seed: Option<u64>,
}

impl TpeSamplerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            direction: Direction::Minimize,
            gamma: 0.25,
            n_startup_trials: 10,
            n_ei_candidates: 24,
            kde_bandwidth: None,
            seed: None,
        }
    }

    /// Sets the direction used to rank history.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the gamma quantile; must be in (0.0, 1.0).
    #[must_use]
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the number of random trials before TPE kicks in.
    #[must_use]
    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Sets the number of candidates evaluated per sample.
    #[must_use]
    pub fn n_ei_candidates(mut self, n: usize) -> Self {
        self.n_ei_candidates = n;
        self
    }

    /// Sets a fixed KDE bandwidth instead of Scott's rule.
    #[must_use]
    pub fn kde_bandwidth(mut self, bandwidth: f64) -> Self {
        self.kde_bandwidth = Some(bandwidth);
        self
    }

    /// Sets a seed for reproducible sampling.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets an optional seed; `None` draws from OS entropy.
    #[must_use]
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the configured [`TpeSampler`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGamma` if gamma is outside (0.0, 1.0),
    /// `Error::InvalidBandwidth` if a fixed bandwidth is not positive, and
    /// `Error::InvalidConfig` if `n_ei_candidates` is zero.
    pub fn build(self) -> Result<TpeSampler> {
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(Error::InvalidGamma(self.gamma));
        }
        if let Some(bw) = self.kde_bandwidth {
            if bw <= 0.0 {
                return Err(Error::InvalidBandwidth(bw));
            }
        }
        if self.n_ei_candidates == 0 {
            return Err(Error::InvalidConfig(
                "n_ei_candidates must be at least 1".to_string(),
            ));
        }

        Ok(TpeSampler {
            direction: self.direction,
            gamma: self.gamma,
            n_startup_trials: self.n_startup_trials,
            n_ei_candidates: self.n_ei_candidates,
            kde_bandwidth: self.kde_bandwidth,
            rng: Mutex::new(rng_util::make_rng(self.seed)),
        })
    }
}

impl Default for TpeSamplerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for TpeSampler {
    fn sample(
        &self,
        name: &str,
        distribution: &Distribution,
        _trial_id: u64,
        history: &[CompletedTrial],
    ) -> ParamValue {
        let mut rng = self.rng.lock();

        if history.len() < self.n_startup_trials {
            return rng_util::sample_uniform(&mut rng, distribution);
        }

        let (good_trials, bad_trials) = self.split_trials(history);
        let values = |group: &[&CompletedTrial]| -> Vec<ParamValue> {
            group
                .iter()
                .filter_map(|t| t.param_from(name, distribution).cloned())
                .collect()
        };
        let good = values(&good_trials);
        let bad = values(&bad_trials);

        // the parameter may be new, or only present on one side
        if good.is_empty() || bad.is_empty() {
            return rng_util::sample_uniform(&mut rng, distribution);
        }

        let sampled = match distribution {
            Distribution::Float(d) => {
                let floats = |vs: &[ParamValue]| -> Vec<f64> {
                    vs.iter()
                        .filter_map(|v| match v {
                            ParamValue::Float(f) => Some(*f),
                            _ => None,
                        })
                        .collect()
                };
                self.sample_tpe_float(d, &floats(&good), &floats(&bad), &mut rng)
                    .map(ParamValue::Float)
            }
            Distribution::Int(d) => {
                let ints = |vs: &[ParamValue]| -> Vec<i64> {
                    vs.iter()
                        .filter_map(|v| match v {
                            ParamValue::Int(i) => Some(*i),
                            _ => None,
                        })
                        .collect()
                };
                self.sample_tpe_int(d, &ints(&good), &ints(&bad), &mut rng)
                    .map(ParamValue::Int)
            }
            Distribution::Categorical(d) => {
                let indices = |vs: &[ParamValue]| -> Vec<usize> {
                    vs.iter()
                        .filter_map(|v| match v {
                            ParamValue::Categorical(i) if *i < d.n_choices() => Some(*i),
                            _ => None,
                        })
                        .collect()
                };
                Ok(ParamValue::Categorical(Self::sample_tpe_categorical(
                    d.n_choices(),
                    &indices(&good),
                    &indices(&bad),
                    &mut rng,
                )))
            }
        };

        sampled.unwrap_or_else(|_| rng_util::sample_uniform(&mut rng, distribution))
    }

    fn direction(&self) -> Direction {
        self.direction
    }
}
