//! CMA-ES (Covariance Matrix Adaptation Evolution Strategy) sampler.
//!
//! CMA-ES maintains a multivariate Gaussian over the numeric parameters and
//! adapts its mean, covariance matrix and step size from the ranking of each
//! generation. The first trial is a discovery trial: it records which
//! parameters exist and samples them uniformly.
//!
//! Categorical parameters are not part of the Gaussian and are sampled
//! uniformly at random.
//!
//! # Examples
//!
//! ```
//! use forge_optimizer::Direction;
//! use forge_optimizer::sampler::cma_es::CmaEsSampler;
//!
//! let sampler = CmaEsSampler::builder()
//!     .direction(Direction::Maximize)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! ```

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;
use rand::rngs::StdRng;

use crate::distribution::{Distribution, ParamValue};
use crate::error::{Error, Result};
use crate::rng_util;
use crate::sampler::{CompletedTrial, Sampler};
use crate::types::Direction;

const MAX_REJECTION_ATTEMPTS: usize = 100;

/// CMA-ES sampler for numeric search spaces.
pub struct CmaEsSampler {
    direction: Direction,
    state: Mutex<CmaEsState>,
}

impl CmaEsSampler {
    /// Creates a minimizing CMA-ES sampler with automatic `sigma0` and
    /// population size and an OS-seeded RNG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            direction: Direction::Minimize,
            state: Mutex::new(CmaEsState::new(None, None, None)),
        }
    }

    /// Creates a builder for configuring a `CmaEsSampler`.
    #[must_use]
    pub fn builder() -> CmaEsSamplerBuilder {
        CmaEsSamplerBuilder::new()
    }

    /// Current generation number; zero until the first update.
    #[must_use]
    pub fn generation(&self) -> usize {
        match &self.state.lock().phase {
            Phase::Discovery => 0,
            Phase::Active(algo) => algo.generation,
        }
    }

    /// Population size, known once the discovery trial has ended.
    #[must_use]
    pub fn population_size(&self) -> Option<usize> {
        match &self.state.lock().phase {
            Phase::Discovery => None,
            Phase::Active(algo) => Some(algo.constants.lambda),
        }
    }
}

impl Default for CmaEsSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`CmaEsSampler`].
///
/// - `sigma0`: average internal range / 4 when unset
/// - `population_size`: `4 + floor(3 * ln(n))` when unset
/// - `seed`: OS entropy when unset
#[derive(Debug, Clone)]
pub struct CmaEsSamplerBuilder {
    direction: Direction,
    sigma0: Option<f64>,
    population_size: Option<usize>,
    seed: Option<u64>,
}

impl CmaEsSamplerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            direction: Direction::Minimize,
            sigma0: None,
            population_size: None,
            seed: None,
        }
    }

    /// Sets the direction used to rank each generation.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the initial step size (sigma) in internal space.
    #[must_use]
    pub fn sigma0(mut self, sigma0: f64) -> Self {
        self.sigma0 = Some(sigma0);
        self
    }

    /// Sets the population size (lambda).
    #[must_use]
    pub fn population_size(mut self, population_size: usize) -> Self {
        self.population_size = Some(population_size);
        self
    }

    /// Sets the random seed for reproducibility.
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

    /// Builds the configured [`CmaEsSampler`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `sigma0` is not a positive finite
    /// number or `population_size` is below 2.
    pub fn build(self) -> Result<CmaEsSampler> {
        if let Some(sigma0) = self.sigma0 {
            if !(sigma0.is_finite() && sigma0 > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "sigma0 must be positive, got {sigma0}"
                )));
            }
        }
        if let Some(lambda) = self.population_size {
            if lambda < 2 {
                return Err(Error::InvalidConfig(format!(
                    "population_size must be at least 2, got {lambda}"
                )));
            }
        }

        Ok(CmaEsSampler {
            direction: self.direction,
            state: Mutex::new(CmaEsState::new(
                self.sigma0,
                self.population_size,
                self.seed,
            )),
        })
    }
}

impl Default for CmaEsSamplerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A numeric parameter discovered during the first trial.
#[derive(Clone, Debug)]
struct Dimension {
    name: String,
    distribution: Distribution,
    /// Bounds in internal space (log space for log-scale parameters).
    low: f64,
    high: f64,
}

impl Dimension {
    fn contains(&self, x: f64) -> bool {
        (self.low..=self.high).contains(&x)
    }
}

#[derive(Clone, Debug)]
struct CmaEsConstants {
    n: usize,
    lambda: usize,
    mu: usize,
    weights: Vec<f64>,
    mu_eff: f64,
    c_sigma: f64,
    d_sigma: f64,
    c_c: f64,
    c_1: f64,
    c_mu: f64,
    /// Expected norm of N(0, I) in n dimensions.
    chi_n: f64,
}

impl CmaEsConstants {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn new(n: usize, user_lambda: Option<usize>) -> Self {
        let n_f = n as f64;

        let lambda = user_lambda.unwrap_or_else(|| 4 + (3.0 * n_f.ln()).max(0.0).floor() as usize);
        let mu = (lambda / 2).max(1);

        // log-proportional recombination weights
        let log_half_lambda = f64::midpoint(lambda as f64, 1.0).ln();
        let raw_weights: Vec<f64> = (0..mu)
            .map(|i| (log_half_lambda - ((i + 1) as f64).ln()).max(f64::EPSILON))
            .collect();
        let w_sum: f64 = raw_weights.iter().sum();
        let weights: Vec<f64> = raw_weights.iter().map(|w| w / w_sum).collect();

        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let c_sigma = (mu_eff + 2.0) / (n_f + mu_eff + 5.0);
        let d_sigma = 1.0 + 2.0 * (((mu_eff - 1.0) / (n_f + 1.0)).sqrt() - 1.0).max(0.0) + c_sigma;
        let c_c = (4.0 + mu_eff / n_f) / (n_f + 4.0 + 2.0 * mu_eff / n_f);
        let c_1 = 2.0 / ((n_f + 1.3).powi(2) + mu_eff);
        let c_mu = ((2.0 * (mu_eff - 2.0 + 1.0 / mu_eff)) / ((n_f + 2.0).powi(2) + mu_eff))
            .clamp(0.0, 1.0 - c_1);

        let chi_n = n_f.sqrt() * (1.0 - 1.0 / (4.0 * n_f) + 1.0 / (21.0 * n_f * n_f));

        Self {
            n,
            lambda,
            mu,
            weights,
            mu_eff,
            c_sigma,
            d_sigma,
            c_c,
            c_1,
            c_mu,
            chi_n,
        }
    }
}

/// Mean, step size and covariance of the search distribution.
struct CmaEsAlgorithm {
    mean: DVector<f64>,
    sigma: f64,
    c: DMatrix<f64>,
    p_sigma: DVector<f64>,
    p_c: DVector<f64>,
    /// Eigenvectors of C.
    b: DMatrix<f64>,
    /// Square roots of the eigenvalues of C.
    d: DVector<f64>,
    inv_sqrt_c: DMatrix<f64>,
    generation: usize,
    last_eigen_generation: usize,
    constants: CmaEsConstants,
}

impl CmaEsAlgorithm {
    #[allow(clippy::cast_precision_loss)]
    fn new(dimensions: &[Dimension], sigma0: Option<f64>, user_lambda: Option<usize>) -> Self {
        let n = dimensions.len();
        let constants = CmaEsConstants::new(n, user_lambda);

        let mean = DVector::from_iterator(n, dimensions.iter().map(|d| f64::midpoint(d.low, d.high)));
        let total_range: f64 = dimensions.iter().map(|d| d.high - d.low).sum();
        let sigma = sigma0.unwrap_or_else(|| {
            let auto = (total_range / n.max(1) as f64) / 4.0;
            if auto > 0.0 { auto } else { 1.0 }
        });

        Self {
            mean,
            sigma,
            c: DMatrix::identity(n, n),
            p_sigma: DVector::zeros(n),
            p_c: DVector::zeros(n),
            b: DMatrix::identity(n, n),
            d: DVector::from_element(n, 1.0),
            inv_sqrt_c: DMatrix::identity(n, n),
            generation: 0,
            last_eigen_generation: 0,
            constants,
        }
    }

    fn generate_candidates(&self, rng: &mut StdRng, dimensions: &[Dimension]) -> Vec<DVector<f64>> {
        (0..self.constants.lambda)
            .map(|_| self.sample_with_rejection(rng, dimensions))
            .collect()
    }

    /// Draws x = mean + sigma * B * D * z, retrying until in bounds and
    /// clipping after `MAX_REJECTION_ATTEMPTS`.
    fn sample_with_rejection(&self, rng: &mut StdRng, dimensions: &[Dimension]) -> DVector<f64> {
        let n = self.constants.n;
        let draw = |rng: &mut StdRng| {
            let z = DVector::from_fn(n, |_, _| rng_util::standard_normal(rng));
            &self.mean + self.sigma * (&self.b * self.d.component_mul(&z))
        };

        for _ in 0..MAX_REJECTION_ATTEMPTS {
            let x = draw(rng);
            if x.iter().zip(dimensions).all(|(&xi, dim)| dim.contains(xi)) {
                return x;
            }
        }

        let mut x = draw(rng);
        for (xi, dim) in x.iter_mut().zip(dimensions) {
            *xi = xi.clamp(dim.low, dim.high);
        }
        x
    }

    /// Updates the distribution from candidates ranked best-first.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap
    )]
    fn update(&mut self, ranked: &[&DVector<f64>]) {
        let n = self.constants.n;
        let mu = self.constants.mu;
        let sigma = self.sigma;
        let k = &self.constants;

        let mut new_mean = DVector::zeros(n);
        for (w, &x) in k.weights.iter().zip(ranked.iter().take(mu)) {
            new_mean += *w * x;
        }
        let mean_diff = &new_mean - &self.mean;

        self.p_sigma = (1.0 - k.c_sigma) * &self.p_sigma
            + (k.c_sigma * (2.0 - k.c_sigma) * k.mu_eff).sqrt() * (&self.inv_sqrt_c * &mean_diff)
                / sigma;

        // h_sigma stalls the rank-one update while p_sigma is long
        let p_sigma_norm = self.p_sigma.norm();
        let threshold = (1.0 - (1.0 - k.c_sigma).powi(2 * (self.generation as i32 + 1))).sqrt()
            * (1.4 + 2.0 / (n as f64 + 1.0))
            * k.chi_n;
        let h_sigma = if p_sigma_norm < threshold { 1.0 } else { 0.0 };

        self.p_c = (1.0 - k.c_c) * &self.p_c
            + h_sigma * (k.c_c * (2.0 - k.c_c) * k.mu_eff).sqrt() * &mean_diff / sigma;

        let delta_h = (1.0 - h_sigma) * k.c_c * (2.0 - k.c_c);
        let old_weight = 1.0 - k.c_1 - k.c_mu + k.c_1 * delta_h;
        let rank_one = k.c_1 * &self.p_c * self.p_c.transpose();

        let mut rank_mu = DMatrix::zeros(n, n);
        for (w, &x) in k.weights.iter().zip(ranked.iter().take(mu)) {
            let y = (x - &self.mean) / sigma;
            rank_mu += *w * &y * y.transpose();
        }

        self.c = old_weight * &self.c + rank_one + k.c_mu * rank_mu;

        self.sigma *= ((k.c_sigma / k.d_sigma) * (p_sigma_norm / k.chi_n - 1.0)).exp();
        self.sigma = self.sigma.clamp(1e-20, 1e10);

        self.mean = new_mean;
        self.generation += 1;

        if self.generation - self.last_eigen_generation >= (n / 10).max(1) {
            self.update_eigen();
        }
    }

    /// Refreshes B, D and C^-1/2 from a symmetric eigendecomposition of C.
    fn update_eigen(&mut self) {
        self.c = (&self.c + self.c.transpose()) / 2.0;

        let eigen = self.c.clone().symmetric_eigen();
        self.d = eigen.eigenvalues.map(|v| v.max(1e-20).sqrt());
        self.b = eigen.eigenvectors;

        let d_inv = DMatrix::from_diagonal(&self.d.map(|v| 1.0 / v));
        self.inv_sqrt_c = &self.b * d_inv * self.b.transpose();

        self.last_eigen_generation = self.generation;
    }
}

enum Phase {
    Discovery,
    Active(Box<CmaEsAlgorithm>),
}

struct CmaEsState {
    rng: StdRng,
    sigma0: Option<f64>,
    user_lambda: Option<usize>,
    phase: Phase,
    /// Numeric parameters seen in the discovery trial, in first-seen order.
    dimensions: Vec<Dimension>,
    discovery_trial: Option<u64>,
    candidates: Vec<DVector<f64>>,
    /// Trial number → candidate index for the current generation.
    assignments: HashMap<u64, usize>,
    /// Trial numbers in assignment order.
    generation_trials: Vec<u64>,
}

impl CmaEsState {
    fn new(sigma0: Option<f64>, user_lambda: Option<usize>, seed: Option<u64>) -> Self {
        Self {
            rng: rng_util::make_rng(seed),
            sigma0,
            user_lambda,
            phase: Phase::Discovery,
            dimensions: Vec::new(),
            discovery_trial: None,
            candidates: Vec::new(),
            assignments: HashMap::new(),
            generation_trials: Vec::new(),
        }
    }

    fn finish_discovery(&mut self) {
        let algo = CmaEsAlgorithm::new(&self.dimensions, self.sigma0, self.user_lambda);
        self.candidates = algo.generate_candidates(&mut self.rng, &self.dimensions);
        self.assignments.clear();
        self.generation_trials.clear();
        self.phase = Phase::Active(Box::new(algo));
    }

    /// Returns the candidate index for `trial_id`, assigning one if needed.
    fn assign(&mut self, trial_id: u64) -> usize {
        if let Some(&idx) = self.assignments.get(&trial_id) {
            return idx;
        }

        let idx = self.generation_trials.len();
        if idx >= self.candidates.len() {
            // overflow: more concurrent asks than the population size
            if let Phase::Active(algo) = &self.phase {
                let extra = algo.sample_with_rejection(&mut self.rng, &self.dimensions);
                self.candidates.push(extra);
            }
        }
        self.assignments.insert(trial_id, idx);
        self.generation_trials.push(trial_id);
        idx
    }

    /// Runs an update once lambda trials of the current generation are
    /// complete, in assignment order, overflow trials included.
    ///
    /// Trials that never report are skipped, so one abandoned trial cannot
    /// stall the generation.
    fn maybe_update(&mut self, direction: Direction, history: &[CompletedTrial]) {
        let Phase::Active(algo) = &mut self.phase else {
            return;
        };
        let lambda = algo.constants.lambda;
        if self.generation_trials.len() < lambda {
            return;
        }

        let values: HashMap<u64, f64> = history.iter().map(|t| (t.id, t.value)).collect();
        let mut ranked: Vec<(&DVector<f64>, f64)> = Vec::with_capacity(lambda);
        for id in &self.generation_trials {
            if ranked.len() == lambda {
                break;
            }
            let (Some(&value), Some(&idx)) = (values.get(id), self.assignments.get(id)) else {
                continue;
            };
            if let Some(x) = self.candidates.get(idx) {
                ranked.push((x, direction.loss(value)));
            }
        }
        if ranked.len() < lambda {
            return;
        }

        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(core::cmp::Ordering::Equal));
        let ranked_xs: Vec<&DVector<f64>> = ranked.iter().map(|(x, _)| *x).collect();
        algo.update(&ranked_xs);

        self.candidates = algo.generate_candidates(&mut self.rng, &self.dimensions);
        self.assignments.clear();
        self.generation_trials.clear();
    }
}

/// Internal-space bounds of a numeric distribution.
#[allow(clippy::cast_precision_loss)]
fn internal_bounds(distribution: &Distribution) -> Option<(f64, f64)> {
    match distribution {
        Distribution::Float(d) if d.log_scale => Some((d.low.ln(), d.high.ln())),
        Distribution::Float(d) => Some((d.low, d.high)),
        Distribution::Int(d) if d.log_scale => Some(((d.low as f64).ln(), (d.high as f64).ln())),
        Distribution::Int(d) => Some((d.low as f64, d.high as f64)),
        Distribution::Categorical(_) => None,
    }
}

/// Maps an internal-space coordinate back to a parameter value.
fn from_internal(value: f64, distribution: &Distribution) -> Option<ParamValue> {
    match distribution {
        Distribution::Float(d) => {
            let v = if d.log_scale { value.exp() } else { value };
            Some(ParamValue::Float(d.snap(v)))
        }
        Distribution::Int(d) => {
            let v = if d.log_scale { value.exp() } else { value };
            Some(ParamValue::Int(d.snap(v)))
        }
        Distribution::Categorical(_) => None,
    }
}

impl Sampler for CmaEsSampler {
    fn sample(
        &self,
        name: &str,
        distribution: &Distribution,
        trial_id: u64,
        history: &[CompletedTrial],
    ) -> ParamValue {
        let mut state = self.state.lock();

        if matches!(state.phase, Phase::Discovery) {
            match state.discovery_trial {
                None => state.discovery_trial = Some(trial_id),
                Some(id) if id != trial_id => state.finish_discovery(),
                Some(_) => {}
            }
        }

        if matches!(state.phase, Phase::Discovery) {
            if let Some((low, high)) = internal_bounds(distribution) {
                if !state.dimensions.iter().any(|d| d.name == name) {
                    state.dimensions.push(Dimension {
                        name: name.to_string(),
                        distribution: distribution.clone(),
                        low,
                        high,
                    });
                }
            }
            return rng_util::sample_uniform(&mut state.rng, distribution);
        }

        // parameters unknown to the Gaussian are sampled uniformly
        let Some(dim_idx) = state
            .dimensions
            .iter()
            .position(|d| d.name == name && d.distribution == *distribution)
        else {
            return rng_util::sample_uniform(&mut state.rng, distribution);
        };

        state.maybe_update(self.direction, history);
        let candidate_idx = state.assign(trial_id);

        let coordinate = state
            .candidates
            .get(candidate_idx)
            .and_then(|x| x.get(dim_idx).copied());
        match coordinate.and_then(|v| from_internal(v, distribution)) {
            Some(value) => value,
            None => rng_util::sample_uniform(&mut state.rng, distribution),
        }
    }

    fn direction(&self) -> Direction {
        self.direction
    }
}
