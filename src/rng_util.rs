//! Random draws shared by the samplers.

use rand::Rng;
use rand::rngs::StdRng;

use crate::distribution::{Distribution, ParamValue};

/// Builds the sampler RNG from an optional seed.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    use rand::SeedableRng;

    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

/// Samples uniformly from a distribution, respecting log scale and step.
///
/// Used for the startup phase of TPE and the discovery trial of CMA-ES.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn sample_uniform(rng: &mut StdRng, distribution: &Distribution) -> ParamValue {
    match distribution {
        Distribution::Float(d) => {
            let value = if d.log_scale {
                let log_low = d.low.ln();
                let log_high = d.high.ln();
                rng.random_range(log_low..=log_high).exp().clamp(d.low, d.high)
            } else if let Some(step) = d.step {
                let n_steps = d.n_steps(step) as i64;
                let k = rng.random_range(0..=n_steps);
                (d.low + (k as f64) * step).min(d.high)
            } else {
                rng.random_range(d.low..=d.high)
            };
            ParamValue::Float(value)
        }
        Distribution::Int(d) => {
            let value = if d.log_scale {
                let log_low = (d.low as f64).ln();
                let log_high = (d.high as f64).ln();
                let raw = rng.random_range(log_low..=log_high).exp().round() as i64;
                raw.clamp(d.low, d.high)
            } else if let Some(step) = d.step {
                let n_steps = (d.high - d.low) / step;
                let k = rng.random_range(0..=n_steps);
                d.low + k * step
            } else {
                rng.random_range(d.low..=d.high)
            };
            ParamValue::Int(value)
        }
        Distribution::Categorical(d) => ParamValue::Categorical(rng.random_range(0..d.n_choices())),
    }
}

/// Sample a value from the standard normal distribution using Box-Muller transform.
pub(crate) fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..=1.0);
    let u2: f64 = rng.random_range(0.0_f64..=core::f64::consts::TAU);
    (-2.0 * u1.ln()).sqrt() * u2.cos()
}
