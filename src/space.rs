//! Parameter space declarations and their validated form.
//!
//! Callers declare a [`ParamSpace`], a map from parameter name to a
//! [`ParamSpec`] in the JSON wire shape
//! `{"type": "float"|"int"|"categorical", "low", "high", "step", "log", "choices"}`.
//! [`SearchSpace::compile`] validates every entry and turns it into a
//! [`Distribution`] the samplers understand.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::distribution::{
    CategoricalDistribution, Distribution, FloatDistribution, IntDistribution,
};
use crate::error::{Error, Result};

/// A declared parameter space, ordered by parameter name.
pub type ParamSpace = BTreeMap<String, ParamSpec>;

/// One parameter as declared on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// `"float"`, `"int"` or `"categorical"`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Lower bound for numeric kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    /// Upper bound for numeric kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    /// Discretization step for numeric kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Sample on a log scale.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub log: bool,
    /// Ordered choices for the categorical kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
}

impl ParamSpec {
    /// A continuous parameter in `[low, high]`.
    #[must_use]
    pub fn float(low: f64, high: f64) -> Self {
        Self {
            kind: "float".to_string(),
            low: Some(low),
            high: Some(high),
            ..Self::default()
        }
    }

    /// An integer parameter in `[low, high]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn int(low: i64, high: i64) -> Self {
        Self {
            kind: "int".to_string(),
            low: Some(low as f64),
            high: Some(high as f64),
            ..Self::default()
        }
    }

    /// A categorical parameter over `choices`.
    #[must_use]
    pub fn categorical<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            kind: "categorical".to_string(),
            choices: Some(choices.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Sets the log-scale flag.
    #[must_use]
    pub fn log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Sets the step.
    #[must_use]
    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Validates this declaration and converts it into a distribution.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `name` when the kind is missing or
    /// unknown, bounds are absent, reversed or non-finite, an integer field is
    /// fractional, the step is not positive, log scale is combined with a
    /// non-positive lower bound or with a step, or a categorical has no
    /// choices.
    pub fn to_distribution(&self, name: &str) -> Result<Distribution> {
        match self.kind.as_str() {
            "float" => self.float_distribution(name).map(Distribution::Float),
            "int" => self.int_distribution(name).map(Distribution::Int),
            "categorical" => match &self.choices {
                Some(choices) if !choices.is_empty() => {
                    Ok(Distribution::Categorical(CategoricalDistribution {
                        choices: choices.clone(),
                    }))
                }
                _ => Err(Error::EmptyChoices(name.to_string())),
            },
            "" => Err(Error::MissingField {
                name: name.to_string(),
                field: "type",
            }),
            other => Err(Error::UnsupportedKind {
                name: name.to_string(),
                kind: other.to_string(),
            }),
        }
    }

    fn bounds(&self, name: &str) -> Result<(f64, f64)> {
        let low = self.low.ok_or_else(|| Error::MissingField {
            name: name.to_string(),
            field: "low",
        })?;
        let high = self.high.ok_or_else(|| Error::MissingField {
            name: name.to_string(),
            field: "high",
        })?;
        // the span must stay finite for uniform draws over it
        if !(high - low).is_finite() || low > high {
            return Err(Error::InvalidBounds {
                name: name.to_string(),
                low,
                high,
            });
        }
        Ok((low, high))
    }

    fn float_distribution(&self, name: &str) -> Result<FloatDistribution> {
        let (low, high) = self.bounds(name)?;
        if let Some(step) = self.step {
            if !(step.is_finite() && step > 0.0) {
                return Err(Error::InvalidStep(name.to_string()));
            }
        }
        if self.log {
            if low <= 0.0 {
                return Err(Error::InvalidLogBounds(name.to_string()));
            }
            if self.step.is_some() {
                return Err(log_with_step(name));
            }
        }

        Ok(FloatDistribution {
            low,
            high,
            log_scale: self.log,
            step: self.step,
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn int_distribution(&self, name: &str) -> Result<IntDistribution> {
        let (low, high) = self.bounds(name)?;
        let integral = |field: &'static str, value: f64| {
            if value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
                Ok(value as i64)
            } else {
                Err(Error::NonIntegral {
                    name: name.to_string(),
                    field,
                    value,
                })
            }
        };
        let low = integral("low", low)?;
        let high = integral("high", high)?;

        let step = match self.step {
            None => None,
            Some(s) if s.is_finite() && s > 0.0 => match integral("step", s)? {
                1 => None,
                n => Some(n),
            },
            Some(_) => return Err(Error::InvalidStep(name.to_string())),
        };
        if self.log {
            if low < 1 {
                return Err(Error::InvalidLogBounds(name.to_string()));
            }
            if step.is_some() {
                return Err(log_with_step(name));
            }
        }

        Ok(IntDistribution {
            low,
            high,
            log_scale: self.log,
            step,
        })
    }
}

fn log_with_step(name: &str) -> Error {
    Error::InvalidInput(format!(
        "parameter '{name}' cannot combine log scale with a step"
    ))
}

/// A validated parameter space: one distribution per name, in name order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchSpace {
    params: Vec<(String, Distribution)>,
}

impl SearchSpace {
    /// Validates every entry of `space`.
    ///
    /// # Errors
    ///
    /// Returns the first validation error; see [`ParamSpec::to_distribution`].
    pub fn compile(space: &ParamSpace) -> Result<Self> {
        let params = space
            .iter()
            .map(|(name, spec)| Ok((name.clone(), spec.to_distribution(name)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { params })
    }

    /// Iterates `(name, distribution)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Distribution)> {
        self.params.iter().map(|(name, d)| (name.as_str(), d))
    }

    /// Looks up a distribution by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Distribution> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` when no parameters are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns `true` when every parameter is a float or an int.
    #[must_use]
    pub fn is_all_numeric(&self) -> bool {
        self.params.iter().all(|(_, d)| d.is_numeric())
    }
}
