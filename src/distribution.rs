//! Parameter distribution types and the values sampled from them.

use serde_json::Value;

/// Distribution for floating-point parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatDistribution {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
    /// Whether to sample in log space.
    pub log_scale: bool,
    /// Optional step size for discretization.
    pub step: Option<f64>,
}

impl FloatDistribution {
    /// Clamps `value` into bounds and onto the step grid, if any.
    ///
    /// The largest grid point is `low + floor((high - low) / step) * step`,
    /// which may lie below `high`.
    #[must_use]
    pub fn snap(&self, value: f64) -> f64 {
        let value = value.clamp(self.low, self.high);
        match self.step {
            Some(step) => {
                let n_steps = self.n_steps(step);
                let k = ((value - self.low) / step).round().clamp(0.0, n_steps);
                (self.low + k * step).min(self.high)
            }
            None => value,
        }
    }

    /// Number of whole steps in the range, tolerating rounding error in
    /// the division.
    pub(crate) fn n_steps(&self, step: f64) -> f64 {
        ((self.high - self.low) / step + 1e-9).floor()
    }
}

/// Distribution for integer parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct IntDistribution {
    /// Lower bound (inclusive).
    pub low: i64,
    /// Upper bound (inclusive).
    pub high: i64,
    /// Whether to sample in log space.
    pub log_scale: bool,
    /// Optional step size for discretization.
    pub step: Option<i64>,
}

impl IntDistribution {
    /// Rounds `value` to the nearest in-bounds integer on the step grid.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn snap(&self, value: f64) -> i64 {
        match self.step {
            Some(step) => {
                let n_steps = (self.high - self.low) / step;
                let k = ((value - self.low as f64) / step as f64)
                    .round()
                    .clamp(0.0, n_steps as f64) as i64;
                self.low + k * step
            }
            None => (value.round() as i64).clamp(self.low, self.high),
        }
    }
}

/// Distribution for categorical parameters.
///
/// The choice values are kept so a sampled index can be turned back into the
/// caller's value; their order is the index order.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoricalDistribution {
    /// The declared choices, in declaration order.
    pub choices: Vec<Value>,
}

impl CategoricalDistribution {
    /// Number of choices available.
    #[must_use]
    pub fn n_choices(&self) -> usize {
        self.choices.len()
    }
}

/// Enum wrapping all parameter distribution types.
#[derive(Clone, Debug, PartialEq)]
pub enum Distribution {
    /// A floating-point distribution.
    Float(FloatDistribution),
    /// An integer distribution.
    Int(IntDistribution),
    /// A categorical distribution.
    Categorical(CategoricalDistribution),
}

impl Distribution {
    /// Returns `true` for float and int distributions.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Categorical(_))
    }

    /// Converts a sampled value into the caller-facing JSON value.
    ///
    /// Floats and ints become JSON numbers and categorical indices become
    /// the declared choice. Returns `None` when the value does not belong to
    /// this distribution.
    #[must_use]
    pub fn decode(&self, value: &ParamValue) -> Option<Value> {
        match (self, value) {
            (Self::Float(_), ParamValue::Float(v)) => Some(Value::from(*v)),
            (Self::Int(_), ParamValue::Int(v)) => Some(Value::from(*v)),
            (Self::Categorical(d), ParamValue::Categorical(i)) => d.choices.get(*i).cloned(),
            _ => None,
        }
    }
}

/// A sampled parameter value in the optimizer's internal representation.
///
/// Categorical values are stored as an index into the choices array.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// A floating-point parameter value.
    Float(f64),
    /// An integer parameter value.
    Int(i64),
    /// A categorical parameter value, stored as an index into the choices array.
    Categorical(usize),
}
