use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a request field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Returned when feedback names a trial identity that was never issued.
    #[error("unknown trial_id {0}")]
    UnknownTrial(String),

    /// Returned when the registry and the ledger disagree.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds for '{name}': low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The parameter name.
        name: String,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when log scale is used with non-positive bounds.
    #[error("invalid log bounds for '{0}': low must be positive for log scale")]
    InvalidLogBounds(String),

    /// Returned when step size is not positive.
    #[error("invalid step for '{0}': step must be positive")]
    InvalidStep(String),

    /// Returned when categorical choices are empty.
    #[error("categorical param '{0}' missing choices")]
    EmptyChoices(String),

    /// Returned when a parameter declares a kind other than float, int or categorical.
    #[error("unsupported parameter type '{kind}' for {name}")]
    UnsupportedKind {
        /// The parameter name.
        name: String,
        /// The declared kind.
        kind: String,
    },

    /// Returned when a required specification field is absent.
    #[error("parameter '{name}' is missing required field '{field}'")]
    MissingField {
        /// The parameter name.
        name: String,
        /// The missing field.
        field: &'static str,
    },

    /// Returned when an integer parameter is declared with fractional values.
    #[error("parameter '{name}' field '{field}' must be an integer, got {value}")]
    NonIntegral {
        /// The parameter name.
        name: String,
        /// The offending field.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Returned when a parameter is suggested with a different configuration.
    #[error("parameter conflict for '{name}': {reason}")]
    ParameterConflict {
        /// The name of the conflicting parameter.
        name: String,
        /// The reason for the conflict.
        reason: String,
    },

    /// Returned when `tell` names a trial number the study never issued.
    #[error("trial number {0} was never asked")]
    UnknownTrialNumber(u64),

    /// Returned when `tell` is called twice for the same trial number.
    #[error("trial number {0} is already finished")]
    TrialAlreadyFinished(u64),

    /// Returned when an objective value is NaN or infinite.
    #[error("objective value must be finite, got {0}")]
    NonFiniteValue(f64),

    /// Returned when gamma is not in the valid range (0.0, 1.0).
    #[error("invalid gamma: {0} must be in (0.0, 1.0)")]
    InvalidGamma(f64),

    /// Returned when bandwidth is not positive.
    #[error("invalid bandwidth: {0} must be positive")]
    InvalidBandwidth(f64),

    /// Returned when KDE is created with empty samples.
    #[error("KDE requires at least one sample")]
    EmptySamples,

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of [`Error`] exposed to callers of the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The caller sent something malformed; nothing was mutated.
    InvalidInput,
    /// The trial identity is not known; a fresh suggest is needed.
    UnknownTrial,
    /// An internal invariant broke; not retryable.
    InconsistentState,
}

impl ErrorKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::UnknownTrial => "unknown_trial",
            Self::InconsistentState => "inconsistent_state",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classifies this error for the operation boundary.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTrial(_) => ErrorKind::UnknownTrial,
            Self::InconsistentState(_)
            | Self::ParameterConflict { .. }
            | Self::UnknownTrialNumber(_)
            | Self::TrialAlreadyFinished(_)
            | Self::EmptySamples
            | Self::InvalidBandwidth(_) => ErrorKind::InconsistentState,
            Self::InvalidInput(_)
            | Self::InvalidBounds { .. }
            | Self::InvalidLogBounds(_)
            | Self::InvalidStep(_)
            | Self::EmptyChoices(_)
            | Self::UnsupportedKind { .. }
            | Self::MissingField { .. }
            | Self::NonIntegral { .. }
            | Self::NonFiniteValue(_)
            | Self::InvalidGamma(_)
            | Self::InvalidConfig(_) => ErrorKind::InvalidInput,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
