//! The opaque optimizer interface the coordinator drives.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::space::SearchSpace;
use crate::strategy::Strategy;

/// Parameter values as handed to callers, keyed by name.
pub type Params = BTreeMap<String, Value>;

/// One proposal returned by [`Optimizer::ask`].
#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    /// Internal trial number; pass it back to [`Optimizer::tell`].
    pub number: u64,
    /// One value per declared parameter.
    pub params: Params,
}

/// The best completed trial of an optimizer.
#[derive(Clone, Debug, PartialEq)]
pub struct BestTrial {
    /// Internal trial number.
    pub number: u64,
    /// Observed value.
    pub value: f64,
    /// Parameter values of that trial.
    pub params: Params,
}

/// A black-box optimizer with its own belief state.
///
/// Implementations propose parameter values with [`ask`](Self::ask) and
/// learn from values reported through [`tell`](Self::tell). The coordinator
/// holds one per server behind a lock, so methods take `&mut self` for
/// mutation.
pub trait Optimizer: Send + Sync {
    /// The search strategy this instance was created with.
    fn strategy(&self) -> Strategy;

    /// Instance identity.
    fn name(&self) -> &str;

    /// Proposes values for every parameter of `space`.
    ///
    /// Advances the internal trial counter by one on success.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter cannot be sampled; the counter is not
    /// advanced in that case.
    fn ask(&mut self, space: &SearchSpace) -> Result<Proposal>;

    /// Reports the observed value of trial `number`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownTrialNumber`, `Error::TrialAlreadyFinished` or
    /// `Error::NonFiniteValue`.
    fn tell(&mut self, number: u64, value: f64) -> Result<()>;

    /// The best completed trial, if any.
    fn best_trial(&self) -> Option<BestTrial>;

    /// Number of trials asked so far, running or complete.
    fn n_trials(&self) -> usize;
}
