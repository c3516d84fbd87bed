//! Study implementation: the ask/tell loop behind each optimizer instance.

use std::collections::HashMap;
use std::sync::Arc;

use crate::distribution::ParamValue;
use crate::error::{Error, Result};
use crate::optimizer::{BestTrial, Optimizer, Params, Proposal};
use crate::sampler::{CompletedTrial, Sampler};
use crate::space::SearchSpace;
use crate::strategy::Strategy;
use crate::trial::Trial;
use crate::types::Direction;

mod builder;

pub use builder::StudyBuilder;

/// A study tracks the trials of one optimization run.
///
/// Trials are created by [`ask`](Optimizer::ask), which samples every
/// parameter of a [`SearchSpace`] through the study's sampler, and completed
/// by [`tell`](Optimizer::tell). Several trials may be running at once;
/// completions can arrive in any order.
///
/// # Examples
///
/// ```
/// use forge_optimizer::prelude::*;
///
/// let space: ParamSpace = [
///     ("x".to_string(), ParamSpec::float(-5.0, 5.0)),
///     ("y".to_string(), ParamSpec::float(-5.0, 5.0)),
/// ]
/// .into_iter()
/// .collect();
/// let space = SearchSpace::compile(&space).unwrap();
///
/// let mut study = Study::builder()
///     .maximize()
///     .strategy(Strategy::CmaEs)
///     .seed(7)
///     .build()
///     .unwrap();
///
/// for _ in 0..20 {
///     let proposal = study.ask(&space).unwrap();
///     let x = proposal.params["x"].as_f64().unwrap();
///     let y = proposal.params["y"].as_f64().unwrap();
///     study.tell(proposal.number, -(x * x + y * y)).unwrap();
/// }
///
/// assert!(study.best_trial().unwrap().value <= 0.0);
/// assert_eq!(study.n_trials(), 20);
/// ```
pub struct Study {
    name: String,
    direction: Direction,
    strategy: Strategy,
    sampler: Arc<dyn Sampler>,
    running: HashMap<u64, Trial>,
    /// Completed trials in tell order.
    completed: Vec<CompletedTrial>,
    next_id: u64,
}

impl Study {
    pub(crate) fn new(
        name: String,
        direction: Direction,
        strategy: Strategy,
        sampler: Arc<dyn Sampler>,
    ) -> Self {
        Self {
            name,
            direction,
            strategy,
            sampler,
            running: HashMap::new(),
            completed: Vec::new(),
            next_id: 0,
        }
    }

    /// Return a [`StudyBuilder`] for constructing a study with a fluent API.
    #[must_use]
    pub fn builder() -> StudyBuilder {
        StudyBuilder::new()
    }

    /// Return the optimization direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Completed trials in the order they were told.
    #[must_use]
    pub fn trials(&self) -> &[CompletedTrial] {
        &self.completed
    }

    /// Number of trials asked but not yet told.
    #[must_use]
    pub fn n_running(&self) -> usize {
        self.running.len()
    }

    /// Returns `true` if `a` is strictly better than `b` in this direction.
    fn is_better(&self, a: f64, b: f64) -> bool {
        self.direction.loss(a) < self.direction.loss(b)
    }

    fn decode(trial: &CompletedTrial) -> Params {
        trial
            .params
            .iter()
            .filter_map(|(name, value)| {
                let distribution = trial.distributions.get(name)?;
                Some((name.clone(), distribution.decode(value)?))
            })
            .collect()
    }
}

impl core::fmt::Debug for Study {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Study")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("strategy", &self.strategy)
            .field("running", &self.running.len())
            .field("completed", &self.completed.len())
            .finish_non_exhaustive()
    }
}

impl Optimizer for Study {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn ask(&mut self, space: &SearchSpace) -> Result<Proposal> {
        let number = self.next_id;
        let mut trial = Trial::new(number, Arc::clone(&self.sampler));

        let mut params = Params::new();
        for (name, distribution) in space.iter() {
            let value: ParamValue = trial.suggest(name, distribution, &self.completed)?;
            let decoded = distribution.decode(&value).ok_or_else(|| {
                Error::InconsistentState(format!(
                    "sampler returned {value:?} for parameter '{name}'"
                ))
            })?;
            params.insert(name.to_string(), decoded);
        }

        self.running.insert(number, trial);
        self.next_id += 1;

        trace_debug!(study = %self.name, trial = number, "trial asked");

        Ok(Proposal { number, params })
    }

    fn tell(&mut self, number: u64, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::NonFiniteValue(value));
        }

        match self.running.remove(&number) {
            Some(trial) => {
                self.completed.push(trial.into_completed(value));
                Ok(())
            }
            None if self.completed.iter().any(|t| t.id == number) => {
                Err(Error::TrialAlreadyFinished(number))
            }
            None => Err(Error::UnknownTrialNumber(number)),
        }
    }

    fn best_trial(&self) -> Option<BestTrial> {
        let mut best: Option<&CompletedTrial> = None;
        for trial in &self.completed {
            // strict comparison keeps the earliest trial on ties
            if best.is_none_or(|b| self.is_better(trial.value, b.value)) {
                best = Some(trial);
            }
        }

        best.map(|t| BestTrial {
            number: t.id,
            value: t.value,
            params: Self::decode(t),
        })
    }

    fn n_trials(&self) -> usize {
        self.running.len() + self.completed.len()
    }
}
