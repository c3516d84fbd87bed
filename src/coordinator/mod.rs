//! The optimization coordinator.
//!
//! A [`Coordinator`] owns one optimizer per server identity and the ledger of
//! every trial it issued. Clients [`suggest`](Coordinator::suggest) a
//! configuration, run it, and report the reward with
//! [`record_feedback`](Coordinator::record_feedback); the server's optimizer
//! uses the feedback to steer later suggestions.
//!
//! # Examples
//!
//! ```
//! use forge_optimizer::prelude::*;
//!
//! let coordinator = Coordinator::new();
//! let space: ParamSpace = [
//!     ("lr".to_string(), ParamSpec::float(0.001, 0.1).log(true)),
//!     ("batch".to_string(), ParamSpec::int(8, 128)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let suggestion = coordinator.suggest("svc-a", &space).unwrap();
//! assert_eq!(suggestion.strategy, Strategy::CmaEs);
//!
//! let receipt = coordinator
//!     .record_feedback(&suggestion.trial_id, 0.87, None)
//!     .unwrap();
//! assert!(receipt.updated_best);
//!
//! let best = coordinator.best_config("svc-a");
//! assert_eq!(best.best_value, Some(0.87));
//! assert_eq!(best.trial_id.as_deref(), Some(suggestion.trial_id.as_str()));
//! ```

mod api;
mod ledger;
mod registry;

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

pub use api::{
    BestConfig, FeedbackReceipt, FeedbackRequest, SuggestRequest, Suggestion, TrialHistory,
};
pub use ledger::TrialRecord;

use registry::{OptimizerRegistry, TrialHandle};

use crate::config::{CmaEsConfig, CoordinatorConfig, ShapePolicy, TpeConfig};
use crate::error::{Error, Result};
use crate::space::{ParamSpace, SearchSpace};

const TRIAL_ID_HEX_LEN: usize = 10;

/// Coordinates per-server optimizers and their trial ledgers.
///
/// All methods take `&self`; the coordinator is meant to be shared, e.g.
/// behind an `Arc`, between request handlers.
pub struct Coordinator {
    config: CoordinatorConfig,
    registry: OptimizerRegistry,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("servers", &self.registry.server_ids())
            .field("trials", &self.registry.handle_count())
            .finish()
    }
}

impl Coordinator {
    /// Creates a coordinator with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
            registry: OptimizerRegistry::default(),
        }
    }

    /// Creates a coordinator from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn with_config(config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: OptimizerRegistry::default(),
        })
    }

    /// Returns a [`CoordinatorBuilder`].
    #[must_use]
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Issues a new trial for `server_id` over `param_space`.
    ///
    /// The server's optimizer is created on the first call, with a strategy
    /// chosen from the shape of that first space; later calls reuse it.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error for an empty server identity, an empty
    /// or malformed space, or (under [`ShapePolicy::Reject`]) a space that
    /// differs from the one the optimizer was created with. Nothing is
    /// recorded when an error is returned.
    pub fn suggest(&self, server_id: &str, param_space: &ParamSpace) -> Result<Suggestion> {
        let space = match validate_space(server_id, param_space) {
            Ok(space) => space,
            Err(e) => {
                trace_debug!(server_id, error = %e, "suggest rejected");
                return Err(e);
            }
        };

        let (server, created) = self.registry.get_or_create(server_id, &space, &self.config)?;
        let mut state = server.write();

        if !created && self.config.shape_policy == ShapePolicy::Reject && state.declared != space
        {
            trace_debug!(server_id, "suggest rejected: parameter space changed");
            return Err(Error::InvalidInput(format!(
                "param_space for server '{server_id}' differs from the one it was created with"
            )));
        }

        let proposal = state.optimizer.ask(&space)?;
        let strategy = state.optimizer.strategy();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let trial_id = loop {
            let candidate = mint_trial_id();
            let handle = TrialHandle {
                trial_id: candidate.clone(),
                server_id: server_id.to_string(),
                study_name: state.optimizer.name().to_string(),
                trial_number: proposal.number,
                created_at: created_at.clone(),
            };
            if self.registry.try_insert_handle(handle) {
                break candidate;
            }
        };

        state.ledger.append(TrialRecord {
            trial_id: trial_id.clone(),
            server_id: server_id.to_string(),
            params: proposal.params.clone(),
            reward: None,
            metrics: BTreeMap::new(),
            strategy,
            created_at: created_at.clone(),
        });

        trace_info!(
            server_id,
            trial_id = %trial_id,
            number = proposal.number,
            strategy = %strategy,
            "trial suggested"
        );

        Ok(Suggestion {
            trial_id,
            params: proposal.params,
            strategy,
            created_at,
        })
    }

    /// Reports the reward observed for `trial_id`.
    ///
    /// Repeated feedback for the same trial replaces the stored reward and
    /// metrics; the optimizer keeps its first observation.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a non-finite reward,
    /// `Error::UnknownTrial` for a trial identity that was never issued and
    /// `Error::InconsistentState` if the trial's server state is missing.
    pub fn record_feedback(
        &self,
        trial_id: &str,
        reward: f64,
        metrics: Option<BTreeMap<String, Value>>,
    ) -> Result<FeedbackReceipt> {
        if !reward.is_finite() {
            trace_debug!(trial_id, reward, "feedback rejected: non-finite reward");
            return Err(Error::InvalidInput(format!(
                "reward must be a finite number, got {reward}"
            )));
        }

        let handle = self
            .registry
            .handle(trial_id)
            .ok_or_else(|| Error::UnknownTrial(trial_id.to_string()))?;
        let server = self.registry.server(&handle.server_id).ok_or_else(|| {
            Error::InconsistentState(format!(
                "no optimizer for server '{}' of trial {trial_id}",
                handle.server_id
            ))
        })?;

        let mut state = server.write();
        if state.optimizer.name() != handle.study_name {
            return Err(Error::InconsistentState(format!(
                "trial {trial_id} belongs to '{}' but server '{}' runs '{}'",
                handle.study_name,
                handle.server_id,
                state.optimizer.name()
            )));
        }
        if !state.ledger.contains(trial_id) {
            return Err(Error::InconsistentState(format!(
                "trial {trial_id} missing from the ledger of '{}'",
                handle.server_id
            )));
        }

        match state.optimizer.tell(handle.trial_number, reward) {
            Ok(()) => {}
            Err(Error::TrialAlreadyFinished(_)) => {
                trace_warn!(
                    trial_id,
                    number = handle.trial_number,
                    study = %handle.study_name,
                    "duplicate feedback; optimizer keeps the first reward"
                );
            }
            Err(e) => return Err(Error::InconsistentState(e.to_string())),
        }

        state
            .ledger
            .record_outcome(trial_id, reward, metrics.unwrap_or_default());

        let best_value = state.optimizer.best_trial().map(|b| b.value);
        let study_size = state.optimizer.n_trials();

        trace_info!(
            trial_id,
            reward,
            suggested_at = %handle.created_at,
            best_value = ?best_value,
            study_size,
            "feedback recorded"
        );

        Ok(FeedbackReceipt {
            accepted: true,
            updated_best: best_value.is_some(),
            best_value,
            study_size,
        })
    }

    /// The best configuration seen for `server_id`.
    ///
    /// Unknown servers and servers without completed trials yield an empty
    /// result.
    #[must_use]
    pub fn best_config(&self, server_id: &str) -> BestConfig {
        let Some(server) = self.registry.server(server_id) else {
            return BestConfig::default();
        };
        let state = server.read();
        let Some(best) = state.optimizer.best_trial() else {
            return BestConfig::default();
        };

        let trial_id = state
            .ledger
            .find_best_match(best.value, &best.params)
            .map(|r| r.trial_id.clone());

        BestConfig {
            best_params: best.params,
            best_value: Some(best.value),
            trial_id,
        }
    }

    /// Every trial issued for `server_id`, in suggestion order.
    #[must_use]
    pub fn trial_history(&self, server_id: &str) -> TrialHistory {
        let trials = self
            .registry
            .server(server_id)
            .map(|server| server.read().ledger.history())
            .unwrap_or_default();
        TrialHistory { trials }
    }

    /// Known server identities, sorted.
    #[must_use]
    pub fn servers(&self) -> Vec<String> {
        self.registry.server_ids()
    }

    /// Number of trials issued across all servers.
    #[must_use]
    pub fn trial_count(&self) -> usize {
        self.registry.handle_count()
    }

    /// Number of trials issued for one server; zero if unknown.
    #[must_use]
    pub fn server_trial_count(&self, server_id: &str) -> usize {
        self.registry
            .server(server_id)
            .map_or(0, |server| server.read().ledger.len())
    }
}

/// Builder for [`Coordinator`], validated on [`build`](Self::build).
///
/// ```
/// use forge_optimizer::{Coordinator, ShapePolicy};
///
/// let coordinator = Coordinator::builder()
///     .seed(Some(7))
///     .shape_policy(ShapePolicy::Reject)
///     .build()
///     .unwrap();
/// assert_eq!(coordinator.config().seed, Some(7));
/// ```
#[derive(Clone, Debug, Default)]
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorBuilder {
    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the sampler seed; `None` draws from OS entropy.
    #[must_use]
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    /// Sets the shape policy.
    #[must_use]
    pub fn shape_policy(mut self, policy: ShapePolicy) -> Self {
        self.config.shape_policy = policy;
        self
    }

    /// Sets the TPE settings.
    #[must_use]
    pub fn tpe(mut self, tpe: TpeConfig) -> Self {
        self.config.tpe = tpe;
        self
    }

    /// Sets the CMA-ES settings.
    #[must_use]
    pub fn cma_es(mut self, cma_es: CmaEsConfig) -> Self {
        self.config.cma_es = cma_es;
        self
    }

    /// Builds the coordinator.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a value is out of range.
    pub fn build(self) -> Result<Coordinator> {
        Coordinator::with_config(self.config)
    }
}

fn validate_space(server_id: &str, param_space: &ParamSpace) -> Result<SearchSpace> {
    if server_id.is_empty() {
        return Err(Error::InvalidInput("server_id must not be empty".to_string()));
    }
    if param_space.is_empty() {
        return Err(Error::InvalidInput("param_space must not be empty".to_string()));
    }
    SearchSpace::compile(param_space)
}

fn mint_trial_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("t_{}", &hex[..TRIAL_ID_HEX_LEN])
}
