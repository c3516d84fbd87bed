//! Request and response types of the four coordinator operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ledger::TrialRecord;
use crate::optimizer::Params;
use crate::space::ParamSpace;
use crate::strategy::Strategy;

/// Arguments of `suggest_trial`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestRequest {
    /// The tuning target.
    pub server_id: String,
    /// The declared parameter space.
    pub param_space: ParamSpace,
}

/// A freshly issued trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Globally unique trial identity, `t_` followed by 10 hex digits.
    pub trial_id: String,
    /// One value per declared parameter.
    #[serde(rename = "candidate_params")]
    pub params: Params,
    /// Strategy of the server's optimizer.
    #[serde(rename = "sampler")]
    pub strategy: Strategy,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Arguments of `record_feedback`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Trial identity returned by a suggest.
    pub trial_id: String,
    /// Observed reward; higher is better.
    pub reward: f64,
    /// Free-form metrics stored alongside the reward.
    #[serde(default)]
    pub metrics: Option<BTreeMap<String, Value>>,
}

/// Result of `record_feedback`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    /// Always `true` for a successful call.
    pub accepted: bool,
    /// The optimizer has at least one completed trial.
    pub updated_best: bool,
    /// Best value after this feedback.
    pub best_value: Option<f64>,
    /// Trials asked on the server so far, running or complete.
    pub study_size: usize,
}

/// Result of `get_best_config`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BestConfig {
    /// Parameters of the best trial; empty when there is none.
    pub best_params: Params,
    /// Best observed value.
    pub best_value: Option<f64>,
    /// Identity of the matching ledger record, if one matches exactly.
    pub trial_id: Option<String>,
}

/// Result of `get_trial_history`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrialHistory {
    /// All records in suggestion order.
    pub trials: Vec<TrialRecord>,
}
