//! Per-server record of every issued trial.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::optimizer::Params;
use crate::strategy::Strategy;

/// The user-facing record of one suggested trial.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
    /// Globally unique trial identity.
    pub trial_id: String,
    /// Owning server; implied by the ledger the record lives in.
    #[serde(skip)]
    pub server_id: String,
    /// Proposed parameter values.
    pub params: Params,
    /// Reported reward, absent until feedback arrives.
    pub reward: Option<f64>,
    /// Reported metrics, empty until feedback arrives.
    pub metrics: BTreeMap<String, Value>,
    /// Strategy that produced the proposal.
    #[serde(rename = "sampler")]
    pub strategy: Strategy,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Append-only list of a server's trial records, in suggestion order.
#[derive(Debug, Default)]
pub(crate) struct TrialLedger {
    records: Vec<TrialRecord>,
}

impl TrialLedger {
    pub(crate) fn append(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    pub(crate) fn contains(&self, trial_id: &str) -> bool {
        self.records.iter().any(|r| r.trial_id == trial_id)
    }

    /// Overwrites reward and metrics of `trial_id`; `false` if absent.
    pub(crate) fn record_outcome(
        &mut self,
        trial_id: &str,
        reward: f64,
        metrics: BTreeMap<String, Value>,
    ) -> bool {
        match self.records.iter_mut().find(|r| r.trial_id == trial_id) {
            Some(record) => {
                record.reward = Some(reward);
                record.metrics = metrics;
                true
            }
            None => false,
        }
    }

    /// First record whose stored reward and params both equal the given ones.
    #[allow(clippy::float_cmp)]
    pub(crate) fn find_best_match(&self, value: f64, params: &Params) -> Option<&TrialRecord> {
        self.records
            .iter()
            .find(|r| r.reward == Some(value) && r.params == *params)
    }

    pub(crate) fn history(&self) -> Vec<TrialRecord> {
        self.records.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
