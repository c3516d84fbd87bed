//! Server identity → optimizer instance, and trial identity → handle.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;

use super::ledger::TrialLedger;
use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::optimizer::Optimizer;
use crate::space::SearchSpace;
use crate::strategy::Strategy;
use crate::study::Study;

/// Immutable link from a trial identity to its optimizer trial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TrialHandle {
    pub(crate) trial_id: String,
    pub(crate) server_id: String,
    pub(crate) study_name: String,
    pub(crate) trial_number: u64,
    pub(crate) created_at: String,
}

/// Everything owned by one server, guarded by a single lock.
pub(crate) struct ServerState {
    pub(crate) optimizer: Box<dyn Optimizer>,
    /// The space the optimizer was created with.
    pub(crate) declared: SearchSpace,
    pub(crate) ledger: TrialLedger,
}

pub(crate) type SharedServer = Arc<RwLock<ServerState>>;

/// The two registry indices.
///
/// The outer maps are only locked long enough to look up or insert an
/// entry; per-server work happens under that server's own lock, so
/// different servers never block each other.
#[derive(Default)]
pub(crate) struct OptimizerRegistry {
    servers: RwLock<HashMap<String, SharedServer>>,
    handles: RwLock<HashMap<String, TrialHandle>>,
}

pub(crate) fn study_name(server_id: &str) -> String {
    format!("forge_opt_{server_id}")
}

impl OptimizerRegistry {
    pub(crate) fn server(&self, server_id: &str) -> Option<SharedServer> {
        self.servers.read().get(server_id).cloned()
    }

    /// Returns the server's state, creating its optimizer on first use.
    ///
    /// The strategy is chosen from `space` only on creation. The boolean is
    /// `true` when this call created the instance.
    pub(crate) fn get_or_create(
        &self,
        server_id: &str,
        space: &SearchSpace,
        config: &CoordinatorConfig,
    ) -> Result<(SharedServer, bool)> {
        if let Some(existing) = self.server(server_id) {
            return Ok((existing, false));
        }

        let mut servers = self.servers.write();
        // another caller may have won the race between the two locks
        if let Some(existing) = servers.get(server_id) {
            return Ok((Arc::clone(existing), false));
        }

        let strategy = Strategy::select(space);
        let study = Study::builder()
            .name(study_name(server_id))
            .maximize()
            .strategy(strategy)
            .maybe_seed(config.seed)
            .tpe(config.tpe.clone())
            .cma_es(config.cma_es.clone())
            .build()?;

        let state = Arc::new(RwLock::new(ServerState {
            optimizer: Box::new(study),
            declared: space.clone(),
            ledger: TrialLedger::default(),
        }));
        servers.insert(server_id.to_string(), Arc::clone(&state));

        trace_info!(server_id, strategy = %strategy, "optimizer instance created");
        Ok((state, true))
    }

    pub(crate) fn handle(&self, trial_id: &str) -> Option<TrialHandle> {
        self.handles.read().get(trial_id).cloned()
    }

    /// Inserts `handle` unless its trial identity is taken.
    pub(crate) fn try_insert_handle(&self, handle: TrialHandle) -> bool {
        match self.handles.write().entry(handle.trial_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    pub(crate) fn server_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.servers.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn handle_count(&self) -> usize {
        self.handles.read().len()
    }
}
