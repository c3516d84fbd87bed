#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![warn(clippy::pedantic)]
#![warn(clippy::std_instead_of_core)]

//! Per-server hyperparameter search coordinator.
//!
//! Many independent tuning targets ("servers") each get one long-lived
//! optimizer, chosen from the shape of the first parameter space they
//! declare. Clients ask for a candidate configuration, run it, and report a
//! reward; the optimizer uses the reward to steer later candidates toward
//! better regions.
//!
//! # Getting Started
//!
//! ```
//! use forge_optimizer::prelude::*;
//!
//! let coordinator = Coordinator::new();
//! let space: ParamSpace = [("optimizer".to_string(), ParamSpec::categorical(["adam", "sgd"]))]
//!     .into_iter()
//!     .collect();
//!
//! let suggestion = coordinator.suggest("svc-b", &space).unwrap();
//! assert_eq!(suggestion.strategy, Strategy::Tpe);
//!
//! coordinator
//!     .record_feedback(&suggestion.trial_id, 0.42, None)
//!     .unwrap();
//! assert_eq!(coordinator.trial_history("svc-b").trials.len(), 1);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Coordinator`] | Suggest, record feedback, and query best config and history per server. |
//! | [`ParamSpace`] / [`ParamSpec`] | Declare the search space in its JSON wire shape. |
//! | [`Strategy`] | `tpe` or `cmaes`, fixed per server at creation. |
//! | [`Optimizer`] | The ask/tell interface behind each server, implemented by [`Study`]. |
//! | [`Sampler`](sampler::Sampler) | Per-parameter proposal logic ([`TpeSampler`](sampler::tpe::TpeSampler), [`CmaEsSampler`](sampler::cma_es::CmaEsSampler)). |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) for instance creation, suggestions and feedback | on |
//! | `server` | The stdio JSON-RPC server and the `forge-optimizer` binary | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

mod config;
pub mod coordinator;
pub mod distribution;
mod error;
mod kde;
mod optimizer;
mod rng_util;
pub mod sampler;
#[cfg(feature = "server")]
pub mod server;
mod space;
mod strategy;
mod study;
pub mod tools;
mod trial;
mod types;

pub use config::{CmaEsConfig, CoordinatorConfig, ShapePolicy, TpeConfig};
pub use coordinator::{
    BestConfig, Coordinator, CoordinatorBuilder, FeedbackReceipt, FeedbackRequest, SuggestRequest,
    Suggestion, TrialHistory, TrialRecord,
};
pub use error::{Error, ErrorKind, Result};
pub use optimizer::{BestTrial, Optimizer, Params, Proposal};
pub use space::{ParamSpace, ParamSpec, SearchSpace};
pub use strategy::Strategy;
pub use study::{Study, StudyBuilder};
pub use trial::Trial;
pub use types::{Direction, TrialState};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use forge_optimizer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{CmaEsConfig, CoordinatorConfig, ShapePolicy, TpeConfig};
    pub use crate::coordinator::{
        BestConfig, Coordinator, FeedbackReceipt, Suggestion, TrialHistory, TrialRecord,
    };
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::optimizer::{BestTrial, Optimizer, Params, Proposal};
    pub use crate::sampler::cma_es::CmaEsSampler;
    pub use crate::sampler::tpe::TpeSampler;
    pub use crate::sampler::{CompletedTrial, Sampler};
    pub use crate::space::{ParamSpace, ParamSpec, SearchSpace};
    pub use crate::strategy::Strategy;
    pub use crate::study::{Study, StudyBuilder};
    pub use crate::types::Direction;
}
