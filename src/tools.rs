//! Transport-agnostic tool boundary over a [`Coordinator`].
//!
//! Every tool takes a JSON object of arguments and returns a JSON value.
//! Failures never escape as Rust errors: they come back as
//! `{"error": message, "kind": "invalid_input" | "unknown_trial" | "inconsistent_state"}`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::coordinator::{Coordinator, FeedbackRequest, SuggestRequest};
use crate::error::{Error, Result};

/// Tool names, in the order [`tool_definitions`] lists them.
pub const TOOL_NAMES: [&str; 4] = [
    "suggest_trial",
    "record_feedback",
    "get_best_config",
    "get_trial_history",
];

#[derive(serde::Deserialize)]
struct ServerArgs {
    server_id: String,
}

/// Invokes tool `name` with `arguments`.
///
/// Unknown tools and undecodable arguments become `invalid_input` errors.
#[must_use]
pub fn call_tool(coordinator: &Coordinator, name: &str, arguments: &Value) -> Value {
    let result = match name {
        "suggest_trial" => decode::<SuggestRequest>(arguments)
            .and_then(|req| coordinator.suggest(&req.server_id, &req.param_space))
            .and_then(|s| encode(&s)),
        "record_feedback" => decode::<FeedbackRequest>(arguments)
            .and_then(|req| coordinator.record_feedback(&req.trial_id, req.reward, req.metrics))
            .and_then(|r| encode(&r)),
        "get_best_config" => decode::<ServerArgs>(arguments)
            .and_then(|req| encode(&coordinator.best_config(&req.server_id))),
        "get_trial_history" => decode::<ServerArgs>(arguments)
            .and_then(|req| encode(&coordinator.trial_history(&req.server_id))),
        other => Err(Error::InvalidInput(format!("unknown tool '{other}'"))),
    };

    result.unwrap_or_else(|e| error_value(&e))
}

/// Returns `true` if `value` is a structured error produced by [`call_tool`].
#[must_use]
pub fn is_error(value: &Value) -> bool {
    value.get("error").is_some_and(Value::is_string) && value.get("kind").is_some()
}

/// Converts an error into its structured form.
#[must_use]
pub fn error_value(error: &Error) -> Value {
    json!({
        "error": error.to_string(),
        "kind": error.kind(),
    })
}

fn decode<T: DeserializeOwned>(arguments: &Value) -> Result<T> {
    T::deserialize(arguments).map_err(|e| Error::InvalidInput(format!("invalid arguments: {e}")))
}

fn encode<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::InconsistentState(e.to_string()))
}

/// Describes the tools with JSON input schemas.
#[must_use]
pub fn tool_definitions() -> Value {
    let server_id = json!({
        "type": "string",
        "description": "Identity of the tuning target; all trials and state are partitioned by it."
    });

    json!([
        {
            "name": "suggest_trial",
            "description": "Suggest a new trial for a server. The first call for a server fixes its search strategy ('cmaes' for two or more numeric parameters, 'tpe' otherwise). Returns trial_id, candidate_params, sampler and created_at.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "server_id": server_id,
                    "param_space": {
                        "type": "object",
                        "description": "Parameter name to specification: {type: float|int|categorical, low, high, step, log, choices}.",
                        "additionalProperties": {
                            "type": "object",
                            "properties": {
                                "type": { "type": "string", "enum": ["float", "int", "categorical"] },
                                "low": { "type": "number" },
                                "high": { "type": "number" },
                                "step": { "type": "number" },
                                "log": { "type": "boolean" },
                                "choices": { "type": "array" }
                            },
                            "required": ["type"]
                        }
                    }
                },
                "required": ["server_id", "param_space"]
            }
        },
        {
            "name": "record_feedback",
            "description": "Record the observed reward (higher is better) for a suggested trial. Repeated feedback replaces the stored reward and metrics.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "trial_id": { "type": "string", "description": "trial_id returned by suggest_trial" },
                    "reward": { "type": "number" },
                    "metrics": { "type": "object", "description": "Optional metrics stored with the trial." }
                },
                "required": ["trial_id", "reward"]
            }
        },
        {
            "name": "get_best_config",
            "description": "Return the best parameters, best value and matching trial_id for a server. Empty when nothing has been reported yet.",
            "inputSchema": {
                "type": "object",
                "properties": { "server_id": server_id },
                "required": ["server_id"]
            }
        },
        {
            "name": "get_trial_history",
            "description": "Return every trial issued for a server in suggestion order, with current reward and metrics.",
            "inputSchema": {
                "type": "object",
                "properties": { "server_id": server_id },
                "required": ["server_id"]
            }
        }
    ])
}
