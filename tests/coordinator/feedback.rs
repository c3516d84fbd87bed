use std::collections::BTreeMap;

use forge_optimizer::prelude::*;
use serde_json::json;

use super::{coordinator, mixed_space, numeric_space};

#[test]
fn feedback_updates_best() {
    let coordinator = coordinator();
    let suggestion = coordinator.suggest("svc-a", &numeric_space()).unwrap();

    let receipt = coordinator
        .record_feedback(&suggestion.trial_id, 0.87, None)
        .unwrap();
    assert!(receipt.accepted);
    assert!(receipt.updated_best);
    assert_eq!(receipt.best_value, Some(0.87));
    assert_eq!(receipt.study_size, 1);

    let best = coordinator.best_config("svc-a");
    assert_eq!(best.best_value, Some(0.87));
    assert_eq!(best.trial_id.as_deref(), Some(suggestion.trial_id.as_str()));
    assert_eq!(best.best_params, suggestion.params);
}

#[test]
fn best_is_monotonic() {
    let coordinator = coordinator();
    let rewards = [0.3, 0.9, 0.1, 0.5, 0.95, 0.2];
    let mut running_best = f64::NEG_INFINITY;

    for reward in rewards {
        let suggestion = coordinator.suggest("svc-b", &mixed_space()).unwrap();
        let receipt = coordinator
            .record_feedback(&suggestion.trial_id, reward, None)
            .unwrap();
        running_best = running_best.max(reward);
        assert_eq!(receipt.best_value, Some(running_best));
    }

    assert_eq!(coordinator.best_config("svc-b").best_value, Some(0.95));
}

#[test]
fn unknown_trial_is_rejected() {
    let coordinator = coordinator();
    coordinator.suggest("svc-a", &numeric_space()).unwrap();

    let err = coordinator
        .record_feedback("t_does_not_exist", 1.0, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownTrial);
    assert_eq!(coordinator.best_config("svc-a").best_value, None);
}

#[test]
fn non_finite_reward_is_rejected() {
    let coordinator = coordinator();
    let suggestion = coordinator.suggest("svc-a", &numeric_space()).unwrap();

    for reward in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = coordinator
            .record_feedback(&suggestion.trial_id, reward, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    // the trial is still open after rejected rewards
    let receipt = coordinator
        .record_feedback(&suggestion.trial_id, 0.4, None)
        .unwrap();
    assert_eq!(receipt.best_value, Some(0.4));
}

#[test]
fn duplicate_feedback_overwrites_record_only() {
    let coordinator = coordinator();
    let suggestion = coordinator.suggest("svc-a", &numeric_space()).unwrap();

    coordinator
        .record_feedback(&suggestion.trial_id, 0.5, None)
        .unwrap();
    let metrics: BTreeMap<String, serde_json::Value> =
        [("latency_ms".to_string(), json!(12.5))].into_iter().collect();
    let receipt = coordinator
        .record_feedback(&suggestion.trial_id, 0.9, Some(metrics))
        .unwrap();

    assert!(receipt.accepted);
    assert_eq!(receipt.best_value, Some(0.5));
    assert_eq!(receipt.study_size, 1);

    let history = coordinator.trial_history("svc-a");
    assert_eq!(history.trials.len(), 1);
    assert_eq!(history.trials[0].reward, Some(0.9));
    assert_eq!(history.trials[0].metrics["latency_ms"], json!(12.5));
}

#[test]
fn study_size_counts_pending_trials() {
    let coordinator = coordinator();
    let first = coordinator.suggest("svc-a", &numeric_space()).unwrap();
    coordinator.suggest("svc-a", &numeric_space()).unwrap();
    coordinator.suggest("svc-a", &numeric_space()).unwrap();

    let receipt = coordinator
        .record_feedback(&first.trial_id, 0.1, None)
        .unwrap();
    assert_eq!(receipt.study_size, 3);
}

#[test]
fn feedback_is_partitioned_by_server() {
    let coordinator = coordinator();
    let a = coordinator.suggest("svc-a", &numeric_space()).unwrap();
    let b = coordinator.suggest("svc-b", &mixed_space()).unwrap();

    coordinator.record_feedback(&a.trial_id, 0.2, None).unwrap();
    coordinator.record_feedback(&b.trial_id, 0.8, None).unwrap();

    assert_eq!(coordinator.best_config("svc-a").best_value, Some(0.2));
    assert_eq!(coordinator.best_config("svc-b").best_value, Some(0.8));
}
