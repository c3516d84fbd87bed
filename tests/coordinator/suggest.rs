use std::collections::HashSet;

use forge_optimizer::prelude::*;
use serde_json::json;

use super::{coordinator, mixed_space, numeric_space};

#[test]
fn numeric_space_uses_cmaes() {
    let coordinator = coordinator();
    let suggestion = coordinator.suggest("svc-a", &numeric_space()).unwrap();

    assert_eq!(suggestion.strategy, Strategy::CmaEs);
    let lr = suggestion.params["lr"].as_f64().unwrap();
    let batch = suggestion.params["batch"].as_i64().unwrap();
    assert!((0.001..=0.1).contains(&lr));
    assert!((8..=128).contains(&batch));
}

#[test]
fn categorical_space_uses_tpe() {
    let coordinator = coordinator();
    let suggestion = coordinator.suggest("svc-b", &mixed_space()).unwrap();

    assert_eq!(suggestion.strategy, Strategy::Tpe);
    let optimizer = &suggestion.params["optimizer"];
    assert!(*optimizer == json!("adam") || *optimizer == json!("sgd"));
}

#[test]
fn single_numeric_param_uses_tpe() {
    let coordinator = coordinator();
    let space: ParamSpace = [("x".to_string(), ParamSpec::float(0.0, 1.0))]
        .into_iter()
        .collect();

    let suggestion = coordinator.suggest("svc-c", &space).unwrap();
    assert_eq!(suggestion.strategy, Strategy::Tpe);
}

#[test]
fn suggestion_shape() {
    let coordinator = coordinator();
    let suggestion = coordinator.suggest("svc-a", &numeric_space()).unwrap();

    assert!(suggestion.trial_id.starts_with("t_"));
    assert_eq!(suggestion.trial_id.len(), 12);
    assert!(suggestion.created_at.ends_with('Z'));

    let wire = serde_json::to_value(&suggestion).unwrap();
    assert_eq!(wire["sampler"], json!("cmaes"));
    assert!(wire["candidate_params"].is_object());
    assert_eq!(wire["trial_id"], json!(suggestion.trial_id));
}

#[test]
fn trial_ids_are_unique() {
    let coordinator = coordinator();
    let mut seen = HashSet::new();
    for i in 0..50 {
        let server = if i % 2 == 0 { "svc-a" } else { "svc-b" };
        let space = if i % 2 == 0 { numeric_space() } else { mixed_space() };
        let suggestion = coordinator.suggest(server, &space).unwrap();
        assert!(seen.insert(suggestion.trial_id), "duplicate trial id");
    }
    assert_eq!(coordinator.trial_count(), 50);
}

#[test]
fn empty_choices_rejected_without_record() {
    let coordinator = coordinator();
    let space: ParamSpace = [(
        "optimizer".to_string(),
        ParamSpec::categorical(Vec::<String>::new()),
    )]
    .into_iter()
    .collect();

    let err = coordinator.suggest("svc-d", &space).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(coordinator.trial_count(), 0);
    assert!(coordinator.servers().is_empty());
    assert!(coordinator.trial_history("svc-d").trials.is_empty());
}

#[test]
fn empty_space_and_server_rejected() {
    let coordinator = coordinator();

    let err = coordinator.suggest("svc-a", &ParamSpace::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = coordinator.suggest("", &numeric_space()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(coordinator.trial_count(), 0);
}

#[test]
fn malformed_declarations_rejected() {
    let coordinator = coordinator();
    let cases: Vec<ParamSpec> = vec![
        ParamSpec::float(1.0, 0.0),
        ParamSpec::float(-1e308, 1e308),
        ParamSpec::float(f64::MIN, f64::MAX),
        ParamSpec::float(0.0, 1.0).log(true),
        ParamSpec::int(0, 10).step(0.0),
        ParamSpec {
            kind: "uniform".to_string(),
            ..ParamSpec::float(0.0, 1.0)
        },
        ParamSpec {
            kind: String::new(),
            ..ParamSpec::float(0.0, 1.0)
        },
    ];

    for spec in cases {
        let space: ParamSpace = [("x".to_string(), spec.clone())].into_iter().collect();
        let err = coordinator.suggest("svc-e", &space).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "accepted {spec:?}");
    }
    assert_eq!(coordinator.trial_count(), 0);
}

#[test]
fn strategy_fixed_after_creation() {
    let coordinator = coordinator();
    let first = coordinator.suggest("svc-a", &numeric_space()).unwrap();
    assert_eq!(first.strategy, Strategy::CmaEs);

    // a later categorical space does not re-route the server
    let later = coordinator.suggest("svc-a", &mixed_space()).unwrap();
    assert_eq!(later.strategy, Strategy::CmaEs);
    assert!(later.params.contains_key("optimizer"));
    assert_eq!(coordinator.servers(), vec!["svc-a".to_string()]);
}

#[test]
fn reject_policy_refuses_changed_space() {
    let coordinator = Coordinator::builder()
        .shape_policy(ShapePolicy::Reject)
        .build()
        .unwrap();

    coordinator.suggest("svc-a", &numeric_space()).unwrap();
    coordinator.suggest("svc-a", &numeric_space()).unwrap();

    let err = coordinator.suggest("svc-a", &mixed_space()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(coordinator.server_trial_count("svc-a"), 2);
}

#[test]
fn seeded_coordinators_agree() {
    let run = || {
        let coordinator = coordinator();
        (0..5)
            .map(|_| coordinator.suggest("svc-a", &numeric_space()).unwrap().params)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn widest_finite_span_is_served() {
    let coordinator = coordinator();
    let space: ParamSpace = [("x".to_string(), ParamSpec::float(-1e307, 1e307))]
        .into_iter()
        .collect();

    let suggestion = coordinator.suggest("svc-wide", &space).unwrap();
    let x = suggestion.params["x"].as_f64().unwrap();
    assert!((-1e307..=1e307).contains(&x));
}
