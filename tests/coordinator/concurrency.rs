use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use super::{coordinator, mixed_space, numeric_space};

#[test]
fn concurrent_first_suggests_share_one_optimizer() {
    let coordinator = Arc::new(coordinator());

    let ids: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                scope.spawn(move || {
                    (0..10)
                        .map(|_| coordinator.suggest("svc-a", &numeric_space()).unwrap())
                        .map(|s| s.trial_id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    assert_eq!(coordinator.servers(), vec!["svc-a"]);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 80);
    assert_eq!(coordinator.server_trial_count("svc-a"), 80);
}

#[test]
fn concurrent_suggest_and_feedback() {
    let coordinator = Arc::new(coordinator());

    thread::scope(|scope| {
        for worker in 0..6 {
            let coordinator = Arc::clone(&coordinator);
            scope.spawn(move || {
                let (server, space) = if worker % 2 == 0 {
                    ("svc-a", numeric_space())
                } else {
                    ("svc-b", mixed_space())
                };
                for round in 0..15 {
                    let suggestion = coordinator.suggest(server, &space).unwrap();
                    let reward = f64::from(worker * 100 + round) / 1000.0;
                    coordinator
                        .record_feedback(&suggestion.trial_id, reward, None)
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(coordinator.trial_count(), 90);
    for server in ["svc-a", "svc-b"] {
        let history = coordinator.trial_history(server);
        assert_eq!(history.trials.len(), 45);
        assert!(history.trials.iter().all(|t| t.reward.is_some()));

        let best = coordinator.best_config(server);
        let max = history
            .trials
            .iter()
            .filter_map(|t| t.reward)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best.best_value, Some(max));
        assert!(best.trial_id.is_some());
    }
}
