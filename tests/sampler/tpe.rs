use forge_optimizer::prelude::*;

use super::{f, i, optimize, s, space, values};

fn study(direction: Direction, seed: u64) -> Study {
    Study::builder()
        .direction(direction)
        .strategy(Strategy::Tpe)
        .seed(seed)
        .build()
        .unwrap()
}

#[test]
fn optimizes_quadratic_function() {
    let mut study = study(Direction::Minimize, 42);
    let sp = space(&[("x", ParamSpec::float(-10.0, 10.0))]);

    optimize(&mut study, &sp, 100, |p| (f(p, "x") - 3.0).powi(2));

    let best = study.best_trial().unwrap();
    assert!(
        best.value < 5.0,
        "TPE should find near-optimal: best value {} should be < 5.0",
        best.value
    );
}

#[test]
fn maximizes_reward() {
    let mut study = study(Direction::Maximize, 42);
    let sp = space(&[("x", ParamSpec::float(0.0, 1.0))]);

    optimize(&mut study, &sp, 80, |p| 1.0 - (f(p, "x") - 0.7).abs());

    let best = study.best_trial().unwrap();
    assert!(best.value > 0.9, "best reward {} should exceed 0.9", best.value);
    let x = best.params["x"].as_f64().unwrap();
    assert!((x - 0.7).abs() < 0.1, "best x {x} should be near 0.7");
}

#[test]
fn categorical_learns_best_choice() {
    let mut study = study(Direction::Maximize, 42);
    let sp = space(&[("optimizer", ParamSpec::categorical(["adam", "sgd", "rmsprop"]))]);

    optimize(&mut study, &sp, 60, |p| match s(p, "optimizer") {
        "adam" => 1.0,
        "sgd" => 0.2,
        _ => 0.0,
    });

    let late_adam = study
        .trials()
        .iter()
        .skip(30)
        .filter(|t| (t.value - 1.0).abs() < f64::EPSILON)
        .count();
    assert!(late_adam > 15, "adam chosen only {late_adam}/30 times after warm-up");
    assert_eq!(
        study.best_trial().unwrap().params["optimizer"],
        serde_json::json!("adam")
    );
}

#[test]
fn mixed_space_stays_in_bounds() {
    let mut study = study(Direction::Maximize, 5);
    let sp = space(&[
        ("lr", ParamSpec::float(1e-4, 1e-1).log(true)),
        ("layers", ParamSpec::int(1, 8)),
        ("act", ParamSpec::categorical(["relu", "gelu"])),
    ]);

    for _ in 0..40 {
        let proposal = study.ask(&sp).unwrap();
        let lr = f(&proposal.params, "lr");
        let layers = i(&proposal.params, "layers");
        assert!((1e-4..=1e-1).contains(&lr));
        assert!((1..=8).contains(&layers));
        study.tell(proposal.number, -lr.ln() / layers as f64).unwrap();
    }
}

#[test]
fn seeded_reproducibility() {
    let sp = space(&[("x", ParamSpec::float(-5.0, 5.0))]);
    let run = |seed| {
        let mut study = study(Direction::Minimize, seed);
        optimize(&mut study, &sp, 30, |p| f(p, "x").powi(2));
        values(&study)
    };
    assert_eq!(run(42), run(42));
}
