use forge_optimizer::prelude::*;

use super::{f, i, optimize, space, values};

fn study(seed: u64) -> Study {
    Study::builder()
        .strategy(Strategy::CmaEs)
        .seed(seed)
        .build()
        .unwrap()
}

#[test]
fn sphere_function() {
    let mut study = study(42);
    let sp = space(&[
        ("x", ParamSpec::float(-5.0, 5.0)),
        ("y", ParamSpec::float(-5.0, 5.0)),
    ]);

    optimize(&mut study, &sp, 200, |p| {
        f(p, "x").powi(2) + f(p, "y").powi(2)
    });

    let best = study.best_trial().unwrap();
    assert!(
        best.value < 1.0,
        "sphere best value should be < 1.0, got {}",
        best.value
    );
}

#[test]
fn maximizes_negated_sphere() {
    let mut study = Study::builder()
        .maximize()
        .strategy(Strategy::CmaEs)
        .seed(42)
        .build()
        .unwrap();
    let sp = space(&[
        ("x", ParamSpec::float(-5.0, 5.0)),
        ("y", ParamSpec::float(-5.0, 5.0)),
    ]);

    optimize(&mut study, &sp, 200, |p| {
        -(f(p, "x") - 1.0).powi(2) - (f(p, "y") + 2.0).powi(2)
    });

    let best = study.best_trial().unwrap();
    assert!(
        best.value > -1.0,
        "maximizing run should approach 0, got {}",
        best.value
    );
}

#[test]
fn bounds_respected() {
    let mut study = study(123);
    let sp = space(&[
        ("x", ParamSpec::float(-2.0, 3.0)),
        ("y", ParamSpec::float(0.0, 10.0)),
        ("n", ParamSpec::int(8, 128).step(8.0)),
    ]);

    let mut seen = Vec::new();
    for _ in 0..100 {
        let proposal = study.ask(&sp).unwrap();
        let (x, y, n) = (f(&proposal.params, "x"), f(&proposal.params, "y"), i(&proposal.params, "n"));
        seen.push((x, y, n));
        study.tell(proposal.number, x + y).unwrap();
    }

    for (x, y, n) in seen {
        assert!((-2.0..=3.0).contains(&x), "x = {x} out of bounds [-2, 3]");
        assert!((0.0..=10.0).contains(&y), "y = {y} out of bounds [0, 10]");
        assert!((8..=128).contains(&n) && n % 8 == 0, "n = {n} off grid");
    }
}

#[test]
fn seeded_reproducibility() {
    let sp = space(&[
        ("lr", ParamSpec::float(0.001, 0.1).log(true)),
        ("batch", ParamSpec::int(8, 128)),
    ]);
    let run = |seed: u64| {
        let mut study = study(seed);
        optimize(&mut study, &sp, 40, |p| f(p, "lr") * i(p, "batch") as f64);
        values(&study)
    };

    assert_eq!(run(42), run(42), "same seed should produce same results");
    assert_ne!(run(42), run(99), "different seeds should produce different results");
}

#[test]
fn interleaved_asks_and_late_tells() {
    let mut study = study(7);
    let sp = space(&[
        ("x", ParamSpec::float(-1.0, 1.0)),
        ("y", ParamSpec::float(-1.0, 1.0)),
    ]);

    // twenty outstanding proposals told in reverse order
    let proposals: Vec<Proposal> = (0..20).map(|_| study.ask(&sp).unwrap()).collect();
    for proposal in proposals.iter().rev() {
        let value = f(&proposal.params, "x") + f(&proposal.params, "y");
        study.tell(proposal.number, value).unwrap();
    }
    optimize(&mut study, &sp, 20, |p| f(p, "x") + f(p, "y"));

    assert_eq!(study.n_trials(), 40);
    assert_eq!(study.n_running(), 0);
}

#[test]
fn new_parameter_after_discovery() {
    let mut study = study(3);
    let first = space(&[
        ("x", ParamSpec::float(0.0, 1.0)),
        ("y", ParamSpec::float(0.0, 1.0)),
    ]);
    optimize(&mut study, &first, 5, |p| f(p, "x"));

    let wider = space(&[
        ("x", ParamSpec::float(0.0, 1.0)),
        ("y", ParamSpec::float(0.0, 1.0)),
        ("opt", ParamSpec::categorical(["adam", "sgd"])),
    ]);
    let proposal = study.ask(&wider).unwrap();
    let opt = proposal.params["opt"].as_str().unwrap();
    assert!(opt == "adam" || opt == "sgd");
}
