#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

use forge_optimizer::prelude::*;

mod cma_es;
mod tpe;

/// Compiles `(name, spec)` pairs into a search space.
pub fn space(entries: &[(&str, ParamSpec)]) -> SearchSpace {
    let declared: ParamSpace = entries
        .iter()
        .map(|(name, spec)| ((*name).to_string(), spec.clone()))
        .collect();
    SearchSpace::compile(&declared).unwrap()
}

/// Runs `n` ask/tell rounds of `objective` against `study`.
pub fn optimize<F>(study: &mut Study, space: &SearchSpace, n: usize, objective: F)
where
    F: Fn(&Params) -> f64,
{
    for _ in 0..n {
        let proposal = study.ask(space).unwrap();
        let value = objective(&proposal.params);
        study.tell(proposal.number, value).unwrap();
    }
}

pub fn f(params: &Params, name: &str) -> f64 {
    params[name].as_f64().unwrap()
}

pub fn i(params: &Params, name: &str) -> i64 {
    params[name].as_i64().unwrap()
}

pub fn s<'a>(params: &'a Params, name: &str) -> &'a str {
    params[name].as_str().unwrap()
}

pub fn values(study: &Study) -> Vec<f64> {
    study.trials().iter().map(|t| t.value).collect()
}
