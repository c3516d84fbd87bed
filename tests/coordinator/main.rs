use forge_optimizer::prelude::*;

mod concurrency;
mod feedback;
mod suggest;

/// Two float parameters: a purely numeric space routed to CMA-ES.
pub fn numeric_space() -> ParamSpace {
    [
        ("lr".to_string(), ParamSpec::float(0.001, 0.1).log(true)),
        ("batch".to_string(), ParamSpec::int(8, 128)),
    ]
    .into_iter()
    .collect()
}

/// A mixed space routed to TPE.
pub fn mixed_space() -> ParamSpace {
    [
        ("optimizer".to_string(), ParamSpec::categorical(["adam", "sgd"])),
        ("dropout".to_string(), ParamSpec::float(0.0, 0.5)),
    ]
    .into_iter()
    .collect()
}

pub fn coordinator() -> Coordinator {
    Coordinator::builder().seed(Some(42)).build().unwrap()
}
