use proptest::prelude::*;

use harbor_reconciler::models::Unit;

/// Unit statuses, weighted toward the ones the readiness rules care about
pub fn status_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => Just("started".to_string()),
        2 => Just("error".to_string()),
        2 => Just("down".to_string()),
        1 => Just("pending".to_string()),
        1 => Just("building".to_string()),
        1 => "[a-z]{3,10}",
    ]
}

/// An application's units, named `app/0..n`
pub fn units_strategy() -> impl Strategy<Value = Vec<Unit>> {
    prop::collection::vec(status_strategy(), 1..12).prop_map(|statuses| {
        statuses
            .into_iter()
            .enumerate()
            .map(|(i, status)| Unit::new(format!("app/{i}"), status))
            .collect()
    })
}

/// Units plus a non-empty request naming a subset of them
pub fn units_with_request_strategy() -> impl Strategy<Value = (Vec<Unit>, Vec<String>)> {
    units_strategy().prop_flat_map(|units| {
        let names: Vec<String> = units.iter().map(|u| u.name.clone()).collect();
        let request = prop::sample::subsequence(names.clone(), 1..=names.len());
        (Just(units), request)
    })
}
