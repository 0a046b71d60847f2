//! Tests for sharing one parser across threads

mod common;

use carve::Parser;
use common::Sum;
use rayon::prelude::*;
use std::sync::Arc;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_parser_is_send_and_sync() {
    assert_send_sync::<Parser<Sum>>();
}

#[test]
fn test_concurrent_parses_share_one_parser() {
    let parser = common::arithmetic(true);
    let inputs: Vec<String> = (0..256).map(|n| format!("{n} * 2 + ({n} - 1)")).collect();

    let results: Vec<i64> = inputs
        .par_iter()
        .map(|input| parser.parse_str(input).map(|sum| sum.eval()))
        .collect::<Result<_, _>>()
        .unwrap();

    for (n, value) in results.into_iter().enumerate() {
        let n = i64::try_from(n).unwrap();
        assert_eq!(value, n * 2 + (n - 1));
    }
}

#[test]
fn test_failures_are_isolated_per_call() {
    let parser = Arc::new(common::arithmetic(false));
    let outcomes: Vec<bool> = (0..64)
        .into_par_iter()
        .map(|n| {
            let input = if n % 2 == 0 { format!("{n} +") } else { format!("{n} + 1") };
            parser.parse_str(&input).is_ok()
        })
        .collect();
    assert!(outcomes.iter().enumerate().all(|(n, ok)| *ok == (n % 2 == 1)));
}
