//! Integration tests for the record store primitives and property stages.

use molpipe_lib::batch::BatchRunner;
use molpipe_lib::progress::ProgressSink;
use molpipe_lib::record::Record;
use molpipe_lib::stages::{filter_by_property, remove_invalid, sort_by_property};
use molpipe_lib::store::{RecordStore, SortOrder};
use proptest::prelude::*;

use crate::helpers::{NumberToolkit, molecules, number_store};

fn runner(workers: usize) -> BatchRunner {
    BatchRunner::new(workers).unwrap().with_sink(ProgressSink::Silent)
}

fn with_values(values: &[&str]) -> RecordStore<u32> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let mut record = Record::new(i as u32);
            record.set_property("score", *v);
            record
        })
        .collect()
}

fn scores(store: &RecordStore<u32>) -> Vec<String> {
    store.iter().map(|r| r.property("score").unwrap_or_default().to_string()).collect()
}

#[test]
fn test_sort_drops_unparseable_values() {
    let mut ascending = with_values(&["3", "abc", "1"]);
    let report = sort_by_property(&mut ascending, &runner(2), "score", SortOrder::Ascending);
    assert_eq!(scores(&ascending), vec!["1", "3"]);
    assert_eq!(report.failed, 1);

    let mut descending = with_values(&["3", "abc", "1"]);
    sort_by_property(&mut descending, &runner(2), "score", SortOrder::Descending);
    assert_eq!(scores(&descending), vec!["3", "1"]);
}

#[test]
fn test_sort_is_stable_in_both_directions() {
    for order in [SortOrder::Ascending, SortOrder::Descending] {
        let mut store = with_values(&["2", "1", "2", "1", "2"]);
        sort_by_property(&mut store, &runner(4), "score", order);
        let ids: Vec<u32> = store.iter().filter_map(|r| r.molecule).collect();
        match order {
            SortOrder::Ascending => assert_eq!(ids, vec![1, 3, 0, 2, 4]),
            SortOrder::Descending => assert_eq!(ids, vec![0, 2, 4, 1, 3]),
        }
    }
}

#[test]
fn test_filter_by_property_bounds_are_inclusive() {
    let mut store = with_values(&["0.5", "1", "NaN", "", "2", "2.0001", " 1.5 "]);
    let report = filter_by_property(&mut store, &runner(3), "score", 1.0, 2.0).unwrap();
    assert_eq!(scores(&store), vec!["1", "2", " 1.5 "]);
    assert_eq!(report.failed, 2);
}

#[test]
fn test_filter_by_property_rejects_inverted_bounds() {
    let mut store = with_values(&["1"]);
    assert!(filter_by_property(&mut store, &runner(1), "score", 2.0, 1.0).is_err());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_remove_invalid_drops_empty_and_absent() {
    let toolkit = NumberToolkit::new();
    let mut store = number_store([7, 0, 12]);
    store.push(Record::empty());
    remove_invalid(&toolkit, &mut store, &runner(2));
    assert_eq!(molecules(&store), vec![Some(7), Some(12)]);
}

proptest! {
    #[test]
    fn prop_retain_preserves_relative_order(
        values in proptest::collection::vec(0u32..1000, 0..400),
        modulus in 1u32..7,
        workers in 1usize..6,
    ) {
        let mut store = number_store(values.iter().copied());
        store.retain_parallel(&runner(workers), "Filtering", |_, r| {
            Ok(r.molecule.is_some_and(|m| m % modulus == 0))
        });
        let expected: Vec<Option<u32>> =
            values.iter().copied().filter(|v| v % modulus == 0).map(Some).collect();
        prop_assert_eq!(molecules(&store), expected);
    }

    #[test]
    fn prop_sort_matches_std_stable_sort(
        values in proptest::collection::vec(-50i32..50, 0..300),
        workers in 1usize..6,
    ) {
        let texts: Vec<String> = values.iter().map(ToString::to_string).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut store = with_values(&refs);
        sort_by_property(&mut store, &runner(workers), "score", SortOrder::Ascending);

        let mut expected: Vec<(i32, u32)> =
            values.iter().enumerate().map(|(i, v)| (*v, i as u32)).collect();
        expected.sort_by_key(|(v, _)| *v);
        let ids: Vec<u32> = store.iter().filter_map(|r| r.molecule).collect();
        prop_assert_eq!(ids, expected.into_iter().map(|(_, i)| i).collect::<Vec<_>>());
    }
}
