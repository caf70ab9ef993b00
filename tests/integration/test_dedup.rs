//! Integration tests for deduplication.

use molpipe_lib::batch::BatchRunner;
use molpipe_lib::progress::ProgressSink;
use molpipe_lib::record::Record;
use molpipe_lib::smiles::SmilesToolkit;
use molpipe_lib::stages::deduplicate;
use molpipe_lib::store::RecordStore;
use molpipe_lib::toolkit::Toolkit;

use crate::helpers::{NumberToolkit, assert_property, molecules, number_store, smiles_column};

fn runner(workers: usize) -> BatchRunner {
    BatchRunner::new(workers).unwrap().with_sink(ProgressSink::Silent)
}

#[test]
fn test_two_of_three_are_unique() {
    let toolkit = SmilesToolkit::new();
    let mut store: RecordStore<_> = ["CCO", "CCO", "c1ccccc1"]
        .iter()
        .map(|s| Record::with_smiles(toolkit.parse(s).unwrap(), *s))
        .collect();
    let report = deduplicate(&toolkit, &mut store, &runner(2));
    assert_eq!((report.total, report.unique), (3, 2));
    assert_eq!(smiles_column(&store), vec!["CCO", "c1ccccc1"]);
}

#[test]
fn test_first_occurrence_wins_for_any_worker_count() {
    let toolkit = NumberToolkit::new();
    let values: Vec<u32> = (0..20_000).map(|i| (i * 7919) % 3001).collect();
    let make = || {
        let mut store = number_store(values.iter().copied());
        for (i, record) in store.iter_mut().enumerate() {
            record.set_property("row", i.to_string());
        }
        store
    };

    let mut expected = make();
    let baseline = deduplicate(&toolkit, &mut expected, &runner(1));
    assert_eq!(baseline.unique, 3001);
    assert_property(expected.get(0).unwrap(), "row", "0");

    for workers in [2, 4, 16] {
        let mut store = make();
        let report = deduplicate(&toolkit, &mut store, &runner(workers));
        assert_eq!(report, baseline);
        assert_eq!(store, expected, "workers = {workers}");
    }
}

#[test]
fn test_idempotent() {
    let toolkit = NumberToolkit::new();
    let mut store = number_store([5, 3, 5, 1, 3, 9]);
    deduplicate(&toolkit, &mut store, &runner(3));
    let once = store.clone();
    let report = deduplicate(&toolkit, &mut store, &runner(3));
    assert_eq!(store, once);
    assert_eq!(report.duplicates(), 0);
}

#[test]
fn test_records_without_key_are_dropped_not_merged() {
    let toolkit = NumberToolkit::failing_on(&[4]);
    let mut store = number_store([4, 1, 4]);
    store.push(Record::empty());
    store.push(Record::empty());
    let report = deduplicate(&toolkit, &mut store, &runner(2));
    assert_eq!(molecules(&store), vec![Some(1)]);
    assert_eq!(report.without_key, 4);
    assert_eq!(report.duplicates(), 0);
    assert_eq!(report.batch.failed, 2);
}
