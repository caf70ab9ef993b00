//! Integration tests for the generator stages and one-to-many expansion.

use molpipe_lib::batch::{BatchRunner, ItemError};
use molpipe_lib::progress::ProgressSink;
use molpipe_lib::record::Record;
use molpipe_lib::stages::{
    FRAGMENT_SOURCE_KEY, fragment, generate_stereoisomers, generate_synonyms,
};
use molpipe_lib::store::{ExpandOptions, Layout};
use molpipe_lib::toolkit::FragmentMethod;
use rstest::rstest;

use crate::helpers::{NumberToolkit, assert_property, molecules, number_store, smiles_column};

fn runner(workers: usize) -> BatchRunner {
    BatchRunner::new(workers).unwrap().with_sink(ProgressSink::Silent)
}

/// Sources 1..=m plus two records without a molecule.
fn sources(m: u32) -> molpipe_lib::store::RecordStore<u32> {
    let mut store = number_store(1..=m);
    store.push(Record::empty());
    store.push(Record::empty());
    store
}

#[rstest]
#[case(1, 1)]
#[case(25, 3)]
#[case(100, 4)]
fn test_synonyms_produce_m_times_n_plus_one(#[case] m: u32, #[case] n: usize) {
    let toolkit = NumberToolkit::new();
    let mut store = sources(m);
    let report = generate_synonyms(&toolkit, &mut store, &runner(4), n, "random", 11).unwrap();
    assert_eq!(store.len(), m as usize * (n + 1));
    assert_eq!(report.valid_sources, m as usize);
    assert_eq!(report.generated, m as usize * n);

    // Originals first, in order, then each source's variants contiguously.
    let smiles = smiles_column(&store);
    let originals: Vec<String> = (1..=m).map(|v| v.to_string()).collect();
    assert_eq!(&smiles[..m as usize], originals.as_slice());
    for (j, chunk) in smiles[m as usize..].chunks(n).enumerate() {
        let source = (j + 1).to_string();
        assert!(chunk.iter().all(|s| s.starts_with(&format!("{source}~"))), "{chunk:?}");
    }
}

#[rstest]
#[case(10, 1)]
#[case(10, 5)]
fn test_stereoisomers_interleave(#[case] m: u32, #[case] n: usize) {
    let toolkit = NumberToolkit::new();
    let mut store = sources(m);
    generate_stereoisomers(&toolkit, &mut store, &runner(3), n);
    assert_eq!(store.len(), m as usize * (n + 1));
    let mols = molecules(&store);
    for (j, group) in mols.chunks(n + 1).enumerate() {
        let source = j as u32 + 1;
        assert_eq!(group[0], Some(source));
        for (k, isomer) in group[1..].iter().enumerate() {
            assert_eq!(*isomer, Some(source * 1000 + k as u32 + 1));
        }
    }
}

#[test]
fn test_expand_without_originals_gives_m_times_n() {
    let mut store = sources(40);
    let options = ExpandOptions { keep_originals: false, ..ExpandOptions::default() };
    let report = store.expand(&runner(4), "Tripling", options, |_, record| {
        Ok(vec![record.clone(); 3])
    });
    assert_eq!(store.len(), 40 * 3);
    assert_eq!(report.kept_sources, 0);
}

#[test]
fn test_keep_source_when_empty_boundary() {
    // 1 produces nothing, 2 produces exactly one record, 3 fails.
    let mut store = number_store([1, 2, 3]);
    let options = ExpandOptions {
        keep_originals: false,
        keep_source_when_empty: true,
        layout: Layout::Prepend,
    };
    let report = store.expand(&runner(2), "Boundary", options, |_, record| {
        match record.molecule {
            Some(2) => Ok(vec![Record::with_smiles(20, "20")]),
            Some(3) => Err(ItemError::Failed("no".to_string())),
            _ => Ok(Vec::new()),
        }
    });
    assert_eq!(molecules(&store), vec![Some(1), Some(3), Some(20)]);
    assert_eq!(report.kept_sources, 2);
    assert_eq!(report.batch.failed, 1);
}

#[test]
fn test_fragments_carry_source_and_properties() {
    let toolkit = NumberToolkit::new();
    let mut store = number_store([123, 45]);
    store.records_mut()[0].set_property("id", "a");
    let report = fragment(&toolkit, &mut store, &runner(2), FragmentMethod::Components, 2, false);
    assert_eq!(molecules(&store), vec![Some(1), Some(2), Some(4), Some(5)]);
    assert_eq!(report.kept_sources, 0);
    let first = store.get(0).unwrap();
    assert_property(first, FRAGMENT_SOURCE_KEY, "123");
    assert_property(first, "id", "a");
    assert_property(first, "SMILES", "1");
}

#[test]
fn test_fragment_keep_original_data_prepends_sources() {
    let toolkit = NumberToolkit::failing_on(&[9]);
    let mut store = number_store([12, 9]);
    fragment(&toolkit, &mut store, &runner(2), FragmentMethod::Brics, 0, true);
    assert_eq!(molecules(&store), vec![Some(12), Some(9), Some(1), Some(2)]);
}

#[test]
fn test_generators_are_worker_count_invariant() {
    let toolkit = NumberToolkit::failing_on(&[17, 301]);
    let run = |workers: usize| {
        let mut store = sources(500);
        generate_synonyms(&toolkit, &mut store, &runner(workers), 2, "random", 5).unwrap();
        generate_stereoisomers(&toolkit, &mut store, &runner(workers), 1);
        smiles_column(&store)
    };
    let single = run(1);
    assert_eq!(run(3), single);
    assert_eq!(run(8), single);
}
