//! Integration tests for the pipeline driver.

use molpipe_lib::MolpipeError;
use molpipe_lib::io::load_smiles_list;
use molpipe_lib::pipeline::{Pipeline, PipelineConfig, PropertyFilter, PropertySort, Stage};
use molpipe_lib::progress::ProgressSink;
use molpipe_lib::smiles::SmilesToolkit;
use molpipe_lib::store::SortOrder;

use crate::helpers::{NumberToolkit, molecules, number_store, smiles_column};

fn config(workers: usize) -> PipelineConfig {
    PipelineConfig { workers, sink: ProgressSink::Silent, ..PipelineConfig::default() }
}

#[test]
fn test_every_stage_enabled_runs_in_fixed_order() {
    let toolkit = NumberToolkit::new();
    let cfg = PipelineConfig {
        canonicalize: true,
        deduplicate: true,
        synonyms: Some(1),
        fragment: Some(molpipe_lib::toolkit::FragmentMethod::Components),
        desalt: true,
        tautomerize: true,
        remove_invalid: true,
        neutralize: true,
        add_hydrogens: true,
        stereoisomers: Some(1),
        scaffold: Some("Scaffold".to_string()),
        standardize: true,
        remove_stereo: true,
        match_query: Some("2".to_string()),
        filter_by_property: Some(PropertyFilter {
            property: "Match".to_string(),
            min: 0.0,
            max: 1.0,
        }),
        sort_by_property: Some(PropertySort {
            property: "Match".to_string(),
            order: SortOrder::Descending,
        }),
        ..config(2)
    };
    let pipeline = Pipeline::new(&toolkit, cfg).unwrap();
    assert_eq!(pipeline.stages(), Stage::ALL.to_vec());

    let mut store = number_store([12, 34, 12]);
    let metrics = pipeline.run(&mut store).unwrap();
    let names: Vec<&str> = metrics.iter().map(|m| m.stage.as_str()).collect();
    let expected: Vec<&str> = Stage::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(names, expected);
    for pair in metrics.windows(2) {
        assert_eq!(pair[0].output_records, pair[1].input_records);
    }
    assert_eq!(metrics.last().unwrap().output_records, store.len() as u64);
}

#[test]
fn test_dedup_sees_raw_text_before_standardization() {
    // 12 and 15 standardize to the same value but are distinct for dedup.
    let toolkit = NumberToolkit::new();
    let cfg = PipelineConfig { deduplicate: true, standardize: true, ..config(3) };
    let mut store = number_store([12, 15, 12]);
    Pipeline::new(&toolkit, cfg).unwrap().run(&mut store).unwrap();
    assert_eq!(molecules(&store), vec![Some(10), Some(10)]);
}

#[test]
fn test_per_record_failures_do_not_abort() {
    // Neutralizing adds one, so no transform output lands on the failing value.
    let toolkit = NumberToolkit::failing_on(&[50]);
    let cfg = PipelineConfig { canonicalize: true, neutralize: true, ..config(4) };
    let mut store = number_store([4, 50, 6]);
    let metrics = Pipeline::new(&toolkit, cfg).unwrap().run(&mut store).unwrap();
    assert_eq!(molecules(&store), vec![Some(5), Some(50), Some(7)]);
    assert_eq!(metrics.iter().map(|m| m.failed_records).collect::<Vec<_>>(), vec![1, 1]);
}

#[test]
fn test_transform_output_that_cannot_be_written_leaves_record() {
    let toolkit = NumberToolkit::failing_on(&[5]);
    let cfg = PipelineConfig { neutralize: true, ..config(2) };
    let mut store = number_store([4, 6]);
    let metrics = Pipeline::new(&toolkit, cfg).unwrap().run(&mut store).unwrap();
    assert_eq!(molecules(&store), vec![Some(4), Some(7)]);
    assert_eq!(metrics[0].failed_records, 1);
}

#[test]
fn test_bad_query_is_a_stage_error() {
    let toolkit = NumberToolkit::new();
    let cfg = PipelineConfig { match_query: Some("zero".to_string()), ..config(1) };
    let mut store = number_store([1]);
    let err = Pipeline::new(&toolkit, cfg).unwrap().run(&mut store).unwrap_err();
    assert!(matches!(err, MolpipeError::InvalidQuery { .. }));
}

#[test]
fn test_smiles_pipeline_is_worker_count_invariant() {
    let toolkit = SmilesToolkit::new();
    let input = "CCO,Cl.CCO,[O-]C(=O)C,C[C@H](N)C(=O)O,C[C@@H](O)[C@H](N)C,c1ccccc1.O,CCO,CCN";
    let run = |workers: usize| {
        let cfg = PipelineConfig {
            canonicalize: true,
            deduplicate: true,
            synonyms: Some(2),
            seed: 99,
            fragment: Some(molpipe_lib::toolkit::FragmentMethod::Components),
            keep_original_data: true,
            neutralize: true,
            stereoisomers: Some(3),
            remove_stereo: true,
            match_query: Some("CC".to_string()),
            ..config(workers)
        };
        let mut store = load_smiles_list(&toolkit, input).unwrap();
        Pipeline::new(&toolkit, cfg).unwrap().run(&mut store).unwrap();
        let flags: Vec<Option<String>> =
            store.iter().map(|r| r.property("Match").map(str::to_string)).collect();
        (smiles_column(&store), flags)
    };
    let single = run(1);
    assert!(!single.0.is_empty());
    for workers in [2, 5, 12] {
        assert_eq!(run(workers), single, "workers = {workers}");
    }
}
