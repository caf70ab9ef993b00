//! Custom assertion helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;

use molpipe_lib::record::Record;
use molpipe_lib::store::RecordStore;

/// `SMILES` property of every record, `""` when missing.
pub fn smiles_column<M>(store: &RecordStore<M>) -> Vec<String> {
    store.iter().map(|r| r.smiles().unwrap_or_default().to_string()).collect()
}

/// Asserts that `record` has `key` set to `expected`.
///
/// # Panics
///
/// Panics if the property is missing or differs.
pub fn assert_property<M>(record: &Record<M>, key: &str, expected: &str) {
    assert_eq!(record.property(key), Some(expected), "property {key} of {:?}", record.properties);
}

/// Lines of a text file.
///
/// # Panics
///
/// Panics if the file cannot be read.
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
        .lines()
        .map(str::to_string)
        .collect()
}
