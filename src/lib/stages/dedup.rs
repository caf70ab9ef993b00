//! First-occurrence deduplication on canonical text.
//!
//! Pass 1 computes keys in parallel. Pass 2 walks the keys in input order and
//! marks the first occurrence of each non-empty key. Pass 3 compacts. The seen
//! set is only ever touched by pass 2.

use ahash::AHashSet;
use log::info;

use crate::batch::{BatchReport, BatchRunner};
use crate::store::RecordStore;
use crate::toolkit::Toolkit;
use molpipe_metrics::format_count;

/// Result of a deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupReport {
    /// Records before deduplication.
    pub total: usize,
    /// Records kept.
    pub unique: usize,
    /// Records dropped because they had no key (no molecule or canonicalization failed).
    pub without_key: usize,
    pub batch: BatchReport,
}

impl DedupReport {
    /// Records dropped as repeats of an earlier key.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.total - self.unique - self.without_key
    }
}

/// Keeps the first record for each canonical text, in input order.
pub fn deduplicate<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
) -> DedupReport {
    let total = store.len();
    let label = "Deduplicating molecules - Pass 1: Canonicalizing";
    let (keys, batch) = runner.map(label, store.records(), |_, record| match &record.molecule {
        Some(mol) => Ok(toolkit.canonical_text(mol)?),
        None => Ok(String::new()),
    });

    let mut seen: AHashSet<&str> = AHashSet::with_capacity(keys.len());
    let mut without_key = 0;
    let keep: Vec<bool> = keys
        .iter()
        .map(|key| match key {
            Ok(key) if !key.is_empty() => seen.insert(key.as_str()),
            _ => {
                without_key += 1;
                false
            }
        })
        .collect();
    let unique = seen.len();

    let records = std::mem::take(store).into_records();
    *store = records.into_iter().zip(keep).filter_map(|(record, k)| k.then_some(record)).collect();

    info!(
        "Found {} unique molecules from {} total",
        format_count(unique as u64),
        format_count(total as u64)
    );
    DedupReport { total, unique, without_key, batch }
}
