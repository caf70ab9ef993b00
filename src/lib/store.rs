//! Ordered record collection and its bulk primitives.
//!
//! Every primitive that runs user code in parallel does so into per-index
//! slots; anything that changes the length of the store happens afterwards in
//! a sequential pass over those slots.

use crate::batch::{BatchReport, BatchRunner, ItemError, ItemResult};
use crate::errors::MolpipeError;
use crate::record::{Record, parse_numeric};

/// Where kept source records go relative to generated ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// All kept sources first, then every bucket in source order.
    #[default]
    Prepend,
    /// Each kept source immediately followed by its own bucket.
    Interleave,
}

/// Options for [`RecordStore::expand`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandOptions {
    /// Keep every source that has a molecule.
    pub keep_originals: bool,
    /// Keep a source whose generator produced nothing or failed.
    pub keep_source_when_empty: bool,
    pub layout: Layout,
}

/// Sort direction for [`RecordStore::sort_by_numeric_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl std::str::FromStr for SortOrder {
    type Err = MolpipeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(MolpipeError::InvalidParameter {
                parameter: "sort-by-property".to_string(),
                reason: format!("Unknown sort order '{s}' (asc, desc)"),
            }),
        }
    }
}

/// Outcome of a one-to-many expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandReport {
    /// Sources with a molecule.
    pub valid_sources: usize,
    /// Records produced by the generator.
    pub generated: usize,
    /// Sources kept in the output.
    pub kept_sources: usize,
    pub batch: BatchReport,
}

/// An ordered dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStore<M> {
    records: Vec<Record<M>>,
}

impl<M> Default for RecordStore<M> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

impl<M> From<Vec<Record<M>>> for RecordStore<M> {
    fn from(records: Vec<Record<M>>) -> Self {
        Self { records }
    }
}

impl<M> FromIterator<Record<M>> for RecordStore<M> {
    fn from_iter<I: IntoIterator<Item = Record<M>>>(iter: I) -> Self {
        Self { records: iter.into_iter().collect() }
    }
}

impl<M> IntoIterator for RecordStore<M> {
    type Item = Record<M>;
    type IntoIter = std::vec::IntoIter<Record<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a, M> IntoIterator for &'a RecordStore<M> {
    type Item = &'a Record<M>;
    type IntoIter = std::slice::Iter<'a, Record<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<M> RecordStore<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record<M>> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record<M>> {
        self.records.iter_mut()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record<M>> {
        self.records.get(index)
    }

    #[must_use]
    pub fn records(&self) -> &[Record<M>] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record<M>] {
        &mut self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Record<M>> {
        self.records
    }

    pub fn push(&mut self, record: Record<M>) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record<M>>) {
        self.records.extend(records);
    }

    /// Moves all records of `other` to the end of this store.
    pub fn append(&mut self, other: &mut Self) {
        self.records.append(&mut other.records);
    }
}

impl<M: Clone + Send + Sync> RecordStore<M> {
    /// Keeps records for which `predicate` returns `Ok(true)`, preserving order.
    ///
    /// The predicate runs in parallel into a mask; a failed evaluation counts
    /// as `false`. Compaction is sequential.
    pub fn retain_parallel<F>(
        &mut self,
        runner: &BatchRunner,
        label: &str,
        predicate: F,
    ) -> BatchReport
    where
        F: Fn(usize, &Record<M>) -> ItemResult<bool> + Send + Sync,
    {
        let (mask, report) = runner.map(label, &self.records, predicate);
        let records = std::mem::take(&mut self.records);
        self.records = records
            .into_iter()
            .zip(mask)
            .filter_map(|(record, keep)| matches!(keep, Ok(true)).then_some(record))
            .collect();
        report
    }

    /// Stable sort by a numeric property; records without a numeric key are dropped.
    ///
    /// Keys are parsed in parallel with [`parse_numeric`]. Ties keep input order
    /// in both directions.
    pub fn sort_by_numeric_key(
        &mut self,
        runner: &BatchRunner,
        label: &str,
        key: &str,
        order: SortOrder,
    ) -> BatchReport {
        let (keys, report) = runner.map(label, &self.records, |_, record| {
            record
                .property(key)
                .and_then(parse_numeric)
                .ok_or_else(|| ItemError::Failed(format!("no numeric '{key}' property")))
        });

        let records = std::mem::take(&mut self.records);
        let mut keyed: Vec<(f64, Record<M>)> = records
            .into_iter()
            .zip(keys)
            .filter_map(|(record, key)| key.ok().map(|k| (k, record)))
            .collect();
        match order {
            SortOrder::Ascending => keyed.sort_by(|a, b| a.0.total_cmp(&b.0)),
            SortOrder::Descending => keyed.sort_by(|a, b| b.0.total_cmp(&a.0)),
        }
        self.records = keyed.into_iter().map(|(_, record)| record).collect();
        report
    }

    /// Replaces the store with generated records.
    ///
    /// `generate` runs in parallel for every source with a molecule; sources
    /// without one contribute nothing and are never kept. Once all buckets are
    /// filled, the output is sized exactly and assembled sequentially, each
    /// bucket staying contiguous and in production order.
    pub fn expand<F>(
        &mut self,
        runner: &BatchRunner,
        label: &str,
        options: ExpandOptions,
        generate: F,
    ) -> ExpandReport
    where
        F: Fn(usize, &Record<M>) -> ItemResult<Vec<Record<M>>> + Send + Sync,
    {
        let (buckets, batch) = runner.map(label, &self.records, |i, record| {
            if record.has_molecule() { generate(i, record).map(Some) } else { Ok(None) }
        });

        let mut valid_sources = 0;
        let mut generated = 0;
        let mut kept = Vec::with_capacity(buckets.len());
        let buckets: Vec<Vec<Record<M>>> = buckets
            .into_iter()
            .zip(&self.records)
            .map(|(bucket, source)| {
                let (valid, bucket) = match bucket {
                    Ok(Some(bucket)) => (true, bucket),
                    Ok(None) => (false, Vec::new()),
                    Err(_) => (source.has_molecule(), Vec::new()),
                };
                valid_sources += usize::from(valid);
                generated += bucket.len();
                let keep_source = valid
                    && (options.keep_originals
                        || (options.keep_source_when_empty && bucket.is_empty()));
                kept.push(keep_source);
                bucket
            })
            .collect();
        let kept_sources = kept.iter().filter(|&&k| k).count();

        let sources = std::mem::take(&mut self.records);
        let mut output = Vec::with_capacity(kept_sources + generated);
        match options.layout {
            Layout::Prepend => {
                output.extend(
                    sources.into_iter().zip(&kept).filter_map(|(s, &k)| k.then_some(s)),
                );
                output.extend(buckets.into_iter().flatten());
            }
            Layout::Interleave => {
                for ((source, keep), bucket) in sources.into_iter().zip(kept).zip(buckets) {
                    if keep {
                        output.push(source);
                    }
                    output.extend(bucket);
                }
            }
        }
        self.records = output;

        ExpandReport { valid_sources, generated, kept_sources, batch }
    }
}
