//! Shuffled train/test/validation splits of a dataset.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::errors::{self, MolpipeError};
use crate::io::{DataFormat, save};
use crate::record::Record;
use crate::store::RecordStore;
use crate::toolkit::Toolkit;
use molpipe_metrics::format_count;

/// Names of the first three splits; later ones are `split3`, `split4`, ...
pub const SPLIT_NAMES: [&str; 3] = ["train", "test", "validation"];

/// Parses comma-separated ratios and normalizes them to sum to 1.
///
/// # Errors
/// [`MolpipeError::InvalidParameter`] for fewer than two ratios or any ratio
/// that is not a positive finite number.
pub fn parse_ratios(text: &str) -> errors::Result<Vec<f64>> {
    let invalid = |reason: String| MolpipeError::InvalidParameter {
        parameter: "split-output".to_string(),
        reason,
    };
    let ratios = text
        .split(',')
        .map(|item| {
            let item = item.trim();
            match item.parse::<f64>() {
                Ok(ratio) if ratio.is_finite() && ratio > 0.0 => Ok(ratio),
                _ => Err(invalid(format!("Invalid split ratio: '{item}'"))),
            }
        })
        .collect::<errors::Result<Vec<f64>>>()?;
    if ratios.len() < 2 {
        return Err(invalid("At least two split ratios are required".to_string()));
    }
    let total: f64 = ratios.iter().sum();
    Ok(ratios.into_iter().map(|r| r / total).collect())
}

/// Name of split `index`.
#[must_use]
pub fn split_name(index: usize) -> String {
    SPLIT_NAMES.get(index).map_or_else(|| format!("split{index}"), |name| (*name).to_string())
}

/// `<output without extension>_<name>.csv`.
#[must_use]
pub fn split_path(output: &Path, name: &str) -> PathBuf {
    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    output.with_file_name(format!("{stem}_{name}.{}", DataFormat::Csv))
}

/// Shuffles `store` with `seed` and cuts it into `ratios.len()` parts.
///
/// Part `i` gets `floor(ratios[i] * n)` records; the last part takes the
/// remainder. Every record lands in exactly one part.
#[must_use]
pub fn partition<M>(store: RecordStore<M>, ratios: &[f64], seed: u64) -> Vec<RecordStore<M>> {
    let n = store.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut slots: Vec<Option<Record<M>>> = store.into_iter().map(Some).collect();
    let mut parts = Vec::with_capacity(ratios.len());
    let mut start = 0;
    for (i, ratio) in ratios.iter().enumerate() {
        let end = if i + 1 == ratios.len() {
            n
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let size = (ratio * n as f64).floor() as usize;
            (start + size).min(n)
        };
        parts.push(indices[start..end].iter().filter_map(|&j| slots[j].take()).collect());
        start = end;
    }
    parts
}

/// Writes the shuffled splits of `store` as CSV next to `output`.
///
/// Returns the path and record count of each split file.
///
/// # Errors
/// When a split file cannot be written.
pub fn write_splits<T: Toolkit>(
    toolkit: &T,
    store: RecordStore<T::Molecule>,
    output: &Path,
    ratios: &[f64],
    seed: u64,
) -> Result<Vec<(PathBuf, usize)>> {
    let parts = partition(store, ratios, seed);
    let mut written = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let name = split_name(i);
        let path = split_path(output, &name);
        let count = save(toolkit, part, &path, DataFormat::Csv)?;
        info!("Created {name} dataset with {} molecules", format_count(count as u64));
        written.push((path, count));
    }
    Ok(written)
}
