//! Dataset loaders and writers.
//!
//! Three formats are handled: SMI (one SMILES per line, optional name) and
//! CSV/TSV with a header row. Loaders parse molecules in parallel through a
//! [`BatchRunner`], a chunk at a time, so a file is never held in memory as
//! raw text and parsed records at once. A line or row that fails to parse is
//! a per-record failure: it is skipped and counted in the chunk's warning.

use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info, warn};

use crate::batch::{BatchRunner, ItemError, ItemResult};
use crate::errors::{self, MolpipeError};
use crate::record::{Record, SMILES_KEY};
use crate::store::RecordStore;
use crate::toolkit::Toolkit;
use molpipe_metrics::format_count;

/// Rows or lines parsed per batch.
pub const LOAD_CHUNK_SIZE: usize = 10_000;

/// Property holding the second token of an SMI line.
pub const NAME_KEY: &str = "Name";

/// Header names recognised as the SMILES column, in priority order.
pub const SMILES_COLUMN_CANDIDATES: [&str; 5] =
    ["SMILES", "smiles", "Smiles", "canonical_smiles", "CanonicalSMILES"];

/// On-disk dataset format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataFormat {
    /// One SMILES per line, optionally followed by a name.
    Smi,
    /// Comma-separated with a header row.
    Csv,
    /// Tab-separated with a header row.
    Tsv,
}

impl DataFormat {
    const EXPECTED: &'static str = "smi, csv, tsv";

    /// Format implied by the file extension (case-insensitive).
    ///
    /// # Errors
    /// [`MolpipeError::UnsupportedFormat`] for a missing or unknown extension.
    pub fn from_path(path: &Path) -> errors::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        ext.parse().map_err(|_| MolpipeError::UnsupportedFormat {
            format: if ext.is_empty() { path.display().to_string() } else { ext.to_string() },
            expected: Self::EXPECTED.to_string(),
        })
    }

    /// `explicit` when given, else the format implied by `path`.
    ///
    /// # Errors
    /// As [`DataFormat::from_path`].
    pub fn resolve(explicit: Option<Self>, path: &Path) -> errors::Result<Self> {
        explicit.map_or_else(|| Self::from_path(path), Ok)
    }

    /// Field delimiter for the tabular formats.
    #[must_use]
    pub fn delimiter(self) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Smi | Self::Tsv => b'\t',
        }
    }

    /// Lowercase name, also the canonical file extension.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Smi => "smi",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataFormat {
    type Err = MolpipeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smi" | "smiles" => Ok(Self::Smi),
            "csv" => Ok(Self::Csv),
            "tsv" | "txt" => Ok(Self::Tsv),
            _ => Err(MolpipeError::UnsupportedFormat {
                format: s.to_string(),
                expected: Self::EXPECTED.to_string(),
            }),
        }
    }
}

/// How to read an input file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the extension-derived format.
    pub format: Option<DataFormat>,
    /// SMILES column names; empty means auto-detect.
    pub smiles_columns: Vec<String>,
}

/// Loads a dataset from `path`.
///
/// # Errors
/// When the file cannot be opened or read, its format is unsupported, a
/// requested SMILES column is missing, or a tabular file has no header.
pub fn load_file<T: Toolkit>(
    toolkit: &T,
    path: &Path,
    options: &LoadOptions,
    runner: &BatchRunner,
) -> Result<RecordStore<T::Molecule>> {
    let format = DataFormat::resolve(options.format, path)?;
    info!("Loading {format} data from {}", path.display());
    let store = match format {
        DataFormat::Smi => load_smi(toolkit, path, runner)?,
        DataFormat::Csv | DataFormat::Tsv => {
            load_delimited(toolkit, path, format, &options.smiles_columns, runner)?
        }
    };
    info!("Loaded {} molecules from {}", format_count(store.len() as u64), path.display());
    Ok(store)
}

fn load_smi<T: Toolkit>(
    toolkit: &T,
    path: &Path,
    runner: &BatchRunner,
) -> Result<RecordStore<T::Molecule>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open SMILES file: {}", path.display()))?;
    // Raw bytes per line: invalid UTF-8 is a per-line failure, not a read error.
    let mut lines = BufReader::new(file).split(b'\n');
    let mut store = RecordStore::new();
    let mut failed = 0u64;

    loop {
        let mut read = 0usize;
        let mut chunk = Vec::with_capacity(LOAD_CHUNK_SIZE);
        for line in lines.by_ref().take(LOAD_CHUNK_SIZE) {
            let line =
                line.with_context(|| format!("Failed to read SMILES file: {}", path.display()))?;
            read += 1;
            let trimmed = line.trim_ascii();
            if !trimmed.is_empty() && !trimmed.starts_with(b"#") {
                chunk.push(line);
            }
        }
        if read == 0 {
            break;
        }
        if chunk.is_empty() {
            continue;
        }
        let (results, report) = runner.map("Parsing SMILES lines", &chunk, |_, line| {
            parse_smi_line(toolkit, line)
        });
        failed += report.total_failed();
        store.extend(results.into_iter().flatten());
    }

    if failed > 0 {
        warn!("Skipped {} unparseable lines in {}", format_count(failed), path.display());
    }
    Ok(store)
}

fn parse_smi_line<T: Toolkit>(toolkit: &T, line: &[u8]) -> ItemResult<Record<T::Molecule>> {
    let line = decode_utf8(line)?;
    let mut tokens = line.split_whitespace();
    let smiles = tokens.next().unwrap_or_default();
    let mut record = Record::with_smiles(toolkit.parse(smiles)?, smiles);
    if let Some(name) = tokens.next() {
        record.set_property(NAME_KEY, name);
    }
    Ok(record)
}

fn decode_utf8(bytes: &[u8]) -> ItemResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| ItemError::Failed(format!("invalid UTF-8: {e}")))
}

fn load_delimited<T: Toolkit>(
    toolkit: &T,
    path: &Path,
    format: DataFormat,
    smiles_columns: &[String],
    runner: &BatchRunner,
) -> Result<RecordStore<T::Molecule>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {format} file: {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(MolpipeError::InvalidFileFormat {
            file_type: format.name().to_uppercase(),
            path: path.display().to_string(),
            reason: "missing header row".to_string(),
        }
        .into());
    }
    let columns = smiles_column_indices(&headers, smiles_columns, path)?;
    debug!(
        "Found {} columns in header, SMILES from: {}",
        headers.len(),
        columns.iter().map(|&i| headers[i].as_str()).collect::<Vec<_>>().join(", ")
    );

    let mut rows = reader.into_byte_records();
    let mut store = RecordStore::new();
    let mut failed = 0u64;
    let mut malformed = 0u64;

    loop {
        let mut read = 0usize;
        let mut chunk = Vec::with_capacity(LOAD_CHUNK_SIZE);
        for row in rows.by_ref().take(LOAD_CHUNK_SIZE) {
            let row = row.with_context(|| format!("Failed to read row of {}", path.display()))?;
            read += 1;
            if row.len() == headers.len() {
                chunk.push(row);
            } else {
                malformed += 1;
            }
        }
        if read == 0 {
            break;
        }
        if chunk.is_empty() {
            continue;
        }
        let (results, report) = runner.map("Parsing SMILES cells", &chunk, |_, row| {
            parse_row(toolkit, &headers, &columns, row)
        });
        failed += report.total_failed();
        for records in results.into_iter().flatten() {
            store.extend(records);
        }
    }

    if malformed > 0 {
        warn!(
            "Skipped {} rows with a field count different from the header in {}",
            format_count(malformed),
            path.display()
        );
    }
    if failed > 0 {
        warn!(
            "Skipped {} rows without a parseable SMILES in {}",
            format_count(failed),
            path.display()
        );
    }
    Ok(store)
}

/// Indices of the SMILES columns: `requested` by name, else the first known
/// SMILES header, else column 0.
fn smiles_column_indices(
    headers: &[String],
    requested: &[String],
    path: &Path,
) -> errors::Result<Vec<usize>> {
    if !requested.is_empty() {
        return requested
            .iter()
            .map(|name| {
                headers.iter().position(|h| h == name).ok_or_else(|| {
                    MolpipeError::ColumnNotFound {
                        column: name.clone(),
                        path: path.display().to_string(),
                    }
                })
            })
            .collect();
    }
    let detected = SMILES_COLUMN_CANDIDATES
        .iter()
        .find_map(|candidate| headers.iter().position(|h| h == candidate));
    if detected.is_none() {
        warn!("No SMILES column found in {}, using the first column", path.display());
    }
    Ok(vec![detected.unwrap_or(0)])
}

/// One record per SMILES column with a parseable non-empty cell.
///
/// Fails when a cell is not UTF-8, or when the row has SMILES cells and none
/// of them parse.
fn parse_row<T: Toolkit>(
    toolkit: &T,
    headers: &[String],
    columns: &[usize],
    row: &csv::ByteRecord,
) -> ItemResult<Vec<Record<T::Molecule>>> {
    let row = row.iter().map(decode_utf8).collect::<ItemResult<Vec<&str>>>()?;
    let mut records = Vec::with_capacity(columns.len());
    let mut first_error = None;
    for &column in columns {
        let cell = row.get(column).copied().unwrap_or_default().trim();
        if cell.is_empty() {
            continue;
        }
        match toolkit.parse(cell) {
            Ok(mol) => {
                let mut record = Record::new(mol);
                for (key, value) in headers.iter().zip(row.iter().copied()) {
                    record.set_property(key.as_str(), value);
                }
                record.set_smiles(cell);
                records.push(record);
            }
            Err(error) => {
                first_error.get_or_insert(error);
            }
        }
    }
    match first_error {
        Some(error) if records.is_empty() => Err(ItemError::from(error)),
        _ => Ok(records),
    }
}

/// Builds a store from a comma-separated list of SMILES.
///
/// # Errors
/// [`MolpipeError::InvalidParameter`] if any entry fails to parse or the list
/// is empty.
pub fn load_smiles_list<T: Toolkit>(
    toolkit: &T,
    list: &str,
) -> errors::Result<RecordStore<T::Molecule>> {
    let store = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|smiles| {
            toolkit.parse(smiles).map(|mol| Record::with_smiles(mol, smiles)).map_err(|e| {
                MolpipeError::InvalidParameter {
                    parameter: "smiles".to_string(),
                    reason: format!("'{smiles}': {e}"),
                }
            })
        })
        .collect::<errors::Result<RecordStore<_>>>()?;
    if store.is_empty() {
        return Err(MolpipeError::InvalidParameter {
            parameter: "smiles".to_string(),
            reason: "no SMILES given".to_string(),
        });
    }
    Ok(store)
}

/// SMILES written for `record`: its `SMILES` property, else the canonical text.
fn output_smiles<T: Toolkit>(toolkit: &T, record: &Record<T::Molecule>) -> Option<String> {
    let mol = record.molecule.as_ref()?;
    match record.smiles() {
        Some(smiles) => Some(smiles.to_string()),
        None => toolkit.canonical_text(mol).ok(),
    }
}

/// Writes every record with a molecule to `path`; returns the number written.
///
/// # Errors
/// When the file cannot be created or written.
pub fn save<T: Toolkit>(
    toolkit: &T,
    store: &RecordStore<T::Molecule>,
    path: &Path,
    format: DataFormat,
) -> Result<usize> {
    let written = match format {
        DataFormat::Smi => save_smi(toolkit, store, path)?,
        DataFormat::Csv | DataFormat::Tsv => save_delimited(toolkit, store, path, format)?,
    };
    let skipped = store.len() - written;
    if skipped > 0 {
        debug!("Did not write {} records without a molecule", format_count(skipped as u64));
    }
    info!("Wrote {} records to {}", format_count(written as u64), path.display());
    Ok(written)
}

fn save_smi<T: Toolkit>(
    toolkit: &T,
    store: &RecordStore<T::Molecule>,
    path: &Path,
) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;
    for record in store {
        let Some(smiles) = output_smiles(toolkit, record) else { continue };
        let mut line = smiles;
        for (key, value) in &record.properties {
            if key != SMILES_KEY {
                line.push('\t');
                line.push_str(value);
            }
        }
        writeln!(writer, "{line}")
            .with_context(|| format!("Failed to write to {}", path.display()))?;
        written += 1;
    }
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(written)
}

fn save_delimited<T: Toolkit>(
    toolkit: &T,
    store: &RecordStore<T::Molecule>,
    path: &Path,
    format: DataFormat,
) -> Result<usize> {
    let columns: BTreeSet<&str> = store
        .iter()
        .filter(|r| r.has_molecule())
        .flat_map(|r| r.properties.keys().map(String::as_str))
        .filter(|key| *key != SMILES_KEY)
        .collect();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    writer
        .write_record(std::iter::once(SMILES_KEY).chain(columns.iter().copied()))
        .with_context(|| format!("Failed to write header to {}", path.display()))?;

    let mut written = 0;
    for record in store {
        let Some(smiles) = output_smiles(toolkit, record) else { continue };
        let row = std::iter::once(smiles.as_str())
            .chain(columns.iter().map(|c| record.property(c).unwrap_or_default()));
        writer
            .write_record(row)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
        written += 1;
    }
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(written)
}
