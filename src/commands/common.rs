//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use molpipe_lib::batch::BatchRunner;
use molpipe_lib::io::{DataFormat, LoadOptions, load_file, load_smiles_list};
use molpipe_lib::progress::ProgressSink;
use molpipe_lib::store::RecordStore;
use molpipe_lib::toolkit::Toolkit;
use molpipe_lib::validation::validate_file_exists;
use molpipe_lib::workers::resolve_worker_count;

/// Where the molecules come from: a file or an inline list.
#[derive(Debug, Clone, Default, Args)]
pub struct InputOptions {
    /// Input file (.smi, .csv or .tsv)
    #[arg(short = 'i', long = "file", visible_alias = "input", conflicts_with = "smiles")]
    pub file: Option<PathBuf>,

    /// Input format, overriding the file extension
    #[arg(long = "format", value_enum)]
    pub format: Option<DataFormat>,

    /// Comma-separated SMILES to process instead of a file
    #[arg(long = "smiles")]
    pub smiles: Option<String>,

    /// SMILES column(s) of a CSV/TSV input; auto-detected when omitted
    #[arg(long = "smiles-col", num_args = 1..)]
    pub smiles_col: Vec<String>,
}

impl InputOptions {
    /// Checks that exactly one source is given and that the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `--file` nor `--smiles` is set, or the file is missing.
    pub fn validate(&self) -> Result<()> {
        match (&self.file, &self.smiles) {
            (Some(file), _) => validate_file_exists(file, "Input file")?,
            (None, Some(_)) => {}
            (None, None) => bail!("One of --file or --smiles is required"),
        }
        Ok(())
    }

    /// Loads the input into a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or an inline SMILES fails to parse.
    pub fn load<T: Toolkit>(
        &self,
        toolkit: &T,
        runner: &BatchRunner,
    ) -> Result<RecordStore<T::Molecule>> {
        match (&self.file, &self.smiles) {
            (Some(file), _) => {
                let options =
                    LoadOptions { format: self.format, smiles_columns: self.smiles_col.clone() };
                load_file(toolkit, file, &options, runner)
            }
            (None, Some(list)) => Ok(load_smiles_list(toolkit, list)?),
            (None, None) => bail!("One of --file or --smiles is required"),
        }
    }
}

/// Output file options.
#[derive(Debug, Clone, Args)]
pub struct OutputOptions {
    /// Output file (.smi, .csv or .tsv)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Output format, overriding the file extension
    #[arg(long = "output-format", value_enum)]
    pub output_format: Option<DataFormat>,
}

impl OutputOptions {
    /// The format to write: `--output-format`, else the output extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension names no supported format.
    pub fn format(&self) -> Result<DataFormat> {
        Ok(DataFormat::resolve(self.output_format, &self.output)?)
    }
}

/// Worker count and its accepted aliases.
///
/// When several are given, the first in declaration order wins. Values below
/// one are treated as one. With none, all cores but two are used.
#[derive(Debug, Clone, Default, Args)]
pub struct WorkerOptions {
    /// Number of worker threads per stage
    #[arg(long = "mpu", allow_negative_numbers = true)]
    pub mpu: Option<i64>,

    /// Alias for --mpu
    #[arg(long = "workers", allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// Alias for --mpu
    #[arg(long = "parallels", allow_negative_numbers = true)]
    pub parallels: Option<i64>,

    /// Alias for --mpu
    #[arg(long = "multiprocessing", allow_negative_numbers = true)]
    pub multiprocessing: Option<i64>,
}

impl WorkerOptions {
    /// The resolved worker count, at least one.
    #[must_use]
    pub fn resolve(&self) -> usize {
        resolve_worker_count(&[self.mpu, self.workers, self.parallels, self.multiprocessing])
    }
}

/// Logging and progress verbosity.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct VerbosityOptions {
    /// Debug logging and detailed progress lines (counts, rate, ETA)
    #[arg(short = 'v', long = "verbose", conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors and hide progress
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl VerbosityOptions {
    /// Default `env_logger` filter; `RUST_LOG` still overrides it.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Progress sink for this verbosity.
    #[must_use]
    pub fn sink(&self) -> ProgressSink {
        if self.quiet { ProgressSink::Silent } else { ProgressSink::detect() }
    }
}
