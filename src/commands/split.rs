//! Split a dataset into shuffled train/test/validation CSV files.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use molpipe_lib::batch::BatchRunner;
use molpipe_lib::logging::OperationTimer;
use molpipe_lib::smiles::SmilesToolkit;
use molpipe_lib::split::{parse_ratios, write_splits};

use crate::commands::command::Command;
use crate::commands::common::{InputOptions, VerbosityOptions, WorkerOptions};

/// Split a dataset into shuffled CSV subsets.
#[derive(Debug, Parser)]
#[command(
    name = "split",
    about = "\x1b[38;5;166m[UTILITIES]\x1b[0m      \x1b[36mSplit a dataset into train/test/validation CSV files\x1b[0m",
    long_about = r#"
Split a dataset into shuffled subsets written as CSV.

Ratios are normalized to sum to one. Each subset gets floor(ratio * n) records
and the last one takes the remainder. Files are named after --output with its
extension replaced: <base>_train.csv, <base>_test.csv, <base>_validation.csv,
then <base>_split3.csv and so on.

Example usage:
  molpipe split -i in.smi -o data.csv --ratios 0.8,0.1,0.1 --seed 42
  molpipe split -i in.csv -o out/data.csv --ratios 9,1
"#
)]
pub struct Split {
    #[command(flatten)]
    pub input: InputOptions,

    /// Base output path; the split name and .csv are appended to its stem
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Comma-separated split ratios (at least two)
    #[arg(short = 'r', long = "ratios", default_value = "0.8,0.1,0.1")]
    pub ratios: String,

    /// Random seed for the shuffle
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub workers: WorkerOptions,

    #[command(flatten)]
    pub verbosity: VerbosityOptions,
}

impl Command for Split {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.input.validate()?;
        let ratios = parse_ratios(&self.ratios)?;
        let workers = self.workers.resolve();
        let seed = self.seed.unwrap_or_else(rand::random);

        info!("Starting Split");
        info!("Command line: {command_line}");
        info!("Seed: {seed}");
        let shown: Vec<String> = ratios.iter().map(|r| format!("{r:.3}")).collect();
        info!("Ratios: {}", shown.join(", "));

        let toolkit = SmilesToolkit::new();
        let runner = BatchRunner::new(workers)?
            .with_verbose(self.verbosity.verbose)
            .with_sink(self.verbosity.sink());
        let store = self.input.load(&toolkit, &runner)?;

        let timer = OperationTimer::new("Writing splits");
        let splits = write_splits(&toolkit, store, &self.output, &ratios, seed)?;
        let total: usize = splits.iter().map(|(_, n)| n).sum();
        for (path, count) in &splits {
            info!("  {}: {count}", path.display());
        }
        timer.log_completion(total as u64);
        Ok(())
    }

    fn log_filter(&self) -> &'static str {
        self.verbosity.log_filter()
    }
}
