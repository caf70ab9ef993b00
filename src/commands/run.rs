//! Load a dataset, run the selected stages over it and write the result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use molpipe_lib::batch::BatchRunner;
use molpipe_lib::io::save;
use molpipe_lib::logging::{OperationTimer, log_pipeline_summary};
use molpipe_lib::pipeline::{Pipeline, PipelineConfig, PropertyFilter, PropertySort};
use molpipe_lib::smiles::SmilesToolkit;
use molpipe_lib::split::{parse_ratios, write_splits};
use molpipe_lib::stages::DEFAULT_MATCH_COLUMN;
use molpipe_lib::stages::generate::RANDOM_SYNONYMS;
use molpipe_lib::toolkit::FragmentMethod;
use molpipe_metrics::StageMetric;
use molpipe_metrics::writer::write_metrics_auto;

use crate::commands::command::Command;
use crate::commands::common::{InputOptions, OutputOptions, VerbosityOptions, WorkerOptions};

/// Run a molecule processing pipeline.
#[derive(Debug, Parser)]
#[command(
    name = "run",
    about = "\x1b[38;5;30m[PIPELINE]\x1b[0m       \x1b[36mLoad, transform, filter and write molecules\x1b[0m",
    long_about = r#"
Load a dataset of molecules, run the selected stages over it and write the result.

Stages run in a fixed order regardless of the order of the flags:

  canonicalize -> deduplicate -> synonyms -> fragment -> desalt -> tautomerize ->
  remove-invalid -> neutralize -> add-h -> stereoisomers -> scaffold ->
  standardize -> remove-stereo -> match -> filter-by-property -> sort-by-property

Every stage runs its per-molecule work on a pool of --mpu worker threads. A
molecule that fails in a stage is counted and reported once per stage; it never
stops the run.

Inputs are SMI (SMILES and an optional name per line), CSV or TSV with a header
row. For CSV/TSV the SMILES column is taken from --smiles-col, else the first
column named SMILES/smiles/Smiles/canonical_smiles/CanonicalSMILES, else the
first column. All columns are carried through as properties.

Example usage:
  molpipe run -i in.smi -o out.csv --canonicalize --deduplicate
  molpipe run -i in.csv -o out.csv --desalt --neutralize --filter-by-property logP 1 3
  molpipe run --smiles "CCO,c1ccccc1" -o out.smi --synonyms 5 --seed 42
  molpipe run -i in.csv -o out.csv --deduplicate --split-output 0.8,0.1,0.1
"#
)]
pub struct Run {
    #[command(flatten)]
    pub input: InputOptions,

    #[command(flatten)]
    pub output: OutputOptions,

    /// Keep source molecules ahead of their fragments
    #[arg(long = "keep-original-data")]
    pub keep_original_data: bool,

    /// Write shuffled CSV splits with these ratios (e.g. 0.8,0.1,0.1) instead of one file
    #[arg(long = "split-output", value_name = "RATIOS")]
    pub split_output: Option<String>,

    /// Random seed for synonym generation and splits
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Write per-stage record counts and timings to this TSV file
    #[arg(long = "metrics")]
    pub metrics: Option<PathBuf>,

    /// Replace SMILES with the toolkit's canonical SMILES
    #[arg(long = "canonicalize")]
    pub canonicalize: bool,

    /// Keep the first record of each canonical SMILES
    #[arg(long = "deduplicate")]
    pub deduplicate: bool,

    /// Add this many random SMILES variants per molecule after all originals
    #[arg(long = "synonyms", value_name = "N")]
    pub synonyms: Option<usize>,

    /// Synonym generation method
    #[arg(long = "synonym-method", default_value = RANDOM_SYNONYMS)]
    pub synonym_method: String,

    /// Replace molecules with their fragments (brics, recap, components)
    #[arg(long = "fragment", value_name = "METHOD")]
    pub fragment: Option<String>,

    /// Maximum fragments kept per molecule (0 = all)
    #[arg(long = "fragment-count", default_value_t = 0)]
    pub fragment_count: usize,

    /// Keep only the largest fragment (remove salts and solvents)
    #[arg(long = "desalt")]
    pub desalt: bool,

    /// Canonicalize tautomers
    #[arg(long = "tautomerize")]
    pub tautomerize: bool,

    /// Drop molecules that are missing or have no atoms
    #[arg(long = "remove-invalid")]
    pub remove_invalid: bool,

    /// Neutralize charges
    #[arg(long = "neutralize")]
    pub neutralize: bool,

    /// Make hydrogens explicit
    #[arg(long = "add-h")]
    pub add_h: bool,

    /// Follow each molecule with up to N stereoisomers
    #[arg(long = "stereoisomers", value_name = "N")]
    pub stereoisomers: Option<usize>,

    /// Write the Murcko scaffold SMILES to this column
    #[arg(long = "scaffold", value_name = "COL")]
    pub scaffold: Option<String>,

    /// Standardize molecules (neutralize and keep the largest fragment)
    #[arg(long = "standardize")]
    pub standardize: bool,

    /// Remove stereochemistry
    #[arg(long = "remove-stereo")]
    pub remove_stereo: bool,

    /// Flag molecules containing this substructure (SMILES query)
    #[arg(long = "match", value_name = "QUERY")]
    pub match_query: Option<String>,

    /// Column receiving the 1/0 substructure match flag
    #[arg(long = "match-column", default_value = DEFAULT_MATCH_COLUMN)]
    pub match_column: String,

    /// Keep molecules whose numeric PROP lies in [MIN, MAX]
    #[arg(
        long = "filter-by-property",
        num_args = 3,
        value_names = ["PROP", "MIN", "MAX"],
        allow_negative_numbers = true
    )]
    pub filter_by_property: Option<Vec<String>>,

    /// Stable sort on numeric PROP; molecules without a numeric value are dropped
    #[arg(long = "sort-by-property", num_args = 2, value_names = ["PROP", "ORDER"])]
    pub sort_by_property: Option<Vec<String>>,

    #[command(flatten)]
    pub workers: WorkerOptions,

    #[command(flatten)]
    pub verbosity: VerbosityOptions,
}

impl Run {
    fn property_filter(&self) -> Result<Option<PropertyFilter>> {
        let Some(values) = &self.filter_by_property else { return Ok(None) };
        let [property, min, max] = values.as_slice() else {
            anyhow::bail!("--filter-by-property takes PROP MIN MAX");
        };
        let bound = |text: &str, name: &str| {
            text.parse::<f64>()
                .with_context(|| format!("Invalid {name} '{text}' for --filter-by-property"))
        };
        Ok(Some(PropertyFilter {
            property: property.clone(),
            min: bound(min, "MIN")?,
            max: bound(max, "MAX")?,
        }))
    }

    fn property_sort(&self) -> Result<Option<PropertySort>> {
        let Some(values) = &self.sort_by_property else { return Ok(None) };
        let [property, order] = values.as_slice() else {
            anyhow::bail!("--sort-by-property takes PROP ORDER");
        };
        Ok(Some(PropertySort { property: property.clone(), order: order.parse()? }))
    }

    fn config(&self, workers: usize, seed: u64) -> Result<PipelineConfig> {
        let fragment = self.fragment.as_deref().map(str::parse::<FragmentMethod>).transpose()?;
        Ok(PipelineConfig {
            workers,
            verbose: self.verbosity.verbose,
            sink: self.verbosity.sink(),
            seed,
            canonicalize: self.canonicalize,
            deduplicate: self.deduplicate,
            synonyms: self.synonyms,
            synonym_method: self.synonym_method.clone(),
            fragment,
            fragment_count: self.fragment_count,
            keep_original_data: self.keep_original_data,
            desalt: self.desalt,
            tautomerize: self.tautomerize,
            remove_invalid: self.remove_invalid,
            neutralize: self.neutralize,
            add_hydrogens: self.add_h,
            stereoisomers: self.stereoisomers,
            scaffold: self.scaffold.clone(),
            standardize: self.standardize,
            remove_stereo: self.remove_stereo,
            match_query: self.match_query.clone(),
            match_column: self.match_column.clone(),
            filter_by_property: self.property_filter()?,
            sort_by_property: self.property_sort()?,
        })
    }
}

impl Command for Run {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.input.validate()?;
        let ratios = self.split_output.as_deref().map(parse_ratios).transpose()?;
        let format = self.output.format()?;
        let workers = self.workers.resolve();
        let seed = self.seed.unwrap_or_else(rand::random);
        let config = self.config(workers, seed)?;
        let toolkit = SmilesToolkit::new();
        let pipeline = Pipeline::new(&toolkit, config)?;

        info!("Starting Run");
        info!("Command line: {command_line}");
        info!("Workers: {workers}");
        info!("Seed: {seed}");
        info!("Output: {}", self.output.output.display());

        let runner = BatchRunner::new(workers)?
            .with_verbose(self.verbosity.verbose)
            .with_sink(self.verbosity.sink());
        let timer = OperationTimer::new("Loading molecules");
        let mut store = self.input.load(&toolkit, &runner)?;
        timer.log_completion(store.len() as u64);
        let mut metrics = vec![
            StageMetric::new("load", 0, store.len() as u64)
                .with_elapsed(timer.elapsed().as_secs_f64()),
        ];

        metrics.extend(pipeline.run(&mut store)?);

        let timer = OperationTimer::new("Writing molecules");
        let written = match &ratios {
            Some(ratios) => {
                let count = store.len() as u64;
                let splits = write_splits(&toolkit, store, &self.output.output, ratios, seed)?;
                info!("Split {count} records into {} files", splits.len());
                splits.iter().map(|(_, n)| *n).sum::<usize>()
            }
            None => save(&toolkit, &store, &self.output.output, format)?,
        };
        timer.log_completion(written as u64);
        let input = metrics.last().map_or(0, |m| m.output_records);
        metrics.push(
            StageMetric::new("save", input, written as u64)
                .with_elapsed(timer.elapsed().as_secs_f64()),
        );

        log_pipeline_summary(&metrics);
        if let Some(path) = &self.metrics {
            write_metrics_auto(path, &metrics)?;
            info!("Wrote stage metrics to {}", path.display());
        }
        Ok(())
    }

    fn log_filter(&self) -> &'static str {
        self.verbosity.log_filter()
    }
}
