//! Pipeline driver: runs the enabled stages over a store in a fixed order.
//!
//! Each stage gets a fresh [`BatchRunner`] sized to the run's worker count,
//! is timed with an [`OperationTimer`] and leaves one [`StageMetric`] row.
//! Stages never overlap: a stage starts only after the previous one's
//! runner has returned.

use std::fmt;

use crate::batch::{BatchReport, BatchRunner};
use crate::errors::{MolpipeError, Result};
use crate::logging::OperationTimer;
use crate::progress::ProgressSink;
use crate::stages::{self, DEFAULT_MATCH_COLUMN};
use crate::stages::generate::RANDOM_SYNONYMS;
use crate::store::{RecordStore, SortOrder};
use crate::toolkit::{FragmentMethod, Toolkit, Transform};
use crate::validation::{validate_min_max_f64, validate_positive};
use molpipe_metrics::StageMetric;

/// Keep records whose `property` lies in `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub property: String,
    pub min: f64,
    pub max: f64,
}

/// Stable sort on a numeric `property`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySort {
    pub property: String,
    pub order: SortOrder,
}

/// Everything a run needs besides the toolkit and the input store.
///
/// A stage runs when its option is `true` or `Some`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker threads per stage.
    pub workers: usize,
    /// Verbose progress lines.
    pub verbose: bool,
    pub sink: ProgressSink,
    /// Seed for synonym generation.
    pub seed: u64,

    pub canonicalize: bool,
    pub deduplicate: bool,
    /// Random-SMILES variants per record.
    pub synonyms: Option<usize>,
    pub synonym_method: String,
    pub fragment: Option<FragmentMethod>,
    /// Fragments kept per record; 0 keeps all.
    pub fragment_count: usize,
    /// Keep source records ahead of their fragments.
    pub keep_original_data: bool,
    pub desalt: bool,
    pub tautomerize: bool,
    pub remove_invalid: bool,
    pub neutralize: bool,
    pub add_hydrogens: bool,
    /// Stereoisomers per record.
    pub stereoisomers: Option<usize>,
    /// Column receiving the scaffold SMILES.
    pub scaffold: Option<String>,
    pub standardize: bool,
    pub remove_stereo: bool,
    /// Substructure query text.
    pub match_query: Option<String>,
    pub match_column: String,
    pub filter_by_property: Option<PropertyFilter>,
    pub sort_by_property: Option<PropertySort>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            verbose: false,
            sink: ProgressSink::default(),
            seed: 0,
            canonicalize: false,
            deduplicate: false,
            synonyms: None,
            synonym_method: RANDOM_SYNONYMS.to_string(),
            fragment: None,
            fragment_count: 0,
            keep_original_data: false,
            desalt: false,
            tautomerize: false,
            remove_invalid: false,
            neutralize: false,
            add_hydrogens: false,
            stereoisomers: None,
            scaffold: None,
            standardize: false,
            remove_stereo: false,
            match_query: None,
            match_column: DEFAULT_MATCH_COLUMN.to_string(),
            filter_by_property: None,
            sort_by_property: None,
        }
    }
}

/// A pipeline stage. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Canonicalize,
    Deduplicate,
    Synonyms,
    Fragment,
    Desalt,
    Tautomerize,
    RemoveInvalid,
    Neutralize,
    AddHydrogens,
    Stereoisomers,
    Scaffold,
    Standardize,
    RemoveStereo,
    SubstructureMatch,
    PropertyFilter,
    PropertySort,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 16] = [
        Stage::Canonicalize,
        Stage::Deduplicate,
        Stage::Synonyms,
        Stage::Fragment,
        Stage::Desalt,
        Stage::Tautomerize,
        Stage::RemoveInvalid,
        Stage::Neutralize,
        Stage::AddHydrogens,
        Stage::Stereoisomers,
        Stage::Scaffold,
        Stage::Standardize,
        Stage::RemoveStereo,
        Stage::SubstructureMatch,
        Stage::PropertyFilter,
        Stage::PropertySort,
    ];

    /// Name used in logs and metrics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::Canonicalize => "canonicalize",
            Stage::Deduplicate => "deduplicate",
            Stage::Synonyms => "synonyms",
            Stage::Fragment => "fragment",
            Stage::Desalt => "desalt",
            Stage::Tautomerize => "tautomerize",
            Stage::RemoveInvalid => "remove-invalid",
            Stage::Neutralize => "neutralize",
            Stage::AddHydrogens => "add-hydrogens",
            Stage::Stereoisomers => "stereoisomers",
            Stage::Scaffold => "scaffold",
            Stage::Standardize => "standardize",
            Stage::RemoveStereo => "remove-stereo",
            Stage::SubstructureMatch => "match",
            Stage::PropertyFilter => "filter-by-property",
            Stage::PropertySort => "sort-by-property",
        }
    }

    fn enabled(self, config: &PipelineConfig) -> bool {
        match self {
            Stage::Canonicalize => config.canonicalize,
            Stage::Deduplicate => config.deduplicate,
            Stage::Synonyms => config.synonyms.is_some(),
            Stage::Fragment => config.fragment.is_some(),
            Stage::Desalt => config.desalt,
            Stage::Tautomerize => config.tautomerize,
            Stage::RemoveInvalid => config.remove_invalid,
            Stage::Neutralize => config.neutralize,
            Stage::AddHydrogens => config.add_hydrogens,
            Stage::Stereoisomers => config.stereoisomers.is_some(),
            Stage::Scaffold => config.scaffold.is_some(),
            Stage::Standardize => config.standardize,
            Stage::RemoveStereo => config.remove_stereo,
            Stage::SubstructureMatch => config.match_query.is_some(),
            Stage::PropertyFilter => config.filter_by_property.is_some(),
            Stage::PropertySort => config.sort_by_property.is_some(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated configuration bound to a toolkit.
pub struct Pipeline<'a, T: Toolkit> {
    toolkit: &'a T,
    config: PipelineConfig,
}

impl<'a, T: Toolkit> Pipeline<'a, T> {
    /// Validates `config`.
    ///
    /// # Errors
    /// [`MolpipeError::InvalidParameter`] for a zero synonym or stereoisomer
    /// count, an unknown synonym method, or a property filter with
    /// `min > max`.
    pub fn new(toolkit: &'a T, config: PipelineConfig) -> Result<Self> {
        if let Some(n) = config.synonyms {
            validate_positive(n, "synonyms")?;
            if config.synonym_method != RANDOM_SYNONYMS {
                return Err(MolpipeError::InvalidParameter {
                    parameter: "synonym-method".to_string(),
                    reason: format!(
                        "Unsupported synonym generation method '{}' ({RANDOM_SYNONYMS})",
                        config.synonym_method
                    ),
                });
            }
        }
        if let Some(n) = config.stereoisomers {
            validate_positive(n, "stereoisomers")?;
        }
        if let Some(filter) = &config.filter_by_property {
            validate_min_max_f64(filter.min, filter.max, "filter-by-property")?;
        }
        Ok(Self { toolkit, config })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Enabled stages in execution order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        Stage::ALL.into_iter().filter(|s| s.enabled(&self.config)).collect()
    }

    /// Runs every enabled stage over `store`, returning one metric row per stage.
    ///
    /// # Errors
    /// When a stage's pool cannot be built, or a stage-level parameter (for
    /// example the substructure query) is rejected. Per-record failures never
    /// abort the run.
    pub fn run(&self, store: &mut RecordStore<T::Molecule>) -> Result<Vec<StageMetric>> {
        let stages = self.stages();
        log::info!(
            "Running {} stages with {} workers: {}",
            stages.len(),
            self.config.workers,
            stages.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );
        let mut metrics = Vec::with_capacity(stages.len());
        for stage in stages {
            let runner = BatchRunner::new(self.config.workers)?
                .with_verbose(self.config.verbose)
                .with_sink(self.config.sink.clone());
            let timer = OperationTimer::new(&format!("Stage {stage}"));
            let input = store.len() as u64;
            let failed = self.run_stage(stage, store, &runner)?.total_failed();
            let output = store.len() as u64;
            timer.log_completion(output);
            metrics.push(
                StageMetric::new(stage.name(), input, output)
                    .with_failed(failed)
                    .with_elapsed(timer.elapsed().as_secs_f64()),
            );
        }
        Ok(metrics)
    }

    fn run_stage(
        &self,
        stage: Stage,
        store: &mut RecordStore<T::Molecule>,
        runner: &BatchRunner,
    ) -> Result<BatchReport> {
        let toolkit = self.toolkit;
        let config = &self.config;
        let report = match stage {
            Stage::Canonicalize => stages::canonicalize(toolkit, store, runner),
            Stage::Deduplicate => stages::deduplicate(toolkit, store, runner).batch,
            Stage::Synonyms => {
                let count = config.synonyms.unwrap_or_default();
                let method = config.synonym_method.as_str();
                stages::generate_synonyms(toolkit, store, runner, count, method, config.seed)?
                    .batch
            }
            Stage::Fragment => match config.fragment {
                Some(method) => {
                    let (max, keep) = (config.fragment_count, config.keep_original_data);
                    stages::fragment(toolkit, store, runner, method, max, keep).batch
                }
                None => BatchReport::default(),
            },
            Stage::Desalt => self.transform(store, runner, Transform::LargestFragment),
            Stage::Tautomerize => self.transform(store, runner, Transform::Tautomer),
            Stage::RemoveInvalid => stages::remove_invalid(toolkit, store, runner),
            Stage::Neutralize => self.transform(store, runner, Transform::Neutralize),
            Stage::AddHydrogens => self.transform(store, runner, Transform::AddHydrogens),
            Stage::Stereoisomers => {
                let count = config.stereoisomers.unwrap_or_default();
                stages::generate_stereoisomers(toolkit, store, runner, count).batch
            }
            Stage::Scaffold => match &config.scaffold {
                Some(column) => stages::annotate_scaffold(toolkit, store, runner, column),
                None => BatchReport::default(),
            },
            Stage::Standardize => self.transform(store, runner, Transform::Standardize),
            Stage::RemoveStereo => self.transform(store, runner, Transform::RemoveStereo),
            Stage::SubstructureMatch => match &config.match_query {
                Some(query) => stages::annotate_substructure(
                    toolkit,
                    store,
                    runner,
                    query,
                    &config.match_column,
                )?,
                None => BatchReport::default(),
            },
            Stage::PropertyFilter => match &config.filter_by_property {
                Some(f) => {
                    stages::filter_by_property(store, runner, &f.property, f.min, f.max)?
                }
                None => BatchReport::default(),
            },
            Stage::PropertySort => match &config.sort_by_property {
                Some(s) => stages::sort_by_property(store, runner, &s.property, s.order),
                None => BatchReport::default(),
            },
        };
        Ok(report)
    }

    fn transform(
        &self,
        store: &mut RecordStore<T::Molecule>,
        runner: &BatchRunner,
        transform: Transform,
    ) -> BatchReport {
        stages::apply_transform(self.toolkit, store, runner, transform)
    }
}
