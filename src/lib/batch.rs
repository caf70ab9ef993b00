//! Parallel batch execution with per-item failure isolation.
//!
//! A [`BatchRunner`] owns a fixed-size rayon pool for one stage. Every item
//! runs independently: an `Err` or a panic in one item is recorded in its own
//! result slot and never affects the others. Failures are summarized once per
//! batch in a [`BatchReport`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use log::{debug, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

use crate::errors::{MolpipeError, Result};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::toolkit::ToolkitError;
use molpipe_metrics::format_count;

/// Maximum number of failures quoted in the aggregate warning.
pub const MAX_FAILURE_SAMPLES: usize = 5;

/// Why a single item did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// The item's function returned an error.
    #[error("{0}")]
    Failed(String),
    /// The item's function panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl From<ToolkitError> for ItemError {
    fn from(error: ToolkitError) -> Self {
        Self::Failed(error.to_string())
    }
}

/// Per-item outcome.
pub type ItemResult<T> = std::result::Result<T, ItemError>;

/// Summary of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items attempted.
    pub processed: u64,
    /// Items whose function returned an error.
    pub failed: u64,
    /// Items whose function panicked.
    pub panicked: u64,
    /// Up to [`MAX_FAILURE_SAMPLES`] `(index, reason)` pairs, lowest index first.
    pub samples: Vec<(usize, String)>,
}

impl BatchReport {
    /// Builds a report from per-index results.
    #[must_use]
    pub fn from_results<T>(results: &[ItemResult<T>]) -> Self {
        let mut report = Self { processed: results.len() as u64, ..Self::default() };
        for (index, result) in results.iter().enumerate() {
            let Err(error) = result else { continue };
            match error {
                ItemError::Failed(_) => report.failed += 1,
                ItemError::Panicked(_) => report.panicked += 1,
            }
            if report.samples.len() < MAX_FAILURE_SAMPLES {
                report.samples.push((index, error.to_string()));
            }
        }
        report
    }

    /// Failed plus panicked items.
    #[must_use]
    pub fn total_failed(&self) -> u64 {
        self.failed + self.panicked
    }

    /// Items that completed successfully.
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.processed - self.total_failed()
    }

    /// Emits a single aggregate warning if anything failed.
    pub fn log(&self, label: &str) {
        if self.total_failed() == 0 {
            return;
        }
        let samples = self
            .samples
            .iter()
            .map(|(index, reason)| format!("#{index}: {reason}"))
            .collect::<Vec<_>>()
            .join("; ");
        warn!(
            "{label}: {} of {} records failed ({} panicked); first failures: {samples}",
            format_count(self.total_failed()),
            format_count(self.processed),
            format_count(self.panicked),
        );
    }
}

/// Runs per-item work for one stage on a dedicated pool.
///
/// # Example
/// ```
/// use molpipe_lib::batch::{BatchRunner, ItemError};
/// use molpipe_lib::progress::ProgressSink;
///
/// let runner = BatchRunner::new(2).unwrap().with_sink(ProgressSink::Silent);
/// let (results, report) = runner.map("Squaring", &[1, 2, 3], |_, &x| {
///     if x == 2 { Err(ItemError::Failed("even".into())) } else { Ok(x * x) }
/// });
/// assert_eq!(results[0], Ok(1));
/// assert_eq!(results[2], Ok(9));
/// assert_eq!(report.failed, 1);
/// ```
pub struct BatchRunner {
    workers: usize,
    pool: ThreadPool,
    verbose: bool,
    sink: ProgressSink,
}

impl BatchRunner {
    /// Builds a pool with `workers` threads (clamped to at least one).
    ///
    /// # Errors
    /// Returns [`MolpipeError::ThreadPool`] if the pool cannot be created.
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("molpipe-worker-{i}"))
            .build()
            .map_err(|e| MolpipeError::ThreadPool { workers, reason: e.to_string() })?;
        Ok(Self { workers, pool, verbose: false, sink: ProgressSink::detect() })
    }

    /// Include counts, throughput and ETA in progress lines.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Report progress through `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    /// Number of threads in the pool.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Calls `f(i)` for every `i` in `0..count`.
    pub fn run<F>(&self, label: &str, count: usize, f: F) -> BatchReport
    where
        F: Fn(usize) -> ItemResult<()> + Send + Sync,
    {
        let tracker = self.tracker(label, count);
        let results: Vec<ItemResult<()>> = self.pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(|i| {
                    let result = guarded(|| f(i));
                    tracker.update(1);
                    result
                })
                .collect()
        });
        tracker.finish();
        summarize(label, &results)
    }

    /// Produces one result per item, in item order.
    pub fn map<T, R, F>(&self, label: &str, items: &[T], f: F) -> (Vec<ItemResult<R>>, BatchReport)
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> ItemResult<R> + Send + Sync,
    {
        let tracker = self.tracker(label, items.len());
        let results: Vec<ItemResult<R>> = self.pool.install(|| {
            items
                .par_iter()
                .enumerate()
                .map(|(i, item)| {
                    let result = guarded(|| f(i, item));
                    tracker.update(1);
                    result
                })
                .collect()
        });
        tracker.finish();
        let report = summarize(label, &results);
        (results, report)
    }

    /// Mutates every item in place; each call sees only its own slot.
    ///
    /// A function that fails should leave its item untouched: compute the
    /// replacement first and assign it last.
    pub fn update<T, F>(&self, label: &str, items: &mut [T], f: F) -> BatchReport
    where
        T: Send,
        F: Fn(usize, &mut T) -> ItemResult<()> + Send + Sync,
    {
        let tracker = self.tracker(label, items.len());
        let results: Vec<ItemResult<()>> = self.pool.install(|| {
            items
                .par_iter_mut()
                .enumerate()
                .map(|(i, item)| {
                    let result = guarded(|| f(i, item));
                    tracker.update(1);
                    result
                })
                .collect()
        });
        tracker.finish();
        summarize(label, &results)
    }

    fn tracker(&self, label: &str, count: usize) -> ProgressTracker {
        ProgressTracker::new(label, count as u64)
            .with_verbose(self.verbose)
            .with_sink(self.sink.clone())
    }
}

fn guarded<R>(f: impl FnOnce() -> ItemResult<R>) -> ItemResult<R> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(ItemError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn summarize<T>(label: &str, results: &[ItemResult<T>]) -> BatchReport {
    for (index, result) in results.iter().enumerate() {
        if let Err(error) = result {
            debug!("{label}: record {index} failed: {error}");
        }
    }
    let report = BatchReport::from_results(results);
    report.log(label);
    report
}
