//! Per-stage summary metrics.

use serde::{Deserialize, Serialize};

use crate::{Metric, ProcessingMetrics};

/// One row per executed pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMetric {
    /// Stage name, e.g. `deduplicate`
    pub stage: String,
    /// Records in the store when the stage started
    pub input_records: u64,
    /// Records in the store when the stage finished
    pub output_records: u64,
    /// Records whose per-record work failed (left unchanged, dropped or kept as-is)
    pub failed_records: u64,
    /// Wall-clock time spent in the stage
    pub elapsed_seconds: f64,
}

impl StageMetric {
    /// Creates a metric row for `stage`.
    #[must_use]
    pub fn new(stage: impl Into<String>, input_records: u64, output_records: u64) -> Self {
        Self { stage: stage.into(), input_records, output_records, ..Self::default() }
    }

    /// Sets the failed-record count.
    #[must_use]
    pub fn with_failed(mut self, failed_records: u64) -> Self {
        self.failed_records = failed_records;
        self
    }

    /// Sets the elapsed time in seconds.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed_seconds: f64) -> Self {
        self.elapsed_seconds = elapsed_seconds;
        self
    }
}

impl Metric for StageMetric {
    fn metric_name() -> &'static str {
        "stage"
    }
}

impl ProcessingMetrics for StageMetric {
    fn total_input(&self) -> u64 {
        self.input_records
    }

    fn total_output(&self) -> u64 {
        self.output_records
    }

    fn total_failed(&self) -> u64 {
        self.failed_records
    }
}
