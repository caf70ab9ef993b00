#![deny(unsafe_code)]

//! Structured metric types and TSV writer for molpipe runs.
//!
//! This crate provides:
//! - [`Metric`] and [`ProcessingMetrics`] traits for extensible metric types
//! - [`stage`] with the per-stage summary row written by `molpipe run --metrics`
//! - [`writer`] module for TSV file output

pub mod stage;
pub mod writer;

use serde::{Deserialize, Serialize};

/// Number of decimal places used for float metrics.
pub const FLOAT_PRECISION: usize = 6;

/// Formats a float value with the standard precision for metrics.
///
/// # Example
/// ```
/// use molpipe_metrics::format_float;
/// assert_eq!(format_float(0.9), "0.900000");
/// assert_eq!(format_float(0.0), "0.000000");
/// ```
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:.FLOAT_PRECISION$}")
}

/// Formats a count with thousands separators.
///
/// # Example
/// ```
/// use molpipe_metrics::format_count;
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// assert_eq!(format_count(12), "12");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type.
    ///
    /// Used in error messages and logging when writing metrics files.
    fn metric_name() -> &'static str;
}

/// Common interface for metrics that track record counts through a stage.
pub trait ProcessingMetrics {
    /// Number of records the stage received.
    fn total_input(&self) -> u64;

    /// Number of records the stage produced.
    fn total_output(&self) -> u64;

    /// Number of records whose per-record work failed.
    fn total_failed(&self) -> u64;

    /// Output as a percentage of input (output / input * 100).
    ///
    /// Generator stages can exceed 100%.
    fn yield_percent(&self) -> f64 {
        if self.total_input() == 0 {
            0.0
        } else {
            #[expect(clippy::cast_precision_loss, reason = "record counts never exceed 2^53")]
            let result = self.total_output() as f64 / self.total_input() as f64 * 100.0;
            result
        }
    }
}

pub use stage::StageMetric;
pub use writer::write_metrics;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(100_000), "100,000");
        assert_eq!(format_count(1_000_000), "1,000,000");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.5), "1.500000");
        assert_eq!(format_float(1.0 / 3.0), "0.333333");
    }

    #[test]
    fn test_yield_percent() {
        let metric = StageMetric {
            stage: "deduplicate".to_string(),
            input_records: 200,
            output_records: 150,
            failed_records: 0,
            elapsed_seconds: 0.5,
        };
        assert!((metric.yield_percent() - 75.0).abs() < f64::EPSILON);

        let empty = StageMetric::default();
        assert!(empty.yield_percent().abs() < f64::EPSILON);
    }
}
