//! Logging helpers: formatted percentages, durations and rates, plus
//! [`OperationTimer`] for stage start/finish lines.

use std::time::{Duration, Instant};

use molpipe_metrics::{ProcessingMetrics, StageMetric, format_count};

/// Formats a fraction (0.0-1.0) as a percentage with `decimals` places.
///
/// ```
/// use molpipe_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration in human-readable form ("45s", "2m 15s", "1h 30m").
///
/// ```
/// use molpipe_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a rate (items per second), falling back to items/min below one per second.
///
/// ```
/// use molpipe_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 items/s");
/// assert_eq!(format_rate(30, Duration::from_secs(60)), "30.0 items/min");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} items/s", format_count(count));
    }

    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} items/s", format_count(rate as u64))
    } else {
        let items_per_min = count as f64 / (secs / 60.0);
        format!("{items_per_min:.1} items/min")
    }
}

/// One summary row: stage name, record flow, yield and failures when there are any.
fn stage_summary_line(stage: &StageMetric) -> String {
    let mut line = format!(
        "{:<24} {} -> {} ({})",
        stage.stage,
        format_count(stage.total_input()),
        format_count(stage.total_output()),
        format_percent(stage.yield_percent() / 100.0, 1)
    );
    if stage.total_failed() > 0 {
        line.push_str(&format!(", {} failed", format_count(stage.total_failed())));
    }
    line
}

/// Logs one line per executed stage, followed by the overall record flow.
pub fn log_pipeline_summary(stages: &[StageMetric]) {
    if stages.is_empty() {
        log::info!("Pipeline Summary: no stages enabled");
        return;
    }
    log::info!("Pipeline Summary:");
    for stage in stages {
        log::info!("  {}", stage_summary_line(stage));
    }
    if let (Some(first), Some(last)) = (stages.first(), stages.last()) {
        log::info!(
            "  Records in: {}, records out: {}",
            format_count(first.input_records),
            format_count(last.output_records)
        );
    }
}

/// Operation timing and summary helper.
///
/// ```no_run
/// use molpipe_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Canonicalizing");
/// // ... do work ...
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Time since the timer was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs the completion with item count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}
