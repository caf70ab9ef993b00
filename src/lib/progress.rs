//! Progress tracking for parallel batch stages.
//!
//! [`ProgressTracker`] counts completed items from many worker threads and
//! reports percentage, throughput and ETA whenever completion has advanced by at
//! least [`MIN_PROGRESS_STEP`] percentage points since the last report.

use log::{debug, info};
use parking_lot::Mutex;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::logging::{format_duration, format_rate};
use molpipe_metrics::format_count;

/// Minimum advance, in percentage points, between two status lines.
pub const MIN_PROGRESS_STEP: f64 = 0.01;

/// Below this elapsed time throughput and ETA are not reported.
const MIN_ELAPSED_FOR_RATE: Duration = Duration::from_millis(1);

/// Destination for progress lines.
#[derive(Debug, Clone, Default)]
pub enum ProgressSink {
    /// Carriage-return overwritten line on stderr.
    Terminal,
    /// Status lines at `debug`, the completion line at `info`.
    #[default]
    Log,
    /// Discard everything.
    Silent,
    /// Collect lines in memory.
    Buffer(Arc<Mutex<Vec<String>>>),
}

impl ProgressSink {
    /// `Terminal` when stderr is a TTY, `Log` otherwise.
    #[must_use]
    pub fn detect() -> Self {
        if std::io::stderr().is_terminal() { Self::Terminal } else { Self::Log }
    }

    /// Creates a buffering sink and returns a handle to its lines.
    #[must_use]
    pub fn buffer() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (Self::Buffer(Arc::clone(&lines)), lines)
    }

    fn emit(&self, line: &str, last: bool) {
        match self {
            Self::Terminal => {
                let mut stderr = std::io::stderr().lock();
                let _ = if last {
                    writeln!(stderr, "\r{line}")
                } else {
                    write!(stderr, "\r{line}").and_then(|()| stderr.flush())
                };
            }
            Self::Log if last => info!("{line}"),
            Self::Log => debug!("{line}"),
            Self::Silent => {}
            Self::Buffer(lines) => lines.lock().push(line.to_string()),
        }
    }
}

/// Thread-safe progress tracker for one stage.
///
/// `update` is lock-free unless a report is due; the report itself is
/// serialized behind a mutex and re-checked after acquiring it, so concurrent
/// callers never print the same step twice.
///
/// # Example
/// ```
/// use molpipe_lib::progress::{ProgressSink, ProgressTracker};
///
/// let (sink, lines) = ProgressSink::buffer();
/// let tracker = ProgressTracker::new("Canonicalizing", 4).with_sink(sink);
/// for _ in 0..4 {
///     tracker.update(1);
/// }
/// tracker.finish();
/// assert!(lines.lock().last().unwrap().contains("100.00%"));
/// ```
pub struct ProgressTracker {
    label: String,
    total: u64,
    processed: AtomicU64,
    /// Bits of the last reported percentage (`f64`).
    last_reported: AtomicU64,
    finished: AtomicBool,
    print_lock: Mutex<()>,
    start: Instant,
    verbose: bool,
    sink: ProgressSink,
}

impl ProgressTracker {
    /// Creates a tracker for `total` items reporting through [`ProgressSink::detect`].
    #[must_use]
    pub fn new(label: impl Into<String>, total: u64) -> Self {
        Self {
            label: label.into(),
            total,
            processed: AtomicU64::new(0),
            last_reported: AtomicU64::new((-1.0_f64).to_bits()),
            finished: AtomicBool::new(false),
            print_lock: Mutex::new(()),
            start: Instant::now(),
            verbose: false,
            sink: ProgressSink::detect(),
        }
    }

    /// Include counts, throughput and ETA in status lines.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Report through `sink` instead of the detected default.
    #[must_use]
    pub fn with_sink(mut self, sink: ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    /// Number of items reported so far.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Expected number of items.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Adds `n` completed items and prints a status line if one is due.
    pub fn update(&self, n: u64) {
        let processed = self.processed.fetch_add(n, Ordering::Relaxed) + n;
        let percent = self.percent_of(processed);
        if !self.is_due(percent) {
            return;
        }

        let _guard = self.print_lock.lock();
        if !self.is_due(percent) {
            return;
        }
        self.last_reported.store(percent.to_bits(), Ordering::Release);
        let line = self.status_line(processed, percent);
        self.sink.emit(&line, false);
    }

    /// Prints the final 100% line with total elapsed time. Later calls are no-ops.
    pub fn finish(&self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        let _guard = self.print_lock.lock();
        let elapsed = self.start.elapsed();
        let processed = self.processed();
        let mut line = format!("-- {} [{:>6.2}%]", self.label, 100.0);
        if self.verbose {
            line.push_str(&format!(" {}/{}", format_count(processed), format_count(self.total)));
        }
        line.push_str(&format!(" - done in {}", format_duration(elapsed)));
        if self.verbose && elapsed >= MIN_ELAPSED_FOR_RATE {
            line.push_str(&format!(" ({})", format_rate(processed, elapsed)));
        }
        self.sink.emit(&line, true);
    }

    fn is_due(&self, percent: f64) -> bool {
        let last = f64::from_bits(self.last_reported.load(Ordering::Acquire));
        percent - last >= MIN_PROGRESS_STEP
    }

    #[allow(clippy::cast_precision_loss)]
    fn percent_of(&self, processed: u64) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (processed as f64 / self.total as f64 * 100.0).min(100.0)
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn status_line(&self, processed: u64, percent: f64) -> String {
        let mut line = format!("-- {} [{percent:>6.2}%]", self.label);
        if !self.verbose {
            return line;
        }
        line.push_str(&format!(" {}/{}", format_count(processed), format_count(self.total)));

        let elapsed = self.start.elapsed();
        if elapsed >= MIN_ELAPSED_FOR_RATE && processed > 0 {
            let throughput = processed as f64 / elapsed.as_secs_f64();
            let remaining = self.total.saturating_sub(processed) as f64;
            let eta = Duration::from_secs((remaining / throughput).round() as u64);
            line.push_str(&format!(
                " - {} - ETA {}",
                format_rate(processed, elapsed),
                format_duration(eta)
            ));
        }
        line
    }
}
