//! Utilities for writing metrics files.

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::Serialize;
use std::path::Path;

use crate::Metric;

/// Write metrics to a TSV file with consistent error handling.
///
/// # Errors
/// Returns an error if the file cannot be created or written to
///
/// # Example
/// ```no_run
/// use molpipe_metrics::{StageMetric, write_metrics};
/// use std::path::Path;
///
/// let rows = vec![StageMetric::new("deduplicate", 3, 2)];
/// write_metrics(Path::new("stages.tsv"), &rows, "stage").unwrap();
/// ```
pub fn write_metrics<P: AsRef<Path>, T: Serialize>(
    path: P,
    metrics: &[T],
    description: &str,
) -> Result<()> {
    let path_ref = path.as_ref();
    DelimFile::default()
        .write_tsv(path_ref, metrics)
        .with_context(|| format!("Failed to write {} metrics: {}", description, path_ref.display()))
}

/// Write metrics implementing the [`Metric`] trait, naming them by the type.
pub fn write_metrics_auto<P: AsRef<Path>, T: Metric>(path: P, metrics: &[T]) -> Result<()> {
    write_metrics(path, metrics, T::metric_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StageMetric;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_stage_metrics() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let rows = vec![
            StageMetric::new("canonicalize", 3, 3),
            StageMetric::new("deduplicate", 3, 2).with_elapsed(0.01),
        ];

        write_metrics_auto(temp_file.path(), &rows)?;

        let content = fs::read_to_string(temp_file.path())?;
        let header = content.lines().next().unwrap_or_default();
        assert_eq!(header, "stage\tinput_records\toutput_records\tfailed_records\telapsed_seconds");
        assert!(content.contains("deduplicate\t3\t2\t0"));
        Ok(())
    }

    #[test]
    fn test_roundtrip_tsv() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let rows = vec![StageMetric::new("fragment", 5, 12).with_failed(1).with_elapsed(2.5)];

        write_metrics(temp_file.path(), &rows, "stage")?;
        let read_back: Vec<StageMetric> = DelimFile::default().read_tsv(temp_file.path())?;

        assert_eq!(read_back, rows);
        Ok(())
    }

    #[test]
    fn test_write_metrics_invalid_path() {
        let rows = vec![StageMetric::new("sort", 1, 1)];
        let result = write_metrics("/invalid/path/metrics.tsv", &rows, "stage");
        let err = result.expect_err("writing to a missing directory should fail");
        assert!(err.to_string().contains("Failed to write stage metrics"));
    }
}
