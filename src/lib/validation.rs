//! Input validation utilities
//!
//! Common validation functions for command-line parameters and file paths,
//! returning structured [`MolpipeError`]s with consistent messages.

use crate::errors::{MolpipeError, Result};
use std::fmt::Display;
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input file")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use molpipe_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/mols.smi", "Input file");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(MolpipeError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that `min <= max` for a closed numeric interval.
///
/// Both bounds must also be finite.
///
/// # Errors
/// Returns an error if either bound is NaN/infinite or if `min > max`
///
/// # Example
/// ```
/// use molpipe_lib::validation::validate_min_max_f64;
///
/// validate_min_max_f64(0.0, 500.0, "filter-by-property").unwrap();
/// validate_min_max_f64(1.0, 1.0, "filter-by-property").unwrap();
/// assert!(validate_min_max_f64(5.0, 1.0, "filter-by-property").is_err());
/// ```
pub fn validate_min_max_f64(min: f64, max: f64, name: &str) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(MolpipeError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Bounds must be finite numbers, got: [{min}, {max}]"),
        });
    }
    if min > max {
        return Err(MolpipeError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("min ({min}) must be <= max ({max})"),
        });
    }
    Ok(())
}

/// Validate that a value is positive (> 0)
///
/// # Errors
/// Returns an error if the value is not positive
///
/// # Example
/// ```
/// use molpipe_lib::validation::validate_positive;
///
/// validate_positive(10, "synonyms").unwrap();
/// assert!(validate_positive(0, "synonyms").is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(MolpipeError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}
