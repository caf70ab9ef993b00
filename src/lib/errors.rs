//! Custom error types for molpipe operations.

use thiserror::Error;

/// Result type alias for molpipe operations
pub type Result<T> = std::result::Result<T, MolpipeError>;

/// Stage- and run-level errors.
///
/// Per-record problems never surface here; they are counted by the batch
/// runner and the record is left unchanged or dropped by its stage.
#[derive(Error, Debug)]
pub enum MolpipeError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "CSV", "Input file")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// File extension or `--format` value that no loader/writer handles
    #[error("Unsupported format '{format}' (expected one of: {expected})")]
    UnsupportedFormat {
        /// The format as given
        format: String,
        /// Comma-separated list of accepted formats
        expected: String,
    },

    /// Requested SMILES column missing from a CSV/TSV header
    #[error("Column '{column}' not found in header of '{path}'")]
    ColumnNotFound {
        /// The requested column
        column: String,
        /// Path to the file
        path: String,
    },

    /// Substructure query that the toolkit cannot compile
    #[error("Invalid substructure query '{query}': {reason}")]
    InvalidQuery {
        /// The query text
        query: String,
        /// Toolkit explanation
        reason: String,
    },

    /// Worker pool could not be built
    #[error("Failed to build worker pool with {workers} threads: {reason}")]
    ThreadPool {
        /// Requested worker count
        workers: usize,
        /// Underlying rayon error
        reason: String,
    },
}
