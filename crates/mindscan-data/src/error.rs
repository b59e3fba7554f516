//! Error types for mindscan-data.

use std::path::PathBuf;

/// Errors from CSV loading, preprocessing, splitting, and artifact writing.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a UTF-8 file contains invalid byte sequences.
    #[error("invalid UTF-8 in {path} at row {row_index}; try the latin-1 encoding")]
    InvalidEncoding {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
    },

    /// Returned when the CSV file contains a header but zero data rows,
    /// or when preprocessing removes every row.
    #[error("empty dataset (no data rows) in {source_name}")]
    EmptyDataset {
        /// File path or pipeline stage that produced no rows.
        source_name: String,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when two header cells share a name.
    #[error("duplicate column \"{name}\" at positions {first} and {second}")]
    DuplicateColumn {
        /// The repeated column name.
        name: String,
        /// Zero-based position of the first occurrence.
        first: usize,
        /// Zero-based position of the second occurrence.
        second: usize,
    },

    /// Returned when a named column is not present in the table.
    #[error("unknown column \"{name}\"")]
    UnknownColumn {
        /// The requested column name.
        name: String,
    },

    /// Returned when the target column cannot be read as class labels.
    #[error("target column \"{column}\" is not a class label: {reason}")]
    InvalidTarget {
        /// The target column name.
        column: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Returned when a feature or target cell is missing and rows are not dropped.
    #[error("missing value in column \"{column}\" at row {row}")]
    MissingValue {
        /// Column containing the missing cell.
        column: String,
        /// Zero-based row index.
        row: usize,
    },

    /// Returned when the test fraction is not strictly between 0 and 1.
    #[error("test fraction must be in (0, 1), got {fraction}")]
    InvalidTestFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when a split is requested on fewer than two rows.
    #[error("need at least 2 rows to split, got {n_rows}")]
    TooFewRows {
        /// Rows available.
        n_rows: usize,
    },

    /// Returned when features and labels disagree on row count or width.
    #[error("dataset shape mismatch: {reason}")]
    ShapeMismatch {
        /// Description of the mismatch.
        reason: String,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact cannot be serialized.
    #[error("cannot serialize {what}")]
    Serialize {
        /// The artifact being serialized.
        what: String,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
