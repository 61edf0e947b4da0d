//! Error types for loading data and querying the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the tabular or boundary sources.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Input file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV content.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// Required column absent from the CSV header.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Malformed GeoJSON content.
    #[error("failed to parse GeoJSON {path}: {message}")]
    GeoJsonParse { path: PathBuf, message: String },
}

/// A dataset that does not have the shape the engine expects.
///
/// These are the only hard failures in the engine; every "no data"
/// condition is reported through [`QueryError`] or an empty result.
#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("duplicate attribute column '{column}'")]
    DuplicateColumn { column: String },

    #[error("row {row} ('{entity}') has a value for undeclared column '{column}'")]
    UndeclaredColumn {
        row: usize,
        entity: String,
        column: String,
    },

    #[error("row {row} ('{entity}') has a non-finite value in '{column}'")]
    NonFiniteValue {
        row: usize,
        entity: String,
        column: String,
    },
}

/// Recoverable "no data" outcomes of an engine query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The attribute is not a column of the dataset.
    #[error("attribute '{attribute}' not found")]
    AttributeNotFound { attribute: String },

    /// The attribute exists but no entity in scope has a value for it.
    #[error("no values for '{attribute}' in the selected entities")]
    NoData { attribute: String },
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;
