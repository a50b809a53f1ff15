//! Error types for the ULS loading pipeline

use std::path::PathBuf;
use thiserror::Error;

use crate::database::DatabaseError;

/// Result type for pipeline operations
pub type UlsResult<T> = Result<T, UlsError>;

/// Error type covering definitions parsing, classification, splitting,
/// reconciliation and loading.
#[derive(Debug, Error)]
pub enum UlsError {
    /// No `.txt` definitions file under the definitions directory
    #[error("No .txt definitions file found under '{}'", search_path.display())]
    DefinitionNotFound { search_path: PathBuf },

    /// Requested record type has no usable schema entry
    #[error("Record type not found: {0}")]
    RecordTypeUnknown(String),

    /// Input holds no line whose first field is a known record type
    #[error(
        "No valid record lines found in '{}' (not ULS data, or wrong encoding?)",
        path.display()
    )]
    NoValidRecords { path: PathBuf },

    /// Data row width disagrees with the header width
    #[error("Row {line} of table {table} has {actual} fields, expected {expected}")]
    RowShapeMismatch {
        table: String,
        line: u64,
        expected: usize,
        actual: usize,
    },

    /// Read/write/rename failure on source, scratch or data files
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delimited reader/writer failure
    #[error("CSV error on '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Encoding label not recognised by encoding_rs
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Delimiter is not a single ASCII byte
    #[error("Invalid delimiter {0:?}: must be a single ASCII character")]
    InvalidDelimiter(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage sink failure, passed through unmodified
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Storage backend compiled out of this build
    #[error("Storage backend '{0}' is not available. Rebuild with the matching feature enabled.")]
    BackendUnavailable(String),
}

impl UlsError {
    /// Wrap an IO error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UlsError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a CSV error with the path it occurred on
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        UlsError::Csv {
            path: path.into(),
            source,
        }
    }
}
