//! CLI-specific error types

use std::path::PathBuf;
use thiserror::Error;

use crate::error::UlsError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{count} record type(s) failed: {types}")]
    PartialImport { count: usize, types: String },

    #[error(transparent)]
    Uls(#[from] UlsError),
}
