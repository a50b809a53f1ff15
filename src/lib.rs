//! ULS Loader - ingestion of FCC Universal Licensing System exports
//!
//! Provides:
//! - Table definitions parsing and the record-type catalog derived from it
//! - Single / combined classification of pipe-delimited data files
//! - Streaming split of combined files into per-record-type artifacts
//! - Header reconciliation of data files against the current definitions
//! - Loading of headered files into a storage sink (DuckDB by default)

pub mod config;
pub mod database;
pub mod definitions;
pub mod error;
pub mod format;
pub mod load;
pub mod pipeline;
pub mod uls;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use config::{LoaderConfig, RewriteMode, sample_config};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDBSink;
pub use database::{DatabaseError, DatabaseResult, MemorySink, RecordBatch, RecordSink, open_sink};
pub use definitions::{
    RecordTypeCatalog, Schema, TableDefinition, find_definitions_file, load_definitions,
    parse_definitions, record_type_for_table,
};
pub use error::{UlsError, UlsResult};
pub use format::TextFormat;
pub use load::{load_file, read_batch};
pub use pipeline::{ImportReport, Pipeline, SplitOutcome, TableLoad, TypeFailure};
pub use uls::{
    Classification, FullRewrite, HeaderReconciler, MergeStrategy, ReconcileOutcome,
    StreamSplitter, StreamingRewrite, SplitArtifact, SplitResult, classify_file,
};
