//! Storage sink abstraction
//!
//! The loader hands each record type's rows to a sink as one batch. A sink
//! owns its persistence; it only guarantees that after `insert_all` the
//! named table exists and holds the rows. Implementations:
//! - DuckDB: embedded database file (feature `duckdb-backend`)
//! - Memory: ordered in-process tables, for tests and dry runs

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDBSink;

use std::collections::BTreeMap;
use std::path::Path;

/// Error type for sink operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to open the database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Row does not fit the batch's column list
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for sink operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Text rows for one table, aligned with an ordered column list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RecordBatch {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as column -> value objects
    pub fn records(&self) -> impl Iterator<Item = serde_json::Map<String, serde_json::Value>> + '_ {
        self.rows.iter().map(|row| {
            self.columns
                .iter()
                .zip(row)
                .map(|(column, value)| (column.clone(), serde_json::Value::from(value.as_str())))
                .collect()
        })
    }

    /// Check every row has exactly one value per column
    pub fn check_shape(&self) -> DatabaseResult<()> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(DatabaseError::InvalidInput(format!(
                    "row {} of {} has {} values for {} columns",
                    i + 1,
                    self.table,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}

/// Destination for loaded record batches
pub trait RecordSink {
    /// Insert all rows of `batch` into the table it names, creating the
    /// table if needed. Returns the number of rows inserted.
    fn insert_all(&mut self, batch: &RecordBatch) -> DatabaseResult<usize>;
}

/// In-memory sink keeping tables as ordered lists of records
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, Vec<serde_json::Map<String, serde_json::Value>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&[serde_json::Map<String, serde_json::Value>]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn row_count(&self, name: &str) -> usize {
        self.tables.get(name).map_or(0, Vec::len)
    }
}

impl RecordSink for MemorySink {
    fn insert_all(&mut self, batch: &RecordBatch) -> DatabaseResult<usize> {
        batch.check_shape()?;
        let table = self.tables.entry(batch.table.clone()).or_default();
        table.extend(batch.records());
        Ok(batch.len())
    }
}

/// Open the default on-disk sink at `path`
#[cfg(feature = "duckdb-backend")]
pub fn open_sink(path: &Path) -> crate::error::UlsResult<Box<dyn RecordSink>> {
    Ok(Box::new(DuckDBSink::new(path)?))
}

/// Open the default on-disk sink at `path`
#[cfg(not(feature = "duckdb-backend"))]
pub fn open_sink(path: &Path) -> crate::error::UlsResult<Box<dyn RecordSink>> {
    tracing::error!("Cannot open {}: no storage backend compiled in", path.display());
    Err(crate::error::UlsError::BackendUnavailable("duckdb".to_string()))
}
