//! DuckDB sink implementation
//!
//! Tables are created on first write with every column typed `VARCHAR`;
//! ULS values are loaded as text and typed later by whoever queries them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{DatabaseError, DatabaseResult, RecordBatch, RecordSink};

/// DuckDB record sink
///
/// Supports both file-based persistence and in-memory mode.
pub struct DuckDBSink {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
}

impl DuckDBSink {
    /// Open (or create) a file-based database
    pub fn new(db_path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;
        tracing::debug!("Opened DuckDB database {}", path.display());

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory database
    pub fn in_memory() -> DatabaseResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Number of rows in a table
    pub fn row_count(&self, table: &str) -> DatabaseResult<usize> {
        let conn = self
            .connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| DatabaseError::QueryFailed(format!("Count failed: {}", e)))?;
        Ok(count.max(0) as usize)
    }

    /// All values of one column, in insertion order
    pub fn column_values(&self, table: &str, column: &str) -> DatabaseResult<Vec<Option<String>>> {
        let conn = self
            .connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))?;
        let sql = format!(
            "SELECT {} FROM {}",
            quote_identifier(column),
            quote_identifier(table)
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row read failed: {}", e)))
    }
}

impl RecordSink for DuckDBSink {
    fn insert_all(&mut self, batch: &RecordBatch) -> DatabaseResult<usize> {
        batch.check_shape()?;
        let mut conn = self
            .connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))?;

        let tx = conn
            .transaction()
            .map_err(|e| DatabaseError::TransactionFailed(format!("Begin failed: {}", e)))?;

        tx.execute_batch(&create_table_sql(batch))
            .map_err(|e| DatabaseError::QueryFailed(format!("Create table failed: {}", e)))?;

        if !batch.is_empty() {
            let mut stmt = tx
                .prepare(&insert_sql(batch))
                .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;
            for row in &batch.rows {
                stmt.execute(duckdb::params_from_iter(row.iter()))
                    .map_err(|e| DatabaseError::QueryFailed(format!("Insert failed: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(format!("Commit failed: {}", e)))?;
        tracing::debug!("Inserted {} rows into {}", batch.len(), batch.table);
        Ok(batch.len())
    }
}

/// Quote an identifier, doubling embedded quotes
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create the table if missing and add any columns it lacks
fn create_table_sql(batch: &RecordBatch) -> String {
    let table = quote_identifier(&batch.table);
    let columns: Vec<String> = batch
        .columns
        .iter()
        .map(|c| format!("{} VARCHAR", quote_identifier(c)))
        .collect();
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({});\n",
        table,
        columns.join(", ")
    );
    for column in &batch.columns {
        sql.push_str(&format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} VARCHAR;\n",
            table,
            quote_identifier(column)
        ));
    }
    sql
}

fn insert_sql(batch: &RecordBatch) -> String {
    let columns: Vec<String> = batch.columns.iter().map(|c| quote_identifier(c)).collect();
    let placeholders = vec!["?"; batch.columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(&batch.table),
        columns.join(", "),
        placeholders
    )
}
