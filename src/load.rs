//! Loading of headered data files into a storage sink

use std::path::Path;

use crate::database::{RecordBatch, RecordSink};
use crate::error::{UlsError, UlsResult};
use crate::format::TextFormat;

/// Parse a headered delimited file into a batch for `table`
///
/// Values are passed through as text. A file that is not valid in the
/// format's encoding is an IO error; a row whose field count differs from
/// the header is reported as [`UlsError::RowShapeMismatch`].
pub fn read_batch(path: &Path, table: &str, format: &TextFormat) -> UlsResult<RecordBatch> {
    let bytes = std::fs::read(path).map_err(|e| UlsError::io(path, e))?;
    let text = format.decode(&bytes, path)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(true)
        .quoting(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| UlsError::csv(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut batch = RecordBatch::new(table, columns);

    for record in reader.records() {
        let record = record.map_err(|e| UlsError::csv(path, e))?;
        if record.len() != batch.columns.len() {
            return Err(UlsError::RowShapeMismatch {
                table: table.to_string(),
                line: record.position().map_or(0, |p| p.line()),
                expected: batch.columns.len(),
                actual: record.len(),
            });
        }
        batch.rows.push(record.iter().map(str::to_string).collect());
    }

    tracing::debug!(
        "Read {} rows for {} from {}",
        batch.len(),
        table,
        path.display()
    );
    Ok(batch)
}

/// Read a headered file and insert all its rows into `table`
///
/// Sink errors are returned unmodified; nothing is retried.
pub fn load_file(
    path: &Path,
    table: &str,
    format: &TextFormat,
    sink: &mut dyn RecordSink,
) -> UlsResult<usize> {
    let batch = read_batch(path, table, format)?;
    let inserted = sink.insert_all(&batch)?;
    tracing::info!("Loaded {} rows into table {}", inserted, table);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemorySink;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HD.csv");
        fs::write(&path, "record_type|name1|name2\nHD|foo|bar\nHD|x|\"y\" z\n").unwrap();

        let batch = read_batch(&path, "HD", &TextFormat::default()).unwrap();
        assert_eq!(batch.columns, ["record_type", "name1", "name2"]);
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.rows[1], ["HD", "x", "\"y\" z"]);
    }

    #[test]
    fn test_row_shape_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AC.csv");
        fs::write(&path, "record_type|val\nAC|1\nAC|2|extra\n").unwrap();

        let err = read_batch(&path, "AC", &TextFormat::default()).unwrap_err();
        match err {
            UlsError::RowShapeMismatch {
                table,
                line,
                expected,
                actual,
            } => {
                assert_eq!(table, "AC");
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_file_into_sink() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AC.csv");
        fs::write(&path, "record_type|val\nAC|baz\n").unwrap();

        let mut sink = MemorySink::new();
        let inserted = load_file(&path, "AC", &TextFormat::default(), &mut sink).unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(sink.table("AC").unwrap()[0]["val"], "baz");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HD.csv");
        fs::write(&path, "record_type|v\nHD|a\n\nHD|b\n").unwrap();

        let batch = read_batch(&path, "HD", &TextFormat::default()).unwrap();
        assert_eq!(batch.rows, [["HD", "a"], ["HD", "b"]]);
    }

    #[test]
    fn test_malformed_encoding_is_not_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("EN.csv");
        fs::write(&path, b"record_type|name\nEN|Caf\xe9\n").unwrap();

        let mut sink = MemorySink::new();
        let err = load_file(&path, "EN", &TextFormat::default(), &mut sink).unwrap_err();
        assert!(matches!(
            err,
            UlsError::Io { ref source, .. } if source.kind() == std::io::ErrorKind::InvalidData
        ));
        assert_eq!(sink.row_count("EN"), 0);
    }

    #[test]
    fn test_header_only_file_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("EN.csv");
        fs::write(&path, "record_type|name\n").unwrap();

        let mut sink = MemorySink::new();
        assert_eq!(
            load_file(&path, "EN", &TextFormat::default(), &mut sink).unwrap(),
            0
        );
        assert_eq!(sink.row_count("EN"), 0);
    }
}
