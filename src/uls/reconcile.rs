//! Header reconciliation of per-record-type data files
//!
//! A data file must start with the column-header row of its record type
//! before it can be loaded. Files written by the splitter have no header;
//! files from an earlier run may carry a header from an older definitions
//! file. Reconciliation puts the current header in front of the existing
//! data rows without touching their content or order.
//!
//! Data rows are copied as raw bytes, never decoded: only the line
//! terminator is normalised to `\n`. Only the header is encoded.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::RawLines;
use crate::definitions::split_definition;
use crate::error::{UlsError, UlsResult};
use crate::format::{TextFormat, strip_line_terminator};

/// What reconciliation did to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// File did not exist; written with the header row only
    Created,
    /// Empty or header-only file, left alone
    Unchanged,
    /// Header written in front of the existing data rows
    Rewritten {
        rows: usize,
        /// An older header line was replaced rather than kept as data
        replaced_header: bool,
    },
}

/// How an existing file is rewritten with a new header
pub trait MergeStrategy {
    /// Rewrite `path` as `header` followed by its existing data rows,
    /// dropping the first line when `skip_first_line` is set. Returns the
    /// number of data rows written.
    fn merge(
        &self,
        path: &Path,
        header: &[String],
        skip_first_line: bool,
        format: &TextFormat,
    ) -> UlsResult<usize>;
}

/// Read the whole file, then write header and rows back in one go
#[derive(Debug, Clone, Copy, Default)]
pub struct FullRewrite;

impl MergeStrategy for FullRewrite {
    fn merge(
        &self,
        path: &Path,
        header: &[String],
        skip_first_line: bool,
        format: &TextFormat,
    ) -> UlsResult<usize> {
        let bytes = fs::read(path).map_err(|e| UlsError::io(path, e))?;
        let mut rendered = header_line(header, format, path)?;
        rendered.reserve(bytes.len());

        let mut row_count = 0;
        for line in bytes
            .split_inclusive(|&b| b == b'\n')
            .skip(usize::from(skip_first_line))
        {
            rendered.extend_from_slice(strip_line_terminator(line));
            rendered.push(b'\n');
            row_count += 1;
        }

        fs::write(path, rendered).map_err(|e| UlsError::io(path, e))?;
        Ok(row_count)
    }
}

/// Stream rows into a sibling temporary file, then move it over the target
///
/// Memory use stays flat regardless of file size.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingRewrite;

impl MergeStrategy for StreamingRewrite {
    fn merge(
        &self,
        path: &Path,
        header: &[String],
        skip_first_line: bool,
        format: &TextFormat,
    ) -> UlsResult<usize> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staged = NamedTempFile::new_in(dir).map_err(|e| UlsError::io(dir, e))?;
        let mut out = BufWriter::new(staged);
        out.write_all(&header_line(header, format, path)?)
            .map_err(|e| UlsError::io(path, e))?;

        let mut lines = RawLines::open(path)?;
        let mut row_count = 0;
        let mut first = true;
        while let Some(raw) = lines.next_line()? {
            if std::mem::take(&mut first) && skip_first_line {
                continue;
            }
            out.write_all(strip_line_terminator(raw))
                .and_then(|()| out.write_all(b"\n"))
                .map_err(|e| UlsError::io(path, e))?;
            row_count += 1;
        }

        let staged = out
            .into_inner()
            .map_err(|e| UlsError::io(path, e.into_error()))?;
        staged
            .persist(path)
            .map_err(|e| UlsError::io(path, e.error))?;
        Ok(row_count)
    }
}

/// Header row joined on the delimiter, encoded and `\n`-terminated
fn header_line(header: &[String], format: &TextFormat, path: &Path) -> UlsResult<Vec<u8>> {
    let delimiter = char::from(format.delimiter).to_string();
    let mut line = format.encode(&header.join(delimiter.as_str()), path)?.into_owned();
    line.push(b'\n');
    Ok(line)
}

/// Ensures data files start with the current header row
pub struct HeaderReconciler<S = FullRewrite> {
    format: TextFormat,
    strategy: S,
}

impl HeaderReconciler<FullRewrite> {
    pub fn new(format: TextFormat) -> Self {
        Self {
            format,
            strategy: FullRewrite,
        }
    }
}

impl<S: MergeStrategy> HeaderReconciler<S> {
    pub fn with_strategy(format: TextFormat, strategy: S) -> Self {
        Self { format, strategy }
    }

    /// Reconcile `path` against the canonical `definition` string
    /// (`"col_a, col_b, ..."`) of `record_type`
    pub fn reconcile(
        &self,
        path: &Path,
        record_type: &str,
        definition: &str,
    ) -> UlsResult<ReconcileOutcome> {
        let header = split_definition(definition);
        if header.iter().all(|column| column.trim().is_empty()) {
            // never stamp an empty header onto a data file
            return Err(UlsError::RecordTypeUnknown(record_type.to_string()));
        }

        if !path.exists() {
            fs::write(path, header_line(&header, &self.format, path)?)
                .map_err(|e| UlsError::io(path, e))?;
            tracing::info!("Created {} with {} header", path.display(), record_type);
            return Ok(ReconcileOutcome::Created);
        }

        let (first_line, has_more) = self.peek(path)?;
        let Some(first_line) = first_line else {
            tracing::debug!("{} is empty, leaving it alone", path.display());
            return Ok(ReconcileOutcome::Unchanged);
        };
        let prior_header = self.is_header_line(&first_line, &header, record_type);

        if !has_more && (prior_header || first_line.trim_ascii().is_empty()) {
            // header-only: possibly still being written by another process
            tracing::debug!("{} holds no data rows, leaving it alone", path.display());
            return Ok(ReconcileOutcome::Unchanged);
        }

        let rows = self
            .strategy
            .merge(path, &header, prior_header, &self.format)?;
        tracing::info!(
            "Rewrote {} with {} header and {} data rows",
            path.display(),
            record_type,
            rows
        );
        Ok(ReconcileOutcome::Rewritten {
            rows,
            replaced_header: prior_header,
        })
    }

    /// First raw line and whether more follow
    fn peek(&self, path: &Path) -> UlsResult<(Option<Vec<u8>>, bool)> {
        let mut lines = RawLines::open(path)?;
        let first = match lines.next_line()? {
            Some(raw) => raw.to_vec(),
            None => return Ok((None, false)),
        };
        let has_more = lines.next_line()?.is_some();
        Ok((Some(first), has_more))
    }

    /// A line is an existing header when it opens with the schema's first
    /// column name rather than a record-type code
    ///
    /// Column names and codes are ASCII, so the test runs on raw bytes.
    fn is_header_line(&self, line: &[u8], header: &[String], record_type: &str) -> bool {
        let first_field = self.format.first_field(line);
        header.first().is_some_and(|column| {
            column.as_bytes() == first_field && first_field != record_type.as_bytes()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reconciler() -> HeaderReconciler {
        HeaderReconciler::new(TextFormat::default())
    }

    #[test]
    fn test_creates_header_only_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HD.csv");

        let outcome = reconciler()
            .reconcile(&path, "HD", "record_type, call_sign")
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Created);
        assert_eq!(fs::read_to_string(&path).unwrap(), "record_type|call_sign\n");
    }

    #[test]
    fn test_header_only_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HD.csv");
        let reconciler = reconciler();

        reconciler.reconcile(&path, "HD", "record_type, call_sign").unwrap();
        let second = reconciler
            .reconcile(&path, "HD", "record_type, call_sign")
            .unwrap();
        assert_eq!(second, ReconcileOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&path).unwrap(), "record_type|call_sign\n");
    }

    #[test]
    fn test_empty_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HD.csv");
        fs::write(&path, "").unwrap();

        let outcome = reconciler().reconcile(&path, "HD", "record_type").unwrap();
        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_retrofits_header_onto_raw_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HD.csv");
        fs::write(&path, "HD|foo|bar\r\nHD|x|\"quoted\" y\n").unwrap();

        let outcome = reconciler()
            .reconcile(&path, "HD", "record_type, name1, name2")
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Rewritten {
                rows: 2,
                replaced_header: false
            }
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "record_type|name1|name2\nHD|foo|bar\nHD|x|\"quoted\" y\n"
        );
    }

    #[test]
    fn test_single_data_row_gains_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AC.csv");
        fs::write(&path, "AC|baz\n").unwrap();

        reconciler().reconcile(&path, "AC", "record_type, val").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "record_type|val\nAC|baz\n");
    }

    #[test]
    fn test_replaces_outdated_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("XX.csv");
        fs::write(&path, "a|b\n1|2\n3|4\n").unwrap();

        let outcome = reconciler().reconcile(&path, "XX", "a, b, c").unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Rewritten {
                rows: 2,
                replaced_header: true
            }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "a|b|c\n1|2\n3|4\n");
    }

    #[test]
    fn test_streaming_matches_full_rewrite() {
        let dir = TempDir::new().unwrap();
        let full = dir.path().join("full.csv");
        let streamed = dir.path().join("streamed.csv");
        let content = "a|b\n1|2\n3|4|5\n|\n";
        fs::write(&full, content).unwrap();
        fs::write(&streamed, content).unwrap();

        reconciler().reconcile(&full, "XX", "a, b, c").unwrap();
        HeaderReconciler::with_strategy(TextFormat::default(), StreamingRewrite)
            .reconcile(&streamed, "XX", "a, b, c")
            .unwrap();

        assert_eq!(
            fs::read_to_string(&full).unwrap(),
            fs::read_to_string(&streamed).unwrap()
        );
        assert_eq!(fs::read_to_string(&full).unwrap(), "a|b|c\n1|2\n3|4|5\n|\n");
    }

    #[test]
    fn test_windows_1252_content_survives() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("EN.csv");
        fs::write(&path, b"EN|Caf\xe9\nEN|Na\xefve\n").unwrap();

        let format = TextFormat::new(b'|', "windows-1252").unwrap();
        HeaderReconciler::new(format)
            .reconcile(&path, "EN", "record_type, name")
            .unwrap();
        assert_eq!(
            fs::read(&path).unwrap(),
            b"record_type|name\nEN|Caf\xe9\nEN|Na\xefve\n".to_vec()
        );
    }

    #[test]
    fn test_bytes_invalid_in_configured_encoding_are_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("EN.csv");
        fs::write(&path, b"EN|Caf\xe9\nEN|x\n").unwrap();

        let outcome = reconciler()
            .reconcile(&path, "EN", "record_type, name")
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Rewritten {
                rows: 2,
                replaced_header: false
            }
        );
        assert_eq!(
            fs::read(&path).unwrap(),
            b"record_type|name\nEN|Caf\xe9\nEN|x\n".to_vec()
        );
    }

    #[test]
    fn test_blank_line_between_rows_stays_blank() {
        let dir = TempDir::new().unwrap();
        let full = dir.path().join("full.csv");
        let streamed = dir.path().join("streamed.csv");
        fs::write(&full, "HD|a\n\nHD|b\n").unwrap();
        fs::write(&streamed, "HD|a\n\nHD|b\n").unwrap();

        reconciler().reconcile(&full, "HD", "record_type, v").unwrap();
        HeaderReconciler::with_strategy(TextFormat::default(), StreamingRewrite)
            .reconcile(&streamed, "HD", "record_type, v")
            .unwrap();

        for path in [&full, &streamed] {
            assert_eq!(
                fs::read_to_string(path).unwrap(),
                "record_type|v\nHD|a\n\nHD|b\n"
            );
            let batch = crate::load::read_batch(path, "HD", &TextFormat::default()).unwrap();
            assert_eq!(batch.rows, [["HD", "a"], ["HD", "b"]]);
        }
    }

    #[test]
    fn test_header_with_trailing_space_in_first_field_is_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("XX.csv");
        fs::write(&path, "a |b\n").unwrap();

        let outcome = reconciler().reconcile(&path, "XX", "a, b").unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Rewritten {
                rows: 1,
                replaced_header: false
            }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "a|b\na |b\n");
    }

    #[test]
    fn test_empty_definition_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ZZ.csv");
        fs::write(&path, "ZZ|1\nZZ|2\n").unwrap();

        let err = reconciler().reconcile(&path, "ZZ", "").unwrap_err();
        assert!(matches!(err, UlsError::RecordTypeUnknown(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "ZZ|1\nZZ|2\n");
    }
}
