//! End-to-end processing of one ULS input file
//!
//! Definitions parsing and classification failures abort the whole file.
//! Once a combined file is split, each record type is reconciled and loaded
//! as its own unit of work: one type failing does not stop the others.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};

use crate::config::{LoaderConfig, RewriteMode};
use crate::database::RecordSink;
use crate::definitions::{RecordTypeCatalog, Schema, find_definitions_file, load_definitions};
use crate::error::{UlsError, UlsResult};
use crate::format::TextFormat;
use crate::load::load_file;
use crate::uls::{
    Classification, HeaderReconciler, RawLines, ReconcileOutcome, SplitResult, StreamSplitter,
    StreamingRewrite, classify_file,
};

/// Rows loaded into one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub record_type: String,
    pub rows: usize,
}

/// A record type whose reconciliation or load failed
#[derive(Debug)]
pub struct TypeFailure {
    pub record_type: String,
    pub error: UlsError,
}

/// Outcome of importing one input file
#[derive(Debug)]
pub struct ImportReport {
    pub source: PathBuf,
    pub classification: Classification,
    pub loaded: Vec<TableLoad>,
    pub failures: Vec<TypeFailure>,
}

impl ImportReport {
    pub fn total_rows(&self) -> usize {
        self.loaded.iter().map(|l| l.rows).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Rows loaded for a record type, if it was loaded
    pub fn rows_for(&self, record_type: &str) -> Option<usize> {
        self.loaded
            .iter()
            .find(|l| l.record_type == record_type)
            .map(|l| l.rows)
    }

    /// The report itself, or the first per-type failure
    pub fn into_result(mut self) -> UlsResult<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(self.failures.swap_remove(0).error)
        }
    }
}

/// Outcome of a standalone split
#[derive(Debug)]
pub struct SplitOutcome {
    pub classification: Classification,
    /// Present for combined files only
    pub split: Option<SplitResult>,
}

/// Definitions, catalog and formats bound for one invocation
pub struct Pipeline {
    config: LoaderConfig,
    base_dir: PathBuf,
    schema: Schema,
    catalog: RecordTypeCatalog,
    single_format: TextFormat,
    combined_format: TextFormat,
    temp_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Validate the configuration and load the definitions file found
    /// under the configured definitions directory
    pub fn new(config: LoaderConfig, base_dir: impl Into<PathBuf>) -> UlsResult<Self> {
        config.validate()?;
        let base_dir = base_dir.into();
        let definitions_file = find_definitions_file(&config.definitions_dir(&base_dir))?;
        let schema = load_definitions(&definitions_file, config.definitions_encoding()?)?;
        Self::with_schema(config, base_dir, schema)
    }

    /// Build from an already parsed schema
    pub fn with_schema(
        config: LoaderConfig,
        base_dir: impl Into<PathBuf>,
        schema: Schema,
    ) -> UlsResult<Self> {
        config.validate()?;
        let catalog = RecordTypeCatalog::from_schema(&schema);
        tracing::debug!(
            "Record types: {}",
            catalog.codes().collect::<Vec<_>>().join(", ")
        );
        Ok(Self {
            single_format: config.single_format()?,
            combined_format: config.combined_format()?,
            config,
            base_dir: base_dir.into(),
            schema,
            catalog,
            temp_dir: None,
        })
    }

    /// Directory for intermediate files (system temp dir by default)
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn catalog(&self) -> &RecordTypeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Canonical column string of a record type
    pub fn definition_for(&self, record_type: &str) -> UlsResult<String> {
        let columns = self.catalog.columns_for(record_type, &self.schema)?;
        Ok(columns.join(crate::definitions::DEFINITION_SEPARATOR))
    }

    /// Single / combined / none verdict for a file
    pub fn classify_file(&self, path: &Path) -> UlsResult<Classification> {
        classify_file(path, &self.catalog, &self.combined_format)
    }

    fn classify_required(&self, path: &Path) -> UlsResult<Classification> {
        match self.classify_file(path)? {
            Classification::None => Err(UlsError::NoValidRecords {
                path: path.to_path_buf(),
            }),
            classification => Ok(classification),
        }
    }

    /// Split a combined file into the persistent scratch area
    ///
    /// Artifacts are appended to, so repeated splits accumulate.
    pub fn split_file(&self, path: &Path) -> UlsResult<SplitOutcome> {
        let classification = self.classify_required(path)?;
        let split = match &classification {
            Classification::Combined(_) => {
                let scratch = self.config.scratch_dir(&self.base_dir);
                let splitter = StreamSplitter::new(&self.catalog, self.combined_format, scratch);
                Some(splitter.split(path)?)
            }
            _ => None,
        };
        Ok(SplitOutcome {
            classification,
            split,
        })
    }

    /// Reconcile the header of a persisted data file
    pub fn reconcile_file(&self, path: &Path, record_type: &str) -> UlsResult<ReconcileOutcome> {
        let definition = self.definition_for(record_type)?;
        self.reconcile_with(path, record_type, &definition, self.single_format)
    }

    fn reconcile_with(
        &self,
        path: &Path,
        record_type: &str,
        definition: &str,
        format: TextFormat,
    ) -> UlsResult<ReconcileOutcome> {
        match self.config.reconcile.mode {
            RewriteMode::Full => {
                HeaderReconciler::new(format).reconcile(path, record_type, definition)
            }
            RewriteMode::Streaming => HeaderReconciler::with_strategy(format, StreamingRewrite)
                .reconcile(path, record_type, definition),
        }
    }

    /// Classify, normalise or split, reconcile and load one input file
    pub fn import_file(&self, path: &Path, sink: &mut dyn RecordSink) -> UlsResult<ImportReport> {
        let classification = self.classify_file(path)?;
        let mut loaded = Vec::new();
        let mut failures = Vec::new();

        match &classification {
            Classification::None => {
                return Err(UlsError::NoValidRecords {
                    path: path.to_path_buf(),
                });
            }
            Classification::Single(code) => {
                self.warn_on_stem_mismatch(path, code);
                let rows = self.import_single(path, code, sink)?;
                loaded.push(TableLoad {
                    record_type: code.clone(),
                    rows,
                });
            }
            Classification::Combined(_) => {
                let scratch = self.scratch_tempdir()?;
                let splitter =
                    StreamSplitter::new(&self.catalog, self.combined_format, scratch.path());
                let split = splitter.split(path)?;

                for (code, artifact) in split.artifacts {
                    match self.load_artifact(&artifact.path, &code, self.combined_format, sink) {
                        Ok(rows) => loaded.push(TableLoad {
                            record_type: code,
                            rows,
                        }),
                        Err(error) => {
                            tracing::error!("Record type {} failed: {}", code, error);
                            failures.push(TypeFailure {
                                record_type: code,
                                error,
                            });
                        }
                    }
                }
            }
        }

        let report = ImportReport {
            source: path.to_path_buf(),
            classification,
            loaded,
            failures,
        };
        tracing::info!(
            "Imported {}: {} rows into {} tables, {} failures",
            path.display(),
            report.total_rows(),
            report.loaded.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Copy the valid lines of a single-type file into a temporary file,
    /// then reconcile and load it. The copy is removed on every exit path.
    fn import_single(
        &self,
        path: &Path,
        record_type: &str,
        sink: &mut dyn RecordSink,
    ) -> UlsResult<usize> {
        let definition = self.definition_for(record_type)?;
        let staged = self.staging_file()?;

        {
            let mut out = BufWriter::new(staged.as_file());
            let mut lines = RawLines::open(path)?;
            while let Some(line) = lines.next_line()? {
                if self.single_format.first_field(line) != record_type.as_bytes() {
                    continue;
                }
                out.write_all(line)
                    .map_err(|e| UlsError::io(staged.path(), e))?;
                if !line.ends_with(b"\n") {
                    out.write_all(b"\n")
                        .map_err(|e| UlsError::io(staged.path(), e))?;
                }
            }
            out.flush().map_err(|e| UlsError::io(staged.path(), e))?;
        }

        self.reconcile_with(staged.path(), record_type, &definition, self.single_format)?;
        load_file(staged.path(), record_type, &self.single_format, sink)
    }

    fn load_artifact(
        &self,
        path: &Path,
        record_type: &str,
        format: TextFormat,
        sink: &mut dyn RecordSink,
    ) -> UlsResult<usize> {
        let definition = self.definition_for(record_type)?;
        self.reconcile_with(path, record_type, &definition, format)?;
        load_file(path, record_type, &format, sink)
    }

    fn staging_file(&self) -> UlsResult<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("uls-").suffix(".csv");
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir).map_err(|e| UlsError::io(dir, e)),
            None => builder
                .tempfile()
                .map_err(|e| UlsError::io(std::env::temp_dir(), e)),
        }
    }

    fn scratch_tempdir(&self) -> UlsResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("uls-split-");
        match &self.temp_dir {
            Some(dir) => builder.tempdir_in(dir).map_err(|e| UlsError::io(dir, e)),
            None => builder
                .tempdir()
                .map_err(|e| UlsError::io(std::env::temp_dir(), e)),
        }
    }

    fn warn_on_stem_mismatch(&self, path: &Path, record_type: &str) {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if !stem.eq_ignore_ascii_case(record_type) {
            tracing::warn!(
                "{} holds {} records; loading into table {}",
                path.display(),
                record_type,
                record_type
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemorySink;
    use crate::definitions::parse_definitions;
    use std::fs;

    const DDL: &str = "\
create table dbo.PUBACC_HD
(
      record_type   char(2) not null,
      name1         varchar(10) null,
      name2         varchar(10) null
)
go
create table dbo.PUBACC_AC
(
      record_type   char(2) not null,
      val           varchar(10) null
)
go
create table dbo.PUBACC_ZZ
(
)
";

    fn pipeline(dir: &Path) -> Pipeline {
        Pipeline::with_schema(LoaderConfig::new(), dir, parse_definitions(DDL))
            .unwrap()
            .with_temp_dir(dir)
    }

    #[test]
    fn test_definition_for() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        assert_eq!(pipeline.definition_for("AC").unwrap(), "record_type, val");
        assert!(matches!(
            pipeline.definition_for("ZZ"),
            Err(UlsError::RecordTypeUnknown(_))
        ));
        assert!(matches!(
            pipeline.definition_for("EN"),
            Err(UlsError::RecordTypeUnknown(_))
        ));
    }

    #[test]
    fn test_import_single_type_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("HD.dat");
        fs::write(&input, "HD|foo|bar\nHD|x|y\n").unwrap();

        let pipeline = pipeline(dir.path());
        let mut sink = MemorySink::new();
        let report = pipeline.import_file(&input, &mut sink).unwrap();

        assert_eq!(report.classification, Classification::Single("HD".into()));
        assert_eq!(report.rows_for("HD"), Some(2));
        assert_eq!(sink.table("HD").unwrap()[1]["name2"], "y");
        // only the input remains: the staged copy is gone
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(fs::read_to_string(&input).unwrap(), "HD|foo|bar\nHD|x|y\n");
    }

    #[test]
    fn test_staged_copy_removed_when_load_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("HD.dat");
        fs::write(&input, "HD|foo|bar\nHD|too|many|fields\n").unwrap();

        let pipeline = pipeline(dir.path());
        let mut sink = MemorySink::new();
        let err = pipeline.import_file(&input, &mut sink).unwrap_err();

        assert!(matches!(err, UlsError::RowShapeMismatch { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_single_type_file_in_wrong_encoding_is_not_loaded() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("HD.dat");
        fs::write(&input, b"HD|caf\xe9|bar\n").unwrap();

        let pipeline = pipeline(dir.path());
        let mut sink = MemorySink::new();
        let err = pipeline.import_file(&input, &mut sink).unwrap_err();

        assert!(matches!(
            err,
            UlsError::Io { ref source, .. } if source.kind() == std::io::ErrorKind::InvalidData
        ));
        assert_eq!(sink.row_count("HD"), 0);
        assert_eq!(fs::read(&input).unwrap(), b"HD|caf\xe9|bar\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_combined_failures_are_isolated() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("combined.dat");
        fs::write(&input, "HD|a|b\nZZ|1\nAC|1\nAC|2|3\n").unwrap();

        let pipeline = pipeline(dir.path());
        let mut sink = MemorySink::new();
        let report = pipeline.import_file(&input, &mut sink).unwrap();

        assert_eq!(report.rows_for("HD"), Some(1));
        let failed: Vec<_> = report.failures.iter().map(|f| f.record_type.as_str()).collect();
        assert_eq!(failed, ["AC", "ZZ"]);
        assert!(matches!(
            report.failures[1].error,
            UlsError::RecordTypeUnknown(_)
        ));
        assert_eq!(sink.row_count("HD"), 1);
        assert_eq!(sink.row_count("AC"), 0);
        assert!(report.into_result().is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_no_valid_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("junk.dat");
        fs::write(&input, "hello|world\n").unwrap();

        let pipeline = pipeline(dir.path());
        let mut sink = MemorySink::new();
        assert!(matches!(
            pipeline.import_file(&input, &mut sink),
            Err(UlsError::NoValidRecords { .. })
        ));
        assert!(matches!(
            pipeline.split_file(&input),
            Err(UlsError::NoValidRecords { .. })
        ));
    }

    #[test]
    fn test_split_file_single_writes_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("AC.dat");
        fs::write(&input, "AC|1\n").unwrap();

        let pipeline = pipeline(dir.path());
        let outcome = pipeline.split_file(&input).unwrap();
        assert_eq!(outcome.classification.label(), "individual");
        assert!(outcome.split.is_none());
        assert!(!dir.path().join("temp").exists());
    }
}
