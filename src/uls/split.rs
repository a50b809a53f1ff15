//! Partitioning of combined exports into per-record-type artifacts

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::RawLines;
use crate::definitions::RecordTypeCatalog;
use crate::error::{UlsError, UlsResult};
use crate::format::{TextFormat, is_record_code};

/// Default scratch directory for split artifacts, relative to the working
/// directory
pub const DEFAULT_SCRATCH_DIR: &str = "temp";

/// One per-type artifact written during a split pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitArtifact {
    pub path: PathBuf,
    /// Lines appended by this pass
    pub lines_written: u64,
}

/// Outcome of a split pass
#[derive(Debug, Clone, Default)]
pub struct SplitResult {
    /// Record type -> artifact, for every type seen in this pass
    pub artifacts: BTreeMap<String, SplitArtifact>,
    pub lines_read: u64,
}

/// Open artifact handles keyed by record type
///
/// Handles are dropped (and closed) with this value on every exit path;
/// [`ArtifactWriters::finish`] additionally surfaces flush errors.
struct ArtifactWriters<'a> {
    scratch_dir: &'a Path,
    open: BTreeMap<String, OpenArtifact>,
}

struct OpenArtifact {
    path: PathBuf,
    writer: BufWriter<File>,
    lines_written: u64,
}

impl<'a> ArtifactWriters<'a> {
    fn new(scratch_dir: &'a Path) -> Self {
        Self {
            scratch_dir,
            open: BTreeMap::new(),
        }
    }

    fn writer_for(&mut self, code: &str) -> UlsResult<&mut OpenArtifact> {
        if !self.open.contains_key(code) {
            fs::create_dir_all(self.scratch_dir).map_err(|e| UlsError::io(self.scratch_dir, e))?;
            let path = artifact_path(self.scratch_dir, code);
            // append: artifacts accumulate across passes over the same scratch area
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| UlsError::io(&path, e))?;
            tracing::debug!("Opened split artifact {}", path.display());
            self.open.insert(
                code.to_string(),
                OpenArtifact {
                    path,
                    writer: BufWriter::new(file),
                    lines_written: 0,
                },
            );
        }
        self.open
            .get_mut(code)
            .ok_or_else(|| UlsError::RecordTypeUnknown(code.to_string()))
    }

    fn finish(self) -> UlsResult<BTreeMap<String, SplitArtifact>> {
        let mut artifacts = BTreeMap::new();
        for (code, mut artifact) in self.open {
            artifact
                .writer
                .flush()
                .map_err(|e| UlsError::io(&artifact.path, e))?;
            artifacts.insert(
                code,
                SplitArtifact {
                    path: artifact.path,
                    lines_written: artifact.lines_written,
                },
            );
        }
        Ok(artifacts)
    }
}

/// Path of the artifact for a record type inside a scratch area
pub fn artifact_path(scratch_dir: &Path, code: &str) -> PathBuf {
    scratch_dir.join(format!("{}.csv", code))
}

/// Splits combined files into `<scratch>/<CODE>.csv` artifacts
pub struct StreamSplitter<'a> {
    catalog: &'a RecordTypeCatalog,
    format: TextFormat,
    scratch_dir: PathBuf,
}

impl<'a> StreamSplitter<'a> {
    pub fn new(
        catalog: &'a RecordTypeCatalog,
        format: TextFormat,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            format,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Whether a raw line belongs in an artifact, and under which code
    fn record_type_of<'l>(&self, line: &'l [u8]) -> Option<&'l str> {
        let field = self.format.first_field(line);
        if !is_record_code(field) || !self.catalog.contains_bytes(field) {
            return None;
        }
        std::str::from_utf8(field).ok()
    }

    /// Route every valid line of `input`, verbatim, to its artifact
    ///
    /// Lines with a malformed or unknown first field are dropped silently.
    pub fn split(&self, input: &Path) -> UlsResult<SplitResult> {
        let mut lines = RawLines::open(input)?;
        let mut writers = ArtifactWriters::new(&self.scratch_dir);
        let mut lines_read = 0u64;

        while let Some(line) = lines.next_line()? {
            lines_read += 1;
            let Some(code) = self.record_type_of(line) else {
                continue;
            };
            let artifact = writers.writer_for(code)?;
            artifact
                .writer
                .write_all(line)
                .map_err(|e| UlsError::io(&artifact.path, e))?;
            // Artifacts are appended to across passes, so a source whose final
            // line lacks a terminator would otherwise fuse with the first line
            // of the next pass. The line's bytes are kept; only `\n` is added.
            if !line.ends_with(b"\n") {
                artifact
                    .writer
                    .write_all(b"\n")
                    .map_err(|e| UlsError::io(&artifact.path, e))?;
            }
            artifact.lines_written += 1;
        }

        let artifacts = writers.finish()?;
        for (code, artifact) in &artifacts {
            tracing::info!(
                "Wrote {} {} lines to {}",
                artifact.lines_written,
                code,
                artifact.path.display()
            );
        }
        Ok(SplitResult {
            artifacts,
            lines_read,
        })
    }
}
