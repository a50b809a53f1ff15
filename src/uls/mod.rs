//! File classification, splitting and header reconciliation
//!
//! A ULS export either holds a single record type (`HD.dat`) or interleaves
//! many (`l_amat.dat` style combined exports). Combined files are split into
//! one scratch artifact per record type; every data file then gets its
//! header row reconciled against the parsed definitions before loading.

pub mod classify;
pub mod reconcile;
pub mod split;

pub use classify::{Classification, classify_file};
pub use reconcile::{
    FullRewrite, HeaderReconciler, MergeStrategy, ReconcileOutcome, StreamingRewrite,
};
pub use split::{SplitArtifact, SplitResult, StreamSplitter};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{UlsError, UlsResult};

/// Buffered reader over the raw lines of a file, terminators included
pub(crate) struct RawLines {
    reader: BufReader<File>,
    path: PathBuf,
    buf: Vec<u8>,
}

impl RawLines {
    pub(crate) fn open(path: &Path) -> UlsResult<Self> {
        let file = File::open(path).map_err(|e| UlsError::io(path, e))?;
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            buf: Vec::new(),
        })
    }

    /// Next line including its terminator, or `None` at end of file
    pub(crate) fn next_line(&mut self) -> UlsResult<Option<&[u8]>> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| UlsError::io(&self.path, e))?;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some(&self.buf))
        }
    }
}
