//! Single vs. combined record-type detection

use std::collections::BTreeSet;
use std::path::Path;

use super::RawLines;
use crate::definitions::RecordTypeCatalog;
use crate::error::UlsResult;
use crate::format::TextFormat;

/// Verdict of a classification pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Every recognised line carries this one record type
    Single(String),
    /// More than one distinct record type is interleaved
    Combined(BTreeSet<String>),
    /// No line starts with a catalog record type
    None,
}

impl Classification {
    /// Label used by the splitter tool's output
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Single(_) => "individual",
            Classification::Combined(_) => "combined",
            Classification::None => "none",
        }
    }

    /// Distinct record types seen
    pub fn record_types(&self) -> Vec<&str> {
        match self {
            Classification::Single(code) => vec![code.as_str()],
            Classification::Combined(codes) => codes.iter().map(String::as_str).collect(),
            Classification::None => Vec::new(),
        }
    }
}

/// Classify a file by the distinct catalog codes in its first column
///
/// Always reads the whole file: the number of distinct codes, not the
/// number of matching lines, decides the verdict.
pub fn classify_file(
    path: &Path,
    catalog: &RecordTypeCatalog,
    format: &TextFormat,
) -> UlsResult<Classification> {
    let mut seen = BTreeSet::new();
    let mut lines = RawLines::open(path)?;
    let mut line_count = 0u64;

    while let Some(line) = lines.next_line()? {
        line_count += 1;
        let field = format.first_field(line);
        if let Ok(code) = std::str::from_utf8(field)
            && catalog.contains(code)
            && !seen.contains(code)
        {
            seen.insert(code.to_string());
        }
    }

    let classification = match seen.len() {
        0 => Classification::None,
        1 => Classification::Single(seen.into_iter().next().unwrap_or_default()),
        _ => Classification::Combined(seen),
    };
    tracing::info!(
        "Classified {} ({} lines) as {}",
        path.display(),
        line_count,
        classification.label()
    );
    Ok(classification)
}
