//! ULS definitions file parsing
//!
//! The FCC publishes the column layout of every record type as an informal
//! SQL Server DDL dump:
//!
//! ```text
//! create table dbo.PUBACC_HD
//! (
//!       record_type               char(2)              not null,
//!       unique_system_identifier  numeric(9,0)         not null,
//!       ...
//! )
//! go
//! ```
//!
//! Only column names and their order are recovered; types and constraints
//! are ignored. The scan is a small line-oriented state machine rather than
//! one greedy pattern, so nested parentheses (`numeric(9,0)`), comments and
//! constraint lines are handled explicitly.

pub mod catalog;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use catalog::{RecordTypeCatalog, record_type_for_table};

use crate::error::{UlsError, UlsResult};

/// Separator of the canonical column-list string
pub const DEFINITION_SEPARATOR: &str = ", ";

static RE_CREATE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"create table\s+([^\s(]+)").expect("Invalid regex"));
static RE_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(?:\s|$)").expect("Invalid regex"));

/// Leading tokens of table-level constraint clauses
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "constraint",
    "primary",
    "foreign",
    "unique",
    "check",
    "index",
    "key",
];

/// One `create table` block: qualified name and ordered column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<String>,
}

impl TableDefinition {
    /// Canonical `", "`-joined column string
    pub fn definition_string(&self) -> String {
        self.columns.join(DEFINITION_SEPARATOR)
    }
}

/// Split a canonical column string back into column names
///
/// Inverse of [`TableDefinition::definition_string`] for non-empty lists.
pub fn split_definition(definition: &str) -> Vec<String> {
    definition
        .split(DEFINITION_SEPARATOR)
        .map(str::to_string)
        .collect()
}

/// Table name -> ordered column names, in first-seen table order
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: Vec<TableDefinition>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; a repeated name replaces the earlier columns in place
    pub fn insert(&mut self, name: impl Into<String>, columns: Vec<String>) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.tables[i].columns = columns,
            None => {
                self.index.insert(name.clone(), self.tables.len());
                self.tables.push(TableDefinition { name, columns });
            }
        }
    }

    pub fn get(&self, table: &str) -> Option<&TableDefinition> {
        self.index.get(table).map(|&i| &self.tables[i])
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.get(table).map(|t| t.columns.as_slice())
    }

    /// Canonical column string for a table
    pub fn definition(&self, table: &str) -> Option<String> {
        self.get(table).map(TableDefinition::definition_string)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn tables(&self) -> &[TableDefinition] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[derive(Debug)]
enum ScanState {
    Outside,
    /// Saw `create table`, waiting for the opening parenthesis
    AwaitingBody { table: String },
    InBody {
        table: String,
        columns: Vec<String>,
        depth: usize,
        segment: String,
    },
}

/// Parse DDL text into a [`Schema`]
///
/// Never fails: text without any `create table` block yields an empty
/// schema, and a table whose body yields no columns is kept with an empty
/// column list. Callers decide at lookup time whether that is an error.
pub fn parse_definitions(text: &str) -> Schema {
    let mut schema = Schema::new();
    let mut state = ScanState::Outside;

    for raw_line in text.lines() {
        let line = strip_comment(raw_line);
        let mut rest: &str = line;

        loop {
            state = match state {
                ScanState::Outside => match RE_CREATE_TABLE.captures(rest) {
                    Some(caps) => {
                        let table = caps[1].to_string();
                        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
                        tracing::debug!("Found table definition {}", table);
                        ScanState::AwaitingBody { table }
                    }
                    None => {
                        state = ScanState::Outside;
                        break;
                    }
                },
                ScanState::AwaitingBody { table } => match rest.find('(') {
                    Some(pos) => {
                        rest = &rest[pos + 1..];
                        ScanState::InBody {
                            table,
                            columns: Vec::new(),
                            depth: 1,
                            segment: String::new(),
                        }
                    }
                    None => {
                        state = ScanState::AwaitingBody { table };
                        break;
                    }
                },
                ScanState::InBody {
                    table,
                    mut columns,
                    depth,
                    mut segment,
                } => {
                    match scan_body(rest, depth, &mut segment, &mut columns) {
                        BodyProgress::Open(depth) => {
                            // a line break ends the current column segment
                            finish_segment(&mut segment, &mut columns);
                            state = ScanState::InBody {
                                table,
                                columns,
                                depth,
                                segment,
                            };
                            break;
                        }
                        BodyProgress::Closed(consumed) => {
                            finish_table(&mut schema, table, columns);
                            rest = &rest[consumed..];
                            ScanState::Outside
                        }
                    }
                }
            };
        }
    }

    // unterminated final block keeps whatever was recovered
    if let ScanState::InBody {
        table,
        mut columns,
        mut segment,
        ..
    } = state
    {
        finish_segment(&mut segment, &mut columns);
        tracing::warn!("Definition of {} is not terminated", table);
        finish_table(&mut schema, table, columns);
    }

    schema
}

enum BodyProgress {
    /// Body continues on the next line at this depth
    Open(usize),
    /// Body closed; byte offset just past the closing parenthesis
    Closed(usize),
}

fn scan_body(
    text: &str,
    mut depth: usize,
    segment: &mut String,
    columns: &mut Vec<String>,
) -> BodyProgress {
    let mut in_literal = false;

    for (pos, ch) in text.char_indices() {
        if in_literal {
            if ch == '\'' {
                in_literal = false;
            }
            segment.push(ch);
            continue;
        }
        match ch {
            '\'' => {
                in_literal = true;
                segment.push(ch);
            }
            '(' => {
                depth += 1;
                segment.push(ch);
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    finish_segment(segment, columns);
                    return BodyProgress::Closed(pos + ch.len_utf8());
                }
                segment.push(ch);
            }
            ',' if depth == 1 => finish_segment(segment, columns),
            _ => segment.push(ch),
        }
    }

    BodyProgress::Open(depth)
}

fn finish_segment(segment: &mut String, columns: &mut Vec<String>) {
    if let Some(column) = column_name(segment.trim_start()) {
        columns.push(column.to_string());
    }
    segment.clear();
}

fn finish_table(schema: &mut Schema, table: String, columns: Vec<String>) {
    if columns.is_empty() {
        tracing::warn!("Table {} has no recognisable columns", table);
    } else {
        tracing::debug!("Table {} has {} columns", table, columns.len());
    }
    schema.insert(table, columns);
}

/// Leading identifier of a column segment, unless it opens a constraint
fn column_name(segment: &str) -> Option<&str> {
    let name = RE_COLUMN.captures(segment)?.get(1)?.as_str();
    if CONSTRAINT_KEYWORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(name))
    {
        return None;
    }
    Some(name)
}

/// Drop a `--` comment, ignoring dashes inside single-quoted literals
fn strip_comment(line: &str) -> &str {
    let mut in_literal = false;
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        match bytes[i] {
            b'\'' => in_literal = !in_literal,
            b'-' if !in_literal && bytes.get(i + 1) == Some(&b'-') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Find the first `.txt` file under a definitions directory
///
/// The walk is sorted by file name so the choice is deterministic.
pub fn find_definitions_file(dir: &Path) -> UlsResult<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .ok_or_else(|| UlsError::DefinitionNotFound {
            search_path: dir.to_path_buf(),
        })
}

/// Read, decode and parse a definitions file
pub fn load_definitions(
    path: &Path,
    encoding: &'static encoding_rs::Encoding,
) -> UlsResult<Schema> {
    let bytes = std::fs::read(path).map_err(|e| UlsError::io(path, e))?;
    let text = crate::format::decode_strict(encoding, &bytes, path)?;
    let schema = parse_definitions(&text);
    tracing::info!(
        "Loaded {} table definitions from {}",
        schema.len(),
        path.display()
    );
    Ok(schema)
}
