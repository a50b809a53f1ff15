//! Import command implementation

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::cli::{GlobalArgs, require_file};
use crate::database::open_sink;
use crate::pipeline::ImportReport;

/// Import command arguments
#[derive(Debug, Clone)]
pub struct ImportArgs {
    /// ULS data file (single record type or combined export)
    pub input: PathBuf,
    /// Database file; defaults to the configured path
    pub output: Option<PathBuf>,
    /// Encoding label for the input, overriding both configured encodings
    pub encoding: Option<String>,
}

/// Handle the import command
///
/// Types that loaded stay loaded when others fail; the command still
/// reports failure in that case.
pub fn handle_import(global: &GlobalArgs, args: &ImportArgs) -> Result<ImportReport, CliError> {
    require_file(&args.input)?;

    let mut config = global.load_config()?;
    if let Some(encoding) = &args.encoding {
        config.input.encoding = encoding.clone();
        config.input.combined_encoding = encoding.clone();
    }
    let db_path = args
        .output
        .clone()
        .unwrap_or_else(|| config.db_path(&global.base_dir));

    let pipeline = global.pipeline(config)?;
    let mut sink = open_sink(&db_path)?;
    let report = pipeline.import_file(&args.input, sink.as_mut())?;

    for load in &report.loaded {
        println!("{}: {} rows", load.record_type, load.rows);
    }
    for failure in &report.failures {
        eprintln!("{}: {}", failure.record_type, failure.error);
    }

    if !report.is_success() {
        let types: Vec<&str> = report
            .failures
            .iter()
            .map(|f| f.record_type.as_str())
            .collect();
        return Err(CliError::PartialImport {
            count: types.len(),
            types: types.join(", "),
        });
    }

    println!(
        "Imported {} rows from {} into {}",
        report.total_rows(),
        args.input.display(),
        db_path.display()
    );
    Ok(report)
}
