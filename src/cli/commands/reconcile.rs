//! Reconcile command implementation

use std::path::PathBuf;

use crate::cli::GlobalArgs;
use crate::cli::error::CliError;
use crate::uls::ReconcileOutcome;

/// Reconcile command arguments
#[derive(Debug, Clone)]
pub struct ReconcileArgs {
    /// Data file to bring in line with the definitions
    pub file: PathBuf,
    /// Record type; defaults to the upper-cased file stem
    pub record_type: Option<String>,
}

impl ReconcileArgs {
    fn resolved_record_type(&self) -> Result<String, CliError> {
        if let Some(code) = &self.record_type {
            return Ok(code.to_uppercase());
        }
        self.file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_uppercase)
            .ok_or_else(|| {
                CliError::InvalidArgument(format!(
                    "Cannot derive a record type from {}; pass --record-type",
                    self.file.display()
                ))
            })
    }
}

/// Handle the reconcile command
///
/// A missing file is created holding only the header row.
pub fn handle_reconcile(
    global: &GlobalArgs,
    args: &ReconcileArgs,
) -> Result<ReconcileOutcome, CliError> {
    let record_type = args.resolved_record_type()?;
    let pipeline = global.pipeline(global.load_config()?)?;
    let outcome = pipeline.reconcile_file(&args.file, &record_type)?;

    match outcome {
        ReconcileOutcome::Created => println!("Created {}", args.file.display()),
        ReconcileOutcome::Unchanged => println!("{} unchanged", args.file.display()),
        ReconcileOutcome::Rewritten {
            rows,
            replaced_header,
        } => println!(
            "Rewrote {} ({} rows, header {})",
            args.file.display(),
            rows,
            if replaced_header { "replaced" } else { "added" }
        ),
    }
    Ok(outcome)
}
