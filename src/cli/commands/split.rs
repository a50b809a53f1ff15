//! Split command implementation

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::cli::{GlobalArgs, require_file};
use crate::pipeline::SplitOutcome;

/// Split command arguments
#[derive(Debug, Clone)]
pub struct SplitArgs {
    /// ULS data file
    pub input: PathBuf,
}

/// Handle the split command
///
/// Prints `individual` or `combined`; combined files are split into the
/// configured scratch directory, appending to any existing artifacts.
pub fn handle_split(global: &GlobalArgs, args: &SplitArgs) -> Result<SplitOutcome, CliError> {
    require_file(&args.input)?;
    let pipeline = global.pipeline(global.load_config()?)?;
    let outcome = pipeline.split_file(&args.input)?;

    println!("{}", outcome.classification.label());
    if let Some(split) = &outcome.split {
        for (code, artifact) in &split.artifacts {
            println!(
                "  {} -> {} ({} lines)",
                code,
                artifact.path.display(),
                artifact.lines_written
            );
        }
    }
    Ok(outcome)
}
