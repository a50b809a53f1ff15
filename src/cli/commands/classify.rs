//! Classify command implementation

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::cli::{GlobalArgs, require_file};
use crate::uls::Classification;

/// Classify command arguments
#[derive(Debug, Clone)]
pub struct ClassifyArgs {
    pub input: PathBuf,
}

/// Handle the classify command; nothing is written
pub fn handle_classify(
    global: &GlobalArgs,
    args: &ClassifyArgs,
) -> Result<Classification, CliError> {
    require_file(&args.input)?;
    let pipeline = global.pipeline(global.load_config()?)?;
    let classification = pipeline.classify_file(&args.input)?;

    println!(
        "{}\t{}",
        classification.label(),
        classification.record_types().join(",")
    );
    Ok(classification)
}
