//! Init-config command implementation

use std::path::PathBuf;

use crate::cli::GlobalArgs;
use crate::cli::error::CliError;
use crate::config::{CONFIG_FILENAME, sample_config};

/// Init-config command arguments
#[derive(Debug, Clone, Default)]
pub struct InitConfigArgs {
    /// Overwrite an existing configuration file
    pub force: bool,
}

/// Write a commented sample `.uls-loader.toml` into the base directory
pub fn handle_init_config(global: &GlobalArgs, args: &InitConfigArgs) -> Result<PathBuf, CliError> {
    let path = global.base_dir.join(CONFIG_FILENAME);
    if path.exists() && !args.force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    std::fs::write(&path, sample_config())
        .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?;
    println!("Wrote {}", path.display());
    Ok(path)
}
