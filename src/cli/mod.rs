//! Command-line interface support

pub mod commands;
pub mod error;

use std::path::{Path, PathBuf};

use crate::config::LoaderConfig;
use crate::pipeline::Pipeline;
use error::CliError;

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory holding `.uls-loader.toml`; relative paths resolve against it
    pub base_dir: PathBuf,
    /// Overrides `[paths] definitions_dir`
    pub definitions_dir: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            definitions_dir: None,
        }
    }

    /// Configuration from the base directory with command-line overrides applied
    pub fn load_config(&self) -> Result<LoaderConfig, CliError> {
        let mut config = LoaderConfig::load(&self.base_dir)?;
        if let Some(dir) = &self.definitions_dir {
            config.paths.definitions_dir = dir.to_string_lossy().into_owned();
        }
        Ok(config)
    }

    pub fn pipeline(&self, config: LoaderConfig) -> Result<Pipeline, CliError> {
        Ok(Pipeline::new(config, &self.base_dir)?)
    }
}

/// Fail early on a missing input file
pub(crate) fn require_file(path: &Path) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::FileNotFound(path.to_path_buf()))
    }
}
