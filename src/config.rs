//! Loader configuration file support
//!
//! Handles parsing of `.uls-loader.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{UlsError, UlsResult};
use crate::format::{TextFormat, parse_delimiter, resolve_encoding};

/// Default database filename
pub const DEFAULT_DB_FILENAME: &str = "uls.duckdb";

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".uls-loader.toml";

/// Environment variable for the database path
pub const ENV_DB_PATH: &str = "ULS_LOADER_DB_PATH";

/// Environment variable for the single-type file encoding
pub const ENV_ENCODING: &str = "ULS_LOADER_ENCODING";

/// Environment variable for the combined export encoding
pub const ENV_COMBINED_ENCODING: &str = "ULS_LOADER_COMBINED_ENCODING";

/// Environment variable for the definitions directory
pub const ENV_DEFINITIONS_DIR: &str = "ULS_LOADER_DEFINITIONS_DIR";

/// Environment variable for the splitter scratch directory
pub const ENV_SCRATCH_DIR: &str = "ULS_LOADER_SCRATCH_DIR";

/// Environment variable for the header rewrite mode
pub const ENV_REWRITE_MODE: &str = "ULS_LOADER_REWRITE_MODE";

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Path to the database file (relative to the base directory)
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    DEFAULT_DB_FILENAME.to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Input format section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSection {
    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Encoding of single record type files
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Encoding of combined exports
    #[serde(default = "default_combined_encoding")]
    pub combined_encoding: String,

    /// Encoding of the definitions file
    #[serde(default = "default_encoding")]
    pub definitions_encoding: String,
}

fn default_delimiter() -> String {
    "|".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_combined_encoding() -> String {
    "windows-1252".to_string()
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            encoding: default_encoding(),
            combined_encoding: default_combined_encoding(),
            definitions_encoding: default_encoding(),
        }
    }
}

/// Directory layout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSection {
    /// Directory searched for the `.txt` definitions file
    #[serde(default = "default_definitions_dir")]
    pub definitions_dir: String,

    /// Directory receiving per-record-type split artifacts
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

fn default_definitions_dir() -> String {
    "definitions".to_string()
}

fn default_scratch_dir() -> String {
    crate::uls::split::DEFAULT_SCRATCH_DIR.to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            definitions_dir: default_definitions_dir(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

/// How existing data files are rewritten when a header is reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    /// Read the whole file, then write it back (default)
    #[default]
    Full,
    /// Stream rows through a temporary sibling file
    Streaming,
}

impl std::str::FromStr for RewriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(RewriteMode::Full),
            "streaming" => Ok(RewriteMode::Streaming),
            _ => Err(format!(
                "Unknown rewrite mode: {}. Use 'full' or 'streaming'.",
                s
            )),
        }
    }
}

/// Header reconciliation section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconcileSection {
    #[serde(default)]
    pub mode: RewriteMode,
}

/// Main configuration structure
///
/// Represents the `.uls-loader.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoaderConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub input: InputSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub reconcile: ReconcileSection,
}

impl LoaderConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a base directory
    ///
    /// Looks for `.uls-loader.toml` in the directory and falls back to
    /// defaults if not found. Environment overrides are applied last.
    pub fn load(base_path: &Path) -> UlsResult<Self> {
        let config_path = base_path.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| UlsError::Config(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> UlsResult<Self> {
        toml::from_str(content)
            .map_err(|e| UlsError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a base directory
    pub fn save(&self, base_path: &Path) -> UlsResult<()> {
        let config_path = base_path.join(CONFIG_FILENAME);
        let content = self.to_toml()?;

        std::fs::write(&config_path, content)
            .map_err(|e| UlsError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> UlsResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| UlsError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            self.database.path = path;
        }

        if let Ok(encoding) = std::env::var(ENV_ENCODING) {
            self.input.encoding = encoding;
        }

        if let Ok(encoding) = std::env::var(ENV_COMBINED_ENCODING) {
            self.input.combined_encoding = encoding;
        }

        if let Ok(dir) = std::env::var(ENV_DEFINITIONS_DIR) {
            self.paths.definitions_dir = dir;
        }

        if let Ok(dir) = std::env::var(ENV_SCRATCH_DIR) {
            self.paths.scratch_dir = dir;
        }

        if let Ok(mode) = std::env::var(ENV_REWRITE_MODE) {
            match mode.parse() {
                Ok(mode) => self.reconcile.mode = mode,
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_REWRITE_MODE, e),
            }
        }
    }

    /// Startup check: every encoding label resolves and the delimiter is a
    /// single ASCII byte
    pub fn validate(&self) -> UlsResult<()> {
        parse_delimiter(&self.input.delimiter)?;
        resolve_encoding(&self.input.encoding)?;
        resolve_encoding(&self.input.combined_encoding)?;
        resolve_encoding(&self.input.definitions_encoding)?;
        Ok(())
    }

    /// Format of single record type files
    pub fn single_format(&self) -> UlsResult<TextFormat> {
        TextFormat::new(parse_delimiter(&self.input.delimiter)?, &self.input.encoding)
    }

    /// Format of combined exports
    pub fn combined_format(&self) -> UlsResult<TextFormat> {
        TextFormat::new(
            parse_delimiter(&self.input.delimiter)?,
            &self.input.combined_encoding,
        )
    }

    pub fn definitions_encoding(&self) -> UlsResult<&'static encoding_rs::Encoding> {
        resolve_encoding(&self.input.definitions_encoding)
    }

    /// Resolve a configured path against the base directory
    fn resolve(base_path: &Path, configured: &str) -> PathBuf {
        if Path::new(configured).is_absolute() {
            PathBuf::from(configured)
        } else {
            base_path.join(configured)
        }
    }

    pub fn db_path(&self, base_path: &Path) -> PathBuf {
        if self.database.path.is_empty() {
            base_path.join(DEFAULT_DB_FILENAME)
        } else {
            Self::resolve(base_path, &self.database.path)
        }
    }

    pub fn definitions_dir(&self, base_path: &Path) -> PathBuf {
        Self::resolve(base_path, &self.paths.definitions_dir)
    }

    pub fn scratch_dir(&self, base_path: &Path) -> PathBuf {
        Self::resolve(base_path, &self.paths.scratch_dir)
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# ULS loader configuration

[database]
# Path to the DuckDB database file (relative to this directory, or absolute)
path = "uls.duckdb"

[input]
# Field delimiter of ULS exports
delimiter = "|"

# Encoding of single record type files (HD.dat, EN.dat, ...)
encoding = "utf-8"

# Encoding of combined exports; windows-1252 has been observed
combined_encoding = "windows-1252"

# Encoding of the definitions file
definitions_encoding = "utf-8"

[paths]
# Directory searched (recursively) for the .txt definitions file
definitions_dir = "definitions"

# Directory receiving <CODE>.csv split artifacts
scratch_dir = "temp"

[reconcile]
# How data files are rewritten when a header is added: "full" reads the
# whole file first, "streaming" copies it row by row through a temp file
mode = "full"
"#
}
