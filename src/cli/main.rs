//! CLI binary entry point for uls-loader

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use uls_loader::cli::GlobalArgs;
#[cfg(feature = "cli")]
use uls_loader::cli::commands::{
    classify::{ClassifyArgs, handle_classify},
    import::{ImportArgs, handle_import},
    init_config::{InitConfigArgs, handle_init_config},
    reconcile::{ReconcileArgs, handle_reconcile},
    split::{SplitArgs, handle_split},
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "uls-loader")]
#[command(about = "Load FCC ULS exports into a local database")]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding .uls-loader.toml; relative paths resolve against it
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    /// Directory searched for the definitions .txt file
    #[arg(long, global = true)]
    definitions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Classify, split if combined, reconcile headers and load a data file
    Import {
        /// ULS data file
        #[arg(short, long)]
        input: PathBuf,
        /// Database file (defaults to the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Input encoding label, e.g. windows-1252
        #[arg(short, long)]
        encoding: Option<String>,
    },
    /// Split a combined file into per-record-type artifacts
    Split {
        /// ULS data file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Report whether a file is single-type or combined
    Classify {
        /// ULS data file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Ensure a data file starts with the current header row
    Reconcile {
        /// Data file
        file: PathBuf,
        /// Record type (defaults to the file name)
        #[arg(long)]
        record_type: Option<String>,
    },
    /// Write a sample .uls-loader.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let global = GlobalArgs {
        base_dir: cli.base_dir,
        definitions_dir: cli.definitions_dir,
    };

    let result = match cli.command {
        Commands::Import {
            input,
            output,
            encoding,
        } => {
            let args = ImportArgs {
                input,
                output,
                encoding,
            };
            handle_import(&global, &args).map(|_| ())
        }
        Commands::Split { input } => handle_split(&global, &SplitArgs { input }).map(|_| ()),
        Commands::Classify { input } => {
            handle_classify(&global, &ClassifyArgs { input }).map(|_| ())
        }
        Commands::Reconcile { file, record_type } => {
            let args = ReconcileArgs { file, record_type };
            handle_reconcile(&global, &args).map(|_| ())
        }
        Commands::InitConfig { force } => {
            handle_init_config(&global, &InitConfigArgs { force }).map(|_| ())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
