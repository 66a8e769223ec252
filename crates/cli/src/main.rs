mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use photosort_core::config::{Config, MetadataBackend};
use photosort_core::domain::ImportOptions;

/// photosort: deduplicating, date-organized photo library
#[derive(Parser)]
#[command(name = "photosort", version, about)]
struct Cli {
    /// Scan worker threads (default: twice the available parallelism)
    #[arg(long, global = true, env = "PHOTOSORT_WORKERS")]
    workers: Option<usize>,

    /// Metadata provider used while scanning
    #[arg(long, global = true, value_enum, env = "PHOTOSORT_METADATA", default_value_t = MetadataArg::Exif)]
    metadata: MetadataArg,

    /// Copy files on a thread pool instead of one at a time
    #[arg(long, global = true, env = "PHOTOSORT_PARALLEL_COPY")]
    parallel_copy: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty library
    Create {
        /// Library directory (created if missing)
        library: PathBuf,
    },
    /// Import a directory of photos into a library
    Import {
        /// Directory to scan
        source: PathBuf,
        /// Library directory
        library: PathBuf,
        /// Only record files in the catalog, do not copy them
        #[arg(long)]
        no_copy: bool,
        /// Report what would change without touching the library
        #[arg(long)]
        dry_run: bool,
    },
    /// Reconcile a library's catalog with the files on disk
    Update {
        /// Library directory
        library: PathBuf,
    },
    /// Copy everything from one library into another, never deleting
    Sync {
        /// Library to read from
        source: PathBuf,
        /// Library to add to
        target: PathBuf,
        /// Report what would be added without touching the target
        #[arg(long)]
        dry_run: bool,
    },
    /// List a library's catalog
    Ls {
        /// Library directory
        library: PathBuf,
    },
    /// Summarize a library: media by type, sidecars, date range
    Info {
        /// Library directory
        library: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MetadataArg {
    /// Built-in EXIF reader
    Exif,
    /// External exiftool process per worker
    Exiftool,
}

impl From<MetadataArg> for MetadataBackend {
    fn from(arg: MetadataArg) -> Self {
        match arg {
            MetadataArg::Exif => MetadataBackend::Exif,
            MetadataArg::Exiftool => MetadataBackend::ExifTool,
        }
    }
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default()
            .with_metadata(self.metadata.into())
            .with_parallel_copy(self.parallel_copy);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = cli.config();
    tracing::debug!(?config, "resolved configuration");

    match cli.command {
        Commands::Create { library } => commands::create::run(&library, config)?,
        Commands::Import {
            source,
            library,
            no_copy,
            dry_run,
        } => {
            let mut options = if no_copy {
                ImportOptions::CATALOG_ONLY
            } else {
                ImportOptions::COPY
            };
            if dry_run {
                options = options.dry_run();
            }
            commands::import::run(&source, &library, options, config)?
        }
        Commands::Update { library } => commands::update::run(&library, config)?,
        Commands::Sync {
            source,
            target,
            dry_run,
        } => commands::sync::run(&source, &target, dry_run, config)?,
        Commands::Ls { library } => commands::ls::run(&library, config)?,
        Commands::Info { library } => commands::info::run(&library, config)?,
    }

    Ok(())
}
