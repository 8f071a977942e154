use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use asset_stamp::HashAlgorithm;

#[derive(Parser)]
#[command(
    name = "asset-stamp",
    author = "esengine",
    version,
    about = "Content-hash fingerprinting for interdependent build assets",
    long_about = "Asset Stamp - cache-busting file names for assets that reference each other.\n\n\
                  Every file gets a hash of its content and of everything it references,\n\
                  markers are rewritten to hash-qualified names and referenced files renamed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new asset-stamp.toml configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Fingerprint every asset in a directory and write the result
    Build {
        /// Input directory path [default: project.source from the config]
        input: Option<PathBuf>,

        #[command(flatten)]
        options: BuildOptions,
    },

    /// Show the dependency graph, hashes and renames without writing anything
    Inspect {
        /// Input directory path [default: project.source from the config]
        input: Option<PathBuf>,

        #[command(flatten)]
        options: ResolveOptions,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch for file changes and rebuild
    Watch {
        /// Directory to watch [default: project.source from the config]
        input: Option<PathBuf>,

        #[command(flatten)]
        options: WatchOptions,
    },
}

/// Options shared by every command that resolves hashes
#[derive(Args, Clone, Default)]
pub struct ResolveOptions {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Entry file, relative to the input directory (repeatable)
    #[arg(short, long = "entry")]
    pub entries: Vec<PathBuf>,

    /// Asset search root, relative to the input directory (repeatable)
    #[arg(short, long = "assets")]
    pub assets: Vec<PathBuf>,

    /// Digest algorithm (xxh3-64, xxh3-128, sha256, blake3)
    #[arg(long)]
    pub algorithm: Option<HashAlgorithm>,

    /// Number of parallel jobs for loading files
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args, Clone)]
pub struct BuildOptions {
    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub resolve: ResolveOptions,

    /// Dry run - show what would be renamed without writing files
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Clone)]
pub struct WatchOptions {
    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub resolve: ResolveOptions,

    /// Debounce delay in milliseconds
    #[arg(long, default_value = "300")]
    pub debounce: u64,
}
