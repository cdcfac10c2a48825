//! Command-line interface definitions for fdmerge.
//!
//! Global options (verbosity, color, run switches) may appear before or
//! after the subcommand.
//!
//! # Example
//!
//! ```bash
//! # Merge two trees into /merged
//! fdmerge merge-sources --folders /photos/old /photos/new --target /merged
//!
//! # Treat an existing backup as already merged, skip temp files
//! fdmerge merge-sources --folders /photos/new --compare-only /backup \
//!     --target /merged --exclude-extensions .tmp .part
//!
//! # Scan everything, copy nothing, list the duplicates
//! fdmerge --dry-run --display-collisions merge-sources --folders a b --target out
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Merge directory trees into one target, copying each distinct file
/// content exactly once.
///
/// Files are identified by the SHA-256 of their content. The first
/// occurrence of a content (compare-only folders first, then source folders
/// in the order given) wins; every copy is verified after writing.
#[derive(Debug, Parser)]
#[command(name = "fdmerge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Produce debug output: per-file hashes, copy mapping, environment dump
    #[arg(long, global = true)]
    pub debug: bool,

    /// Indent listings in the summary for interactive reading
    #[arg(long, global = true)]
    pub human_readable: bool,

    /// Show every set of identical files at the end of the run
    #[arg(long, global = true)]
    pub display_collisions: bool,

    /// Show every file saved under a new name at the end of the run
    #[arg(long, global = true)]
    pub display_renames: bool,

    /// Do all scanning and hashing but copy nothing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Save each folder's hashes to a state file at the folder root
    #[arg(long, global = true)]
    pub store_hashes: bool,

    /// Load hashes from each folder's state file instead of scanning it
    ///
    /// Changes made to a folder since its hashes were stored are NOT seen.
    #[arg(long, global = true)]
    pub load_hashes: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Summary format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge source folders into a target folder
    MergeSources(MergeArgs),
}

/// Arguments for the merge-sources subcommand.
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Source folders to scan recursively and merge, in priority order
    #[arg(long, value_name = "PATH", num_args = 1.., required = true)]
    pub folders: Vec<PathBuf>,

    /// Target folder (must already exist)
    #[arg(long, value_name = "PATH")]
    pub target: PathBuf,

    /// File extensions to skip (e.g. .tmp .log); case-insensitive
    #[arg(long, value_name = "EXT", num_args = 1..)]
    pub exclude_extensions: Vec<String>,

    /// Folders scanned to claim content but never copied from
    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub compare_only: Vec<PathBuf>,

    /// Number of threads hashing files within a folder
    #[arg(long, value_name = "N")]
    pub hash_threads: Option<usize>,
}

/// Summary output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON report for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
