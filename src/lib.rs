//! fdmerge - Content-deduplicating directory merger
//!
//! Merges several source trees into one target folder, copying each
//! distinct file content (by SHA-256) exactly once. Compare-only folders
//! claim content without ever being copied from; every copy is verified
//! by re-hashing the written file.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod merge;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, Commands, MergeArgs, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::merge::{MergeOptions, MergeRun};
use crate::output::{JsonReport, Summary, SummaryOptions};
use crate::progress::Progress;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns the run's error with context; use [`ExitCode::for_error`] to
/// map it to an exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.no_color {
        yansi::disable();
    }
    logging::init_logging(cli.verbose, cli.quiet, cli.debug);
    if cli.debug {
        logging::log_environment();
    }

    let config = Config::load(cli.config.as_deref());
    log::debug!("Effective configuration: {:?}", config);

    match &cli.command {
        Commands::MergeSources(args) => run_merge(&cli, args, &config),
    }
}

fn run_merge(cli: &Cli, args: &MergeArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let json = cli.output == OutputFormat::Json;
    let hash_threads = args.hash_threads.unwrap_or(config.hash_threads).max(1);

    let mut options = MergeOptions::new(args.target.clone(), args.folders.clone())
        .with_compare_only(args.compare_only.clone())
        .with_exclude_extensions(config.merged_exclusions(&args.exclude_extensions))
        .with_dry_run(cli.dry_run)
        .with_hash_snapshots(cli.load_hashes, cli.store_hashes)
        .with_state_file_name(config.state_file_name.clone())
        .with_hash_threads(hash_threads);
    options.buffer_size = config.buffer_size;
    options.progress_interval = config.progress_interval;

    let shutdown = signal::install_handler();
    let progress = Arc::new(Progress::new(cli.quiet || json));

    let report = MergeRun::new(options)
        .with_shutdown_flag(shutdown.flag())
        .with_progress_callback(progress)
        .execute()
        .with_context(|| format!("Merge into {} failed", args.target.display()))?;

    let mut stdout = std::io::stdout().lock();
    if json {
        JsonReport::new(&report, ExitCode::Success)
            .write_to(&mut stdout, true)
            .context("Failed to write JSON report")?;
    } else if !cli.quiet {
        let options = SummaryOptions::default()
            .with_collisions(cli.display_collisions)
            .with_renames(cli.display_renames)
            .with_human_readable(cli.human_readable);
        Summary::new(&report, options)
            .write_to(&mut stdout)
            .context("Failed to write summary")?;
    }
    stdout.flush().context("Failed to flush output")?;

    Ok(ExitCode::Success)
}
