//! Logging infrastructure for fdmerge.
//!
//! Structured logging uses the `log` facade and the `env_logger` backend.
//! Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. `--debug`, which raises the level to at least debug
//! 3. `--quiet` (error only) or `--verbose` (debug/trace)
//! 4. Default: info level
//!
//! # Build-specific Formatting
//!
//! - **Debug builds**: timestamp, level and (with `-v`) module path
//! - **Release builds**: compact format with level and message only
//!
//! # Example
//!
//! ```rust,no_run
//! use fdmerge::logging::init_logging;
//!
//! init_logging(0, false, false);
//! log::info!("Merging started");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logging subsystem based on CLI flags.
///
/// Returns `false` if a logger was already installed (for instance when
/// the library is driven several times from one test process); the
/// existing logger is kept.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=normal, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors
/// * `debug` - If true, show at least debug output (per-file hash lines)
pub fn init_logging(verbose: u8, quiet: bool, debug: bool) -> bool {
    let use_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet, debug);

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }
    configure_format(&mut builder, verbose);

    let installed = builder.try_init().is_ok();
    if installed {
        if use_env {
            log::debug!(
                "Logging initialized from RUST_LOG: {:?}",
                env::var("RUST_LOG").ok()
            );
        } else {
            log::debug!("Logging initialized at level: {:?}", level);
        }
    }
    installed
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool, debug: bool) -> LevelFilter {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    if debug {
        level.max(LevelFilter::Debug)
    } else {
        level
    }
}

/// Configure the log format based on build type and verbosity.
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}

/// Dump the process environment at debug level.
pub fn log_environment() {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    log::debug!("------------ Environment ------------");
    let mut vars: Vec<(String, String)> = env::vars_os()
        .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
        .collect();
    vars.sort();
    for (key, value) in vars {
        log::debug!("{key}={value}");
    }
    log::debug!("---------- End environment ----------");
}

/// Get the current log level as a string.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
