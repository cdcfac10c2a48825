//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config <PATH>`, or `config.toml` in the platform config
//!    directory (`~/.config/fdmerge/` on Linux)
//! 3. Environment variables prefixed with `FDMERGE_` (`__` separates nested
//!    keys)
//! 4. Command-line flags, applied by the caller
//!
//! ```toml
//! exclude_extensions = [".tmp", ".part"]
//! hash_threads = 4
//! progress_interval = 1000
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;

/// Default name of the per-folder state file.
pub const DEFAULT_STATE_FILE: &str = "fdmerge_state.json";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FDMERGE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extensions never scanned, in addition to `--exclude-extensions`
    pub exclude_extensions: Vec<String>,
    /// Name of the state file written by `--store-hashes`
    pub state_file_name: String,
    /// Log a progress line every N files
    pub progress_interval: usize,
    /// Threads hashing files within one folder (1 = sequential)
    pub hash_threads: usize,
    /// Streaming read buffer in bytes
    pub buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_extensions: Vec::new(),
            state_file_name: DEFAULT_STATE_FILE.to_string(),
            progress_interval: 500,
            hash_threads: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An unreadable or invalid file is reported and defaults are used.
    #[must_use]
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = explicit.map(Path::to_path_buf).or_else(Self::config_path);
        match Self::figment(path.as_deref()).extract::<Self>() {
            Ok(config) => config.sanitized(),
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Figment with all layers except CLI flags.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if path.exists() {
                log::debug!("Reading configuration from {}", path.display());
                figment = figment.merge(Toml::file(path));
            } else {
                log::debug!("No configuration file at {}", path.display());
            }
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "fdmerge", "fdmerge")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Clamp values that would make the run misbehave.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.hash_threads = self.hash_threads.max(1);
        self.progress_interval = self.progress_interval.max(1);
        if self.state_file_name.trim().is_empty() {
            self.state_file_name = DEFAULT_STATE_FILE.to_string();
        }
        self
    }

    /// Configured exclusions followed by the command-line ones.
    #[must_use]
    pub fn merged_exclusions(&self, cli: &[String]) -> Vec<String> {
        self.exclude_extensions
            .iter()
            .chain(cli.iter())
            .cloned()
            .collect()
    }
}
