//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Ordered recursive directory walking using walkdir
//! - Content hashing with SHA-256 (streaming)
//! - Extension histograms for reporting
//! - Path normalization helpers
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: SHA-256 file hashing (streaming)
//! - [`histogram`]: Per-folder extension tally
//! - [`path_utils`]: Extension and path normalization
//!
//! # Example
//!
//! ```no_run
//! use fdmerge::scanner::{Hasher, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let hasher = Hasher::new();
//! for path in walker.collect_files().unwrap() {
//!     let outcome = hasher.hash_file(&path).unwrap();
//!     println!("{} {}", path.display(), outcome.digest);
//! }
//! ```

pub mod hasher;
pub mod histogram;
pub mod path_utils;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use hasher::{ContentDigest, HashOutcome, Hasher, DIGEST_LEN};
pub use histogram::ExtensionHistogram;
pub use walker::Walker;

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal (default: true).
    /// Cycles are detected and skipped.
    pub follow_symlinks: bool,

    /// Extensions to exclude, compared case-insensitively.
    /// Each is expected with its leading dot; a missing dot is added.
    pub excluded_extensions: Vec<String>,

    /// File names skipped when they sit directly under the root
    /// (the per-folder state file).
    pub skip_root_files: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
            excluded_extensions: Vec::new(),
            skip_root_files: Vec::new(),
        }
    }
}

impl WalkerConfig {
    /// Set the excluded extensions.
    #[must_use]
    pub fn with_excluded_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the file names skipped at the root.
    #[must_use]
    pub fn with_skip_root_files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_root_files = names.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable following symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Shutdown was requested while walking.
    #[error("Scan interrupted")]
    Interrupted,

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Shutdown was requested while hashing.
    #[error("Hashing interrupted")]
    Interrupted,

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
