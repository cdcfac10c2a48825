//! Per-folder hash snapshots.
//!
//! A snapshot is the folder-local digest map produced by one folder pass,
//! persisted at the folder root. Loading it lets a later run skip walking
//! and hashing that folder entirely.
//!
//! * [`entry`]: the serialized form of one snapshot entry.
//! * [`state_file`]: the JSON state file backend.
//!
//! # Trust
//!
//! A snapshot is trusted as-is when loaded: files added, removed or changed
//! since it was written are not noticed. Corrupt snapshots (bad checksum,
//! unknown version, invalid JSON) are rejected as a whole.

pub mod entry;
pub mod state_file;

use std::path::{Path, PathBuf};

use crate::dedup::FolderMap;

pub use entry::CacheEntry;
pub use state_file::{StateFile, STATE_FILE_VERSION};

/// Result type for snapshot operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised while reading or writing a snapshot.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Reading or writing the state file failed.
    #[error("State file I/O error for {path}: {source}")]
    Io {
        /// State file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The state file is not valid JSON for the expected layout.
    #[error("Invalid state file {path}: {source}")]
    Parse {
        /// State file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// The stored checksum does not match the entries.
    #[error("State file checksum mismatch: {0}")]
    ChecksumMismatch(PathBuf),

    /// The state file was written by an incompatible version.
    #[error("Unsupported state file version {found} in {path} (expected {expected})")]
    UnsupportedVersion {
        /// State file path
        path: PathBuf,
        /// Version found in the file
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// An entry holds a malformed digest.
    #[error("Invalid digest {digest:?} in {path}")]
    InvalidDigest {
        /// State file path
        path: PathBuf,
        /// Offending value
        digest: String,
    },

    /// Serializing entries failed.
    #[error("Failed to serialize state file: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Storage for folder snapshots, keyed by folder root.
pub trait HashCache: Send + Sync {
    /// Load the snapshot stored for `folder_root`.
    ///
    /// Returns `Ok(None)` when no snapshot exists.
    fn load(&self, folder_root: &Path) -> CacheResult<Option<FolderMap>>;

    /// Persist `map` as the snapshot for `folder_root`, replacing any
    /// previous one.
    fn save(&self, folder_root: &Path, map: &FolderMap) -> CacheResult<()>;
}
