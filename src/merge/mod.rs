//! Merge run orchestration.
//!
//! # Overview
//!
//! A [`MergeRun`] takes a target folder, the copy-eligible source folders
//! and optional compare-only folders, then:
//!
//! 1. Builds the content index folder by folder (compare-only folders
//!    first) through [`crate::dedup::DuplicateFinder`].
//! 2. Copies every copy-eligible canonical record into the target through
//!    [`executor::CopyExecutor`], renaming on in-run name clashes and
//!    verifying each copy.
//!
//! Any failure aborts the run; nothing already copied is rolled back.
//!
//! # Example
//!
//! ```no_run
//! use fdmerge::merge::{MergeOptions, MergeRun};
//! use std::path::PathBuf;
//!
//! let options = MergeOptions::new(PathBuf::from("/merged"), vec![PathBuf::from("/photos/a")]);
//! let report = MergeRun::new(options).execute().unwrap();
//! println!("{} files copied", report.outcome.copies.len());
//! ```

pub mod executor;
pub mod planner;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::{CacheError, HashCache};
use crate::dedup::{
    folder_plan, CollisionTracker, DedupIndex, DuplicateFinder, FinderConfig, FolderReport,
};
use crate::error::ExitCode;
use crate::progress::ProgressCallback;
use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::path_utils::absolute_normalized;
use crate::scanner::{ContentDigest, HashError, ScanError, WalkerConfig};

pub use executor::CopyExecutor;
pub use planner::{RandomSuffix, SuffixSource, MAX_NAME_ATTEMPTS};

/// Errors that abort a merge run.
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    /// The target folder is missing or not a directory.
    #[error("Target folder does not exist or is not a directory: {0}")]
    TargetMissing(PathBuf),

    /// A source folder is missing or not a directory.
    #[error("Source folder does not exist or is not a directory: {0}")]
    SourceMissing(PathBuf),

    /// No copy-eligible folder was given.
    #[error("At least one source folder is required")]
    NoSourceFolders,

    /// Enumerating a source folder failed.
    #[error("Scan failed: {0}")]
    Scan(#[source] ScanError),

    /// A file disappeared between enumeration and hashing.
    #[error("Source file vanished before it could be hashed: {0}")]
    SourceVanished(PathBuf),

    /// A source file could not be read.
    #[error("Failed to read source file: {0}")]
    Hash(#[source] HashError),

    /// A copy does not hash to its source's digest.
    #[error("Copy of {source_path} does not match its source: {target} (expected {expected}, found {actual})")]
    DigestMismatch {
        /// Source file
        source_path: PathBuf,
        /// Written copy
        target: PathBuf,
        /// Digest of the source
        expected: ContentDigest,
        /// Digest of the copy
        actual: ContentDigest,
    },

    /// A copy could not be read back for verification.
    #[error("Failed to verify copy {target}: {source}")]
    Verification {
        /// Written copy
        target: PathBuf,
        /// Read failure
        #[source]
        source: HashError,
    },

    /// Every candidate name for a target was taken.
    #[error("Could not find a free name for {target} after {attempts} attempts")]
    RenameExhausted {
        /// Requested target path
        target: PathBuf,
        /// Names checked
        attempts: usize,
    },

    /// A target directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreation {
        /// Directory path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Copying a file failed.
    #[error("Failed to copy {source_path} to {target}: {source}")]
    Copy {
        /// Source file
        source_path: PathBuf,
        /// Destination
        target: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A record's path is not below its folder root.
    #[error("{path} is not inside source folder {root}")]
    OutsideSourceRoot {
        /// Record path
        path: PathBuf,
        /// Folder root
        root: PathBuf,
    },

    /// A record refers to a folder index that does not exist.
    #[error("{path} refers to unknown source folder #{folder_index}")]
    UnknownFolder {
        /// Record path
        path: PathBuf,
        /// Offending index
        folder_index: usize,
    },

    /// A folder snapshot could not be written.
    #[error("Failed to store hashes: {0}")]
    Cache(#[from] CacheError),

    /// Shutdown was requested.
    #[error("Operation interrupted")]
    Interrupted,
}

impl MergeError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::RenameExhausted { .. } => ExitCode::RenameExhausted,
            Self::DigestMismatch { .. } | Self::Verification { .. } => ExitCode::IntegrityFailure,
            Self::Interrupted => ExitCode::Interrupted,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<ScanError> for MergeError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Interrupted => Self::Interrupted,
            other => Self::Scan(other),
        }
    }
}

impl From<HashError> for MergeError {
    fn from(err: HashError) -> Self {
        match err {
            HashError::NotFound(path) => Self::SourceVanished(path),
            HashError::Interrupted => Self::Interrupted,
            other => Self::Hash(other),
        }
    }
}

/// A file written into the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedFile {
    /// Content digest (verified on the copy)
    pub digest: ContentDigest,
    /// Source file
    pub source: PathBuf,
    /// Written path
    pub target: PathBuf,
    /// Bytes copied (0 for a symlink)
    pub bytes: u64,
}

/// A copy written under a derived name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameRecord {
    /// Content digest
    pub digest: ContentDigest,
    /// Name derived from the source's relative path
    pub requested: PathBuf,
    /// Name actually written
    pub resolved: PathBuf,
}

/// The record a dry run stopped at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCopy {
    /// Content digest
    pub digest: ContentDigest,
    /// Source file
    pub source: PathBuf,
    /// Where it would have been written, `None` if it would be skipped
    pub target: Option<PathBuf>,
}

/// Result of the copy phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyOutcome {
    /// Verified copies, in copy order
    pub copies: Vec<CopiedFile>,
    /// Copies written under a derived name, in copy order
    pub renames: Vec<RenameRecord>,
    /// Target paths that already held a file and were left alone
    pub skipped_existing: Vec<PathBuf>,
    /// Set when a dry run halted the copy loop
    pub dry_run_stop: Option<PlannedCopy>,
}

impl CopyOutcome {
    /// Total bytes written.
    #[must_use]
    pub fn bytes_copied(&self) -> u64 {
        self.copies.iter().map(|c| c.bytes).sum()
    }
}

/// Inputs of one merge run.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Target folder (must exist)
    pub target: PathBuf,
    /// Copy-eligible source folders, in priority order
    pub copy_eligible: Vec<PathBuf>,
    /// Compare-only folders, in priority order
    pub compare_only: Vec<PathBuf>,
    /// Extensions never scanned
    pub exclude_extensions: Vec<String>,
    /// Stop at the first copy once its name is resolved
    pub dry_run: bool,
    /// Load folder snapshots instead of scanning when present
    pub load_hashes: bool,
    /// Write each folder's snapshot after its pass
    pub store_hashes: bool,
    /// Name of the snapshot file in each folder root
    pub state_file_name: String,
    /// Hashing threads per folder (1 = sequential)
    pub hash_threads: usize,
    /// Streaming buffer size for hashing
    pub buffer_size: usize,
    /// Log a progress line every N files
    pub progress_interval: usize,
}

impl MergeOptions {
    /// Options with defaults for everything but the folders.
    #[must_use]
    pub fn new(target: PathBuf, copy_eligible: Vec<PathBuf>) -> Self {
        Self {
            target,
            copy_eligible,
            compare_only: Vec::new(),
            exclude_extensions: Vec::new(),
            dry_run: false,
            load_hashes: false,
            store_hashes: false,
            state_file_name: crate::config::DEFAULT_STATE_FILE.to_string(),
            hash_threads: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress_interval: 500,
        }
    }

    /// Set the compare-only folders.
    #[must_use]
    pub fn with_compare_only(mut self, folders: Vec<PathBuf>) -> Self {
        self.compare_only = folders;
        self
    }

    /// Set the excluded extensions.
    #[must_use]
    pub fn with_exclude_extensions(mut self, extensions: Vec<String>) -> Self {
        self.exclude_extensions = extensions;
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable loading and/or storing of folder snapshots.
    #[must_use]
    pub fn with_hash_snapshots(mut self, load: bool, store: bool) -> Self {
        self.load_hashes = load;
        self.store_hashes = store;
        self
    }

    /// Set the snapshot file name.
    #[must_use]
    pub fn with_state_file_name(mut self, name: impl Into<String>) -> Self {
        self.state_file_name = name.into();
        self
    }

    /// Set the number of hashing threads.
    #[must_use]
    pub fn with_hash_threads(mut self, threads: usize) -> Self {
        self.hash_threads = threads.max(1);
        self
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct MergeReport {
    /// Resolved target folder
    pub target: PathBuf,
    /// Per-folder statistics, in processing order
    pub folders: Vec<FolderReport>,
    /// Canonical records
    pub index: DedupIndex,
    /// Duplicate occurrences
    pub collisions: CollisionTracker,
    /// Copy phase result
    pub outcome: CopyOutcome,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Wall-clock duration
    pub duration: Duration,
}

/// One merge run.
pub struct MergeRun {
    options: MergeOptions,
    cache: Option<Arc<dyn HashCache>>,
    suffixes: Box<dyn SuffixSource>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for MergeRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeRun")
            .field("options", &self.options)
            .field("cache", &self.cache.as_ref().map(|_| "<cache>"))
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish_non_exhaustive()
    }
}

impl MergeRun {
    /// Create a run. Snapshots use a [`crate::cache::StateFile`] named
    /// after `options.state_file_name`.
    #[must_use]
    pub fn new(options: MergeOptions) -> Self {
        let cache: Arc<dyn HashCache> =
            Arc::new(crate::cache::StateFile::new(options.state_file_name.clone()));
        Self {
            options,
            cache: Some(cache),
            suffixes: Box::new(RandomSuffix::new()),
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Replace the snapshot backend.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn HashCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the rename suffix source.
    #[must_use]
    pub fn with_suffixes(mut self, suffixes: Box<dyn SuffixSource>) -> Self {
        self.suffixes = suffixes;
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Run the index and copy phases.
    ///
    /// # Errors
    ///
    /// Returns the first [`MergeError`] met; see [`MergeError::exit_code`].
    pub fn execute(self) -> Result<MergeReport, MergeError> {
        let started = Instant::now();
        let options = self.options;

        let target = resolve_target(&options.target)?;
        if options.copy_eligible.is_empty() {
            return Err(MergeError::NoSourceFolders);
        }
        let copy_roots = resolve_sources(&options.copy_eligible)?;
        let compare_roots = resolve_sources(&options.compare_only)?;
        log::info!(
            "Merging {} folder(s) into {} ({} compare-only)",
            copy_roots.len(),
            target.display(),
            compare_roots.len()
        );

        let mut walker = WalkerConfig::default()
            .with_excluded_extensions(options.exclude_extensions.iter().cloned());
        // The state file is only ours to hide when snapshots are in play.
        if options.load_hashes || options.store_hashes {
            walker = walker.with_skip_root_files([options.state_file_name.clone()]);
        }
        let mut finder_config = FinderConfig::default()
            .with_walker_config(walker)
            .with_hash_threads(options.hash_threads)
            .with_buffer_size(options.buffer_size)
            .with_progress_interval(options.progress_interval)
            .with_snapshots(options.load_hashes, options.store_hashes);
        if let Some(cache) = self.cache {
            finder_config = finder_config.with_cache(cache);
        }
        if let Some(ref flag) = self.shutdown_flag {
            finder_config = finder_config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.progress_callback {
            finder_config = finder_config.with_progress_callback(Arc::clone(callback));
        }

        let plan = folder_plan(&compare_roots, &copy_roots);
        let found = DuplicateFinder::new(finder_config).find(&plan)?;

        if self
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
        {
            return Err(MergeError::Interrupted);
        }

        let mut executor = CopyExecutor::new(target.clone(), copy_roots, self.suffixes)
            .with_dry_run(options.dry_run)
            .with_progress_interval(options.progress_interval)
            .with_buffer_size(options.buffer_size);
        if let Some(flag) = self.shutdown_flag {
            executor = executor.with_shutdown_flag(flag);
        }
        if let Some(callback) = self.progress_callback {
            executor = executor.with_progress_callback(callback);
        }
        let outcome = executor.run(&found.index)?;

        Ok(MergeReport {
            target,
            folders: found.folders,
            index: found.index,
            collisions: found.collisions,
            outcome,
            dry_run: options.dry_run,
            duration: started.elapsed(),
        })
    }
}

fn resolve_target(path: &Path) -> Result<PathBuf, MergeError> {
    let resolved = std::fs::canonicalize(path).map_err(|_| MergeError::TargetMissing(path.to_path_buf()))?;
    if !resolved.is_dir() {
        return Err(MergeError::TargetMissing(path.to_path_buf()));
    }
    Ok(resolved)
}

fn resolve_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, MergeError> {
    paths
        .iter()
        .map(|path| {
            let resolved = absolute_normalized(path)
                .map_err(|_| MergeError::SourceMissing(path.clone()))?;
            if resolved.is_dir() {
                Ok(resolved)
            } else {
                Err(MergeError::SourceMissing(path.clone()))
            }
        })
        .collect()
}
