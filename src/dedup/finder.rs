//! Ordered folder pipeline that builds the content index.
//!
//! # Overview
//!
//! Folders are processed strictly one after another, compare-only folders
//! first, each in the order given. For every folder:
//!
//! 1. **Source selection**: load the folder's snapshot when allowed and
//!    present, otherwise scan it.
//! 2. **Scan**: enumerate files in file-name order, tally extensions, hash
//!    every file (optionally on a rayon pool), and file each digest against
//!    the folder-local map and the global index.
//! 3. **Merge**: fold the folder-local map into the global index.
//! 4. **Store**: write the folder-local map as the folder's snapshot when
//!    requested.
//!
//! Hash results are always consumed in enumeration order, so which record
//! becomes canonical never depends on the thread count.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::cache::HashCache;
use crate::merge::MergeError;
use crate::progress::ProgressCallback;
use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::{ExtensionHistogram, HashError, HashOutcome, Hasher, Walker, WalkerConfig};

use super::index::{CollisionTracker, DedupIndex, FolderMap, Observation};
use super::record::{FileRecord, FolderRole};

/// One folder of the run, with its role and index within that role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFolder {
    /// Resolved folder root
    pub root: PathBuf,
    /// Role of the folder
    pub role: FolderRole,
    /// Index within the folders of the same role
    pub index: usize,
}

/// Processing order: compare-only folders, then copy-eligible folders.
#[must_use]
pub fn folder_plan(compare_only: &[PathBuf], copy_eligible: &[PathBuf]) -> Vec<SourceFolder> {
    let mut plan = Vec::with_capacity(compare_only.len() + copy_eligible.len());
    for (role, roots) in [
        (FolderRole::CompareOnly, compare_only),
        (FolderRole::CopyEligible, copy_eligible),
    ] {
        plan.extend(roots.iter().enumerate().map(|(index, root)| SourceFolder {
            root: root.clone(),
            role,
            index,
        }));
    }
    plan
}

/// Where a folder's local map comes from.
#[derive(Debug)]
pub enum FolderSource {
    /// Enumerate and hash the folder.
    Scan,
    /// Use a previously stored snapshot.
    Cached(FolderMap),
}

/// Statistics for one folder pass.
#[derive(Debug, Clone)]
pub struct FolderReport {
    /// Folder root
    pub root: PathBuf,
    /// Role of the folder
    pub role: FolderRole,
    /// Index within its role
    pub index: usize,
    /// Whether the folder came from a snapshot
    pub from_cache: bool,
    /// Files selected by the scan (snapshot entries when cached)
    pub files: usize,
    /// Extensions of the selected files
    pub histogram: ExtensionHistogram,
    /// Records this folder added to the index
    pub canonical: usize,
    /// Files of this folder filed as duplicates
    pub duplicates: usize,
    /// Bytes hashed
    pub bytes_hashed: u64,
    /// Wall-clock time of the pass
    pub elapsed: Duration,
}

impl FolderReport {
    /// Average time per file, zero for an empty folder.
    #[must_use]
    pub fn average_per_file(&self) -> Duration {
        u32::try_from(self.files)
            .ok()
            .filter(|&n| n > 0)
            .map_or(Duration::ZERO, |n| self.elapsed / n)
    }
}

/// Configuration for the index pipeline.
#[derive(Clone)]
pub struct FinderConfig {
    /// Walker settings applied to every folder
    pub walker: WalkerConfig,
    /// Hashing threads per folder (1 = sequential)
    pub hash_threads: usize,
    /// Streaming buffer size
    pub buffer_size: usize,
    /// Log a progress line every N files
    pub progress_interval: usize,
    /// Load snapshots instead of scanning when present
    pub load_snapshots: bool,
    /// Store each folder's snapshot after its pass
    pub store_snapshots: bool,
    /// Snapshot backend
    pub cache: Option<Arc<dyn HashCache>>,
    /// Optional shutdown flag for graceful termination
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("walker", &self.walker)
            .field("hash_threads", &self.hash_threads)
            .field("buffer_size", &self.buffer_size)
            .field("progress_interval", &self.progress_interval)
            .field("load_snapshots", &self.load_snapshots)
            .field("store_snapshots", &self.store_snapshots)
            .field("cache", &self.cache.as_ref().map(|_| "<cache>"))
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            walker: WalkerConfig::default(),
            hash_threads: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress_interval: 500,
            load_snapshots: false,
            store_snapshots: false,
            cache: None,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    /// Set the number of hashing threads.
    #[must_use]
    pub fn with_hash_threads(mut self, threads: usize) -> Self {
        self.hash_threads = threads.max(1);
        self
    }

    /// Set the streaming buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the progress log interval.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Enable loading and/or storing of snapshots.
    #[must_use]
    pub fn with_snapshots(mut self, load: bool, store: bool) -> Self {
        self.load_snapshots = load;
        self.store_snapshots = store;
        self
    }

    /// Set the snapshot backend.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn HashCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the shutdown flag for graceful termination.
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

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Output of the index pipeline.
#[derive(Debug, Default)]
pub struct FinderResult {
    /// Canonical records
    pub index: DedupIndex,
    /// Duplicate occurrences
    pub collisions: CollisionTracker,
    /// Per-folder statistics, in processing order
    pub folders: Vec<FolderReport>,
}

/// Builds the content index over an ordered list of folders.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a finder.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new().with_buffer_size(config.buffer_size);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        Self { config, hasher }
    }

    /// Process every folder in order.
    ///
    /// # Errors
    ///
    /// Stops at the first folder that fails to scan, hash or store.
    pub fn find(&self, folders: &[SourceFolder]) -> Result<FinderResult, MergeError> {
        let mut result = FinderResult::default();

        for folder in folders {
            if self.config.is_shutdown_requested() {
                return Err(MergeError::Interrupted);
            }
            let (local, report) = self.process_folder(folder, &result.index, &mut result.collisions)?;

            let dropped = result.index.absorb(local);
            if dropped > 0 {
                log::info!(
                    "{} snapshot entries of {} were already known and were ignored",
                    dropped,
                    folder.root.display()
                );
            }
            result.folders.push(report);
        }

        log::info!(
            "{} unique files across {} folder(s), {} duplicate set(s)",
            result.index.len(),
            folders.len(),
            result.collisions.duplicate_sets()
        );
        Ok(result)
    }

    /// Decide whether a folder is scanned or loaded from its snapshot.
    ///
    /// An unreadable snapshot is reported and the folder is scanned.
    #[must_use]
    pub fn choose_source(&self, folder: &SourceFolder) -> FolderSource {
        let Some(cache) = self.config.cache.as_ref().filter(|_| self.config.load_snapshots) else {
            return FolderSource::Scan;
        };
        match cache.load(&folder.root) {
            Ok(Some(map)) => {
                log::info!(
                    "Loaded {} hashes from snapshot of {}",
                    map.len(),
                    folder.root.display()
                );
                FolderSource::Cached(map)
            }
            Ok(None) => {
                log::debug!("No snapshot in {}, scanning", folder.root.display());
                FolderSource::Scan
            }
            Err(e) => {
                log::warn!("Ignoring snapshot of {}: {}", folder.root.display(), e);
                FolderSource::Scan
            }
        }
    }

    fn process_folder(
        &self,
        folder: &SourceFolder,
        index: &DedupIndex,
        collisions: &mut CollisionTracker,
    ) -> Result<(FolderMap, FolderReport), MergeError> {
        let started = Instant::now();
        log::info!(
            "Processing {} folder #{}: {}",
            folder.role,
            folder.index,
            folder.root.display()
        );
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_message(&folder.root.to_string_lossy());
        }

        let mut report = FolderReport {
            root: folder.root.clone(),
            role: folder.role,
            index: folder.index,
            from_cache: false,
            files: 0,
            histogram: ExtensionHistogram::new(),
            canonical: 0,
            duplicates: 0,
            bytes_hashed: 0,
            elapsed: Duration::ZERO,
        };

        let local = match self.choose_source(folder) {
            FolderSource::Cached(mut map) => {
                for record in map.records_mut() {
                    record.reassign(folder.index, folder.role);
                    report.histogram.record(&record.source_path);
                }
                report.from_cache = true;
                report.files = map.len();
                report.canonical = map.iter().filter(|(d, _)| !index.contains(d)).count();
                map
            }
            FolderSource::Scan => self.scan_folder(folder, index, collisions, &mut report)?,
        };

        if self.config.store_snapshots {
            if let Some(ref cache) = self.config.cache {
                cache.save(&folder.root, &local)?;
                log::info!("Stored {} hashes for {}", local.len(), folder.root.display());
            }
        }

        report.elapsed = started.elapsed();
        log::info!(
            "Finished {} in {:.2?} ({} files, {:.2?} per file)",
            folder.root.display(),
            report.elapsed,
            report.files,
            report.average_per_file()
        );
        if !report.histogram.is_empty() {
            let tally: Vec<String> = report
                .histogram
                .iter()
                .map(|(ext, count)| format!("{}={}", if ext.is_empty() { "<none>" } else { ext }, count))
                .collect();
            log::info!("Extensions in {}: {}", folder.root.display(), tally.join(", "));
        }
        Ok((local, report))
    }

    fn scan_folder(
        &self,
        folder: &SourceFolder,
        index: &DedupIndex,
        collisions: &mut CollisionTracker,
        report: &mut FolderReport,
    ) -> Result<FolderMap, MergeError> {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
        }
        let mut walker = Walker::new(&folder.root, self.config.walker.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        let files = walker.collect_files();
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }
        let files = files?;

        report.files = files.len();
        report.histogram = ExtensionHistogram::from_paths(&files);
        log::info!("{} files selected in {}", files.len(), folder.root.display());

        let outcomes = self.hash_files(&files)?;

        let mut local = FolderMap::new();
        for (i, (path, outcome)) in files.into_iter().zip(outcomes).enumerate() {
            log::debug!("{} {} {:.3?}", path.display(), outcome.digest, outcome.elapsed);
            report.bytes_hashed += outcome.bytes;
            let record = FileRecord::new(path, folder.index, folder.role);
            match local.observe(outcome.digest, record, index, collisions) {
                Observation::Canonical => report.canonical += 1,
                Observation::Duplicate => report.duplicates += 1,
            }
            if (i + 1) % self.config.progress_interval == 0 {
                log::info!("Completed hashing of {} files", i + 1);
            }
        }
        Ok(local)
    }

    /// Hash files, returning outcomes in the order of `files`.
    ///
    /// The first failure in enumeration order is returned.
    fn hash_files(&self, files: &[PathBuf]) -> Result<Vec<HashOutcome>, MergeError> {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("hashing", files.len());
        }

        let results = if self.config.hash_threads > 1 && files.len() > 1 {
            self.hash_parallel(files)
        } else {
            self.hash_sequential(files)
        };

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("hashing");
        }

        results
            .into_iter()
            .map(|r| r.map_err(MergeError::from))
            .collect()
    }

    fn hash_sequential(&self, files: &[PathBuf]) -> Vec<Result<HashOutcome, HashError>> {
        let mut results = Vec::with_capacity(files.len());
        for (i, path) in files.iter().enumerate() {
            if self.config.is_shutdown_requested() {
                results.push(Err(HashError::Interrupted));
                break;
            }
            let result = self.hasher.hash_file(path);
            let failed = result.is_err();
            self.report_hashed(i + 1, path, &result);
            results.push(result);
            if failed {
                break;
            }
        }
        results
    }

    fn hash_parallel(&self, files: &[PathBuf]) -> Vec<Result<HashOutcome, HashError>> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.hash_threads)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                log::warn!("Failed to create hashing pool, hashing sequentially: {}", e);
                return self.hash_sequential(files);
            }
        };

        let done = AtomicUsize::new(0);
        pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    if self.config.is_shutdown_requested() {
                        return Err(HashError::Interrupted);
                    }
                    let result = self.hasher.hash_file(path);
                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    self.report_hashed(n, path, &result);
                    result
                })
                .collect()
        })
    }

    fn report_hashed(&self, n: usize, path: &Path, result: &Result<HashOutcome, HashError>) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_progress(n, &path.to_string_lossy());
            if let Ok(outcome) = result {
                callback.on_item_completed(outcome.bytes);
            }
        }
    }
}
