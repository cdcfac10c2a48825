//! Copy phase: walks the canonical records, places each one in the target,
//! copies it with its metadata and verifies the copy by re-hashing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use filetime::FileTime;

use crate::dedup::DedupIndex;
use crate::progress::ProgressCallback;
use crate::scanner::{ContentDigest, Hasher};

use super::planner::{resolve_placement, target_path_for, Placement, SuffixSource, TargetClaims};
use super::{CopiedFile, CopyOutcome, MergeError, PlannedCopy, RenameRecord};

/// Create `dir` and its parents if missing.
///
/// # Errors
///
/// [`MergeError::DirectoryCreation`] if the directory cannot be created.
pub fn ensure_directory(dir: &Path) -> Result<(), MergeError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| MergeError::DirectoryCreation {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn create_symlink(link: &Path, at: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, at)
}

#[cfg(windows)]
fn create_symlink(link: &Path, at: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(link, at)
}

/// Copy `source` to `target` without following a symlink at `source`.
///
/// Regular files keep their permissions and access/modification times; a
/// symlink is recreated as a link with the same content. Timestamp failures
/// are logged and ignored.
///
/// Returns the number of bytes copied (0 for a symlink).
///
/// # Errors
///
/// [`MergeError::Copy`] on any I/O failure.
pub fn copy_preserving(source: &Path, target: &Path) -> Result<u64, MergeError> {
    let copy_err = |e: io::Error| MergeError::Copy {
        source_path: source.to_path_buf(),
        target: target.to_path_buf(),
        source: e,
    };

    let metadata = fs::symlink_metadata(source).map_err(copy_err)?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);

    if metadata.file_type().is_symlink() {
        let link = fs::read_link(source).map_err(copy_err)?;
        create_symlink(&link, target).map_err(copy_err)?;
        if let Err(e) = filetime::set_symlink_file_times(target, atime, mtime) {
            log::warn!("Could not preserve timestamps on {}: {}", target.display(), e);
        }
        return Ok(0);
    }

    let bytes = fs::copy(source, target).map_err(copy_err)?;
    if let Err(e) = filetime::set_file_times(target, atime, mtime) {
        log::warn!("Could not preserve timestamps on {}: {}", target.display(), e);
    }
    Ok(bytes)
}

/// Re-hash `target` and compare against `expected`.
///
/// # Errors
///
/// [`MergeError::Verification`] if the copy cannot be read back,
/// [`MergeError::DigestMismatch`] if its content differs.
pub fn verify_copy(
    source_path: &Path,
    target: &Path,
    expected: &ContentDigest,
    hasher: &Hasher,
) -> Result<(), MergeError> {
    let actual = hasher
        .digest(target)
        .map_err(|source| MergeError::Verification {
            target: target.to_path_buf(),
            source,
        })?;
    if actual != *expected {
        return Err(MergeError::DigestMismatch {
            source_path: source_path.to_path_buf(),
            target: target.to_path_buf(),
            expected: *expected,
            actual,
        });
    }
    Ok(())
}

/// Runs the copy phase over a finished index.
pub struct CopyExecutor {
    target_root: PathBuf,
    copy_roots: Vec<PathBuf>,
    hasher: Hasher,
    suffixes: Box<dyn SuffixSource>,
    dry_run: bool,
    progress_interval: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for CopyExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyExecutor")
            .field("target_root", &self.target_root)
            .field("copy_roots", &self.copy_roots)
            .field("dry_run", &self.dry_run)
            .field("progress_interval", &self.progress_interval)
            .finish_non_exhaustive()
    }
}

impl CopyExecutor {
    /// Create an executor writing under `target_root`.
    ///
    /// `copy_roots` are the copy-eligible folder roots, indexed by each
    /// record's `folder_index`.
    #[must_use]
    pub fn new(target_root: PathBuf, copy_roots: Vec<PathBuf>, suffixes: Box<dyn SuffixSource>) -> Self {
        Self {
            target_root,
            copy_roots,
            hasher: Hasher::new(),
            suffixes,
            dry_run: false,
            progress_interval: 500,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Stop at the first record once its name is resolved, writing nothing.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Log a progress line every `interval` records.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Set the buffer size used when verifying copies.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.hasher = Hasher::new().with_buffer_size(size);
        self
    }

    /// Set the shutdown flag, checked between records.
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

    /// Copy every copy-eligible canonical record, in index order.
    ///
    /// # Errors
    ///
    /// Stops at the first failure; files already copied stay in place.
    pub fn run(&mut self, index: &DedupIndex) -> Result<CopyOutcome, MergeError> {
        let eligible = index.copy_eligible_count();
        let mut outcome = CopyOutcome::default();
        let mut claims = TargetClaims::new();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("copying", eligible);
        }
        log::info!("Copying up to {} files into {}", eligible, self.target_root.display());

        let mut processed = 0;
        for (digest, record) in index.iter().filter(|(_, r)| r.copy_eligible) {
            if self.is_shutdown_requested() {
                log::info!("Copy phase interrupted after {} files", processed);
                return Err(MergeError::Interrupted);
            }

            let requested = target_path_for(record, &self.copy_roots, &self.target_root)?;
            let placement = resolve_placement(&requested, &claims, self.suffixes.as_mut())?;
            log::debug!(
                "{}   -->   {}",
                record.source_path.display(),
                placement.destination().unwrap_or(requested.as_path()).display()
            );

            if self.dry_run {
                log::info!("Dry run: skipping all file copy operations");
                outcome.dry_run_stop = Some(PlannedCopy {
                    digest: *digest,
                    source: record.source_path.clone(),
                    target: placement.destination().map(Path::to_path_buf),
                });
                break;
            }

            match placement {
                Placement::PreExisting(path) => {
                    log::debug!("Already present in target, skipping: {}", path.display());
                    claims.claim(path.clone());
                    outcome.skipped_existing.push(path);
                }
                Placement::Fresh(target) => {
                    let bytes = self.copy_one(digest, &record.source_path, &target)?;
                    claims.claim(target.clone());
                    outcome.copies.push(CopiedFile {
                        digest: *digest,
                        source: record.source_path.clone(),
                        target,
                        bytes,
                    });
                }
                Placement::Renamed { requested, resolved } => {
                    let bytes = self.copy_one(digest, &record.source_path, &resolved)?;
                    claims.claim(resolved.clone());
                    outcome.renames.push(RenameRecord {
                        digest: *digest,
                        requested,
                        resolved: resolved.clone(),
                    });
                    outcome.copies.push(CopiedFile {
                        digest: *digest,
                        source: record.source_path.clone(),
                        target: resolved,
                        bytes,
                    });
                }
            }

            processed += 1;
            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(processed, &record.source_path.to_string_lossy());
            }
            if processed % self.progress_interval == 0 {
                log::info!("Completed copying of {} files", processed);
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("copying");
        }
        log::info!(
            "Copy phase finished: {} copied, {} renamed, {} already present",
            outcome.copies.len(),
            outcome.renames.len(),
            outcome.skipped_existing.len()
        );
        Ok(outcome)
    }

    fn copy_one(
        &self,
        digest: &ContentDigest,
        source: &Path,
        target: &Path,
    ) -> Result<u64, MergeError> {
        if let Some(parent) = target.parent() {
            ensure_directory(parent)?;
        }
        let bytes = copy_preserving(source, target)?;
        verify_copy(source, target, digest, &self.hasher)?;
        if let Some(ref callback) = self.progress_callback {
            callback.on_item_completed(bytes);
        }
        Ok(bytes)
    }
}
