//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for enumerating every regular
//! file below a source root. Children are visited in file-name order so that
//! repeated runs over the same tree see files in the same sequence.
//!
//! # Features
//!
//! - Excluded extensions (case-insensitive, leading dot included)
//! - Symlinked directories and files are followed
//! - Symlink cycles are detected and skipped with a warning
//! - Dangling symlinks are skipped
//! - Graceful shutdown via atomic flag
//!
//! Any other error (unreadable directory, missing root) is yielded as a
//! [`ScanError`]; callers in this crate treat it as fatal.
//!
//! # Example
//!
//! ```no_run
//! use fdmerge::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::default().with_excluded_extensions([".tmp"]);
//! let walker = Walker::new(Path::new("/home/user/Pictures"), config);
//! let files = walker.collect_files().unwrap();
//! println!("{} files selected", files.len());
//! ```

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::path_utils::{absolute_normalized, extension_of, lexical_normalize, normalize_extension};
use super::{ScanError, WalkerConfig};

/// Directory walker for ordered file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Normalized excluded extensions
    excluded: HashSet<String>,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        let excluded = config
            .excluded_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect();
        Self {
            root: path.to_path_buf(),
            config,
            excluded,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Whether a file is dropped because of its extension.
    fn is_excluded(&self, path: &Path) -> bool {
        !self.excluded.is_empty() && self.excluded.contains(&normalize_extension(&extension_of(path)))
    }

    /// Whether a file directly under the root is one of the skipped names.
    fn is_skipped_root_file(&self, path: &Path, depth: usize) -> bool {
        depth == 1
            && path
                .file_name()
                .is_some_and(|name| self.config.skip_root_files.iter().any(|s| name == s.as_str()))
    }

    /// Resolve the root to an absolute, lexically normalized path and make
    /// sure it is a readable directory.
    fn resolved_root(&self) -> Result<PathBuf, ScanError> {
        let root = absolute_normalized(&self.root).map_err(|e| ScanError::Io {
            path: self.root.clone(),
            source: e,
        })?;

        let metadata = std::fs::metadata(&root).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScanError::NotFound(root.clone()),
            ErrorKind::PermissionDenied => ScanError::PermissionDenied(root.clone()),
            _ => ScanError::Io {
                path: root.clone(),
                source: e,
            },
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root));
        }
        Ok(root)
    }

    /// Walk the directory tree, yielding absolute file paths.
    ///
    /// # Errors
    ///
    /// Fails up front if the root is missing or not a directory. Errors met
    /// during traversal are yielded as items.
    pub fn walk(
        &self,
    ) -> Result<impl Iterator<Item = Result<PathBuf, ScanError>> + '_, ScanError> {
        let root = self.resolved_root()?;
        log::debug!("Walking {}", root.display());

        let walk_dir = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        Ok(walk_dir
            .into_iter()
            .take_while(move |_| {
                let stop = self.is_shutdown_requested();
                if stop {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                }
                !stop
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        return None;
                    }
                    let path = lexical_normalize(entry.path());
                    if self.is_skipped_root_file(&path, entry.depth()) {
                        log::info!("Skipping state file: {}", path.display());
                        return None;
                    }
                    if self.is_excluded(&path) {
                        log::trace!("Excluding by extension: {}", path.display());
                        return None;
                    }
                    Some(Ok(path))
                }
                Err(e) => self.handle_walk_error(e),
            }))
    }

    /// Walk the tree and collect every selected file, stopping at the
    /// first error.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScanError`] met, or [`ScanError::Interrupted`] if
    /// shutdown was requested while walking.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>, ScanError> {
        let files = self.walk()?.collect::<Result<Vec<_>, _>>()?;
        if self.is_shutdown_requested() {
            return Err(ScanError::Interrupted);
        }
        Ok(files)
    }

    /// Decide whether a walkdir error is skippable or fatal.
    fn handle_walk_error(&self, error: walkdir::Error) -> Option<Result<PathBuf, ScanError>> {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if let Some(ancestor) = error.loop_ancestor() {
            log::warn!(
                "Symlink cycle at {} (points back to {}), not descending",
                path.display(),
                ancestor.display()
            );
            return None;
        }

        let kind = error.io_error().map(std::io::Error::kind);
        if kind == Some(ErrorKind::NotFound) && is_symlink(&path) {
            log::debug!("Skipping dangling symlink: {}", path.display());
            return None;
        }

        Some(Err(match kind {
            Some(ErrorKind::PermissionDenied) => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(ErrorKind::NotFound) => ScanError::NotFound(path),
            _ => {
                log::warn!("Walker error for {}: {}", path.display(), error);
                let source = error
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory traversal failed"));
                ScanError::Io { path, source }
            }
        }))
    }
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}
