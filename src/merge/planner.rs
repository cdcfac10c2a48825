//! Target path derivation and bounded rename resolution.
//!
//! A canonical record lands at `target_root / relpath(source, its root)`.
//! When that name is already taken by a file this run wrote, a new name
//! `<stem>__COPY<xxxx><.ext>` is derived from the requested name, where
//! `xxxx` are four random lowercase letters. At most [`MAX_NAME_ATTEMPTS`]
//! names are checked before giving up.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dedup::FileRecord;
use crate::scanner::path_utils::relative_to;

use super::MergeError;

/// Marker inserted between the stem and the random suffix.
pub const COPY_MARKER: &str = "__COPY";

/// Number of random letters in a rename suffix.
pub const SUFFIX_LEN: usize = 4;

/// Candidate names checked per record, the requested one included.
pub const MAX_NAME_ATTEMPTS: usize = 6;

/// Source of rename suffixes.
pub trait SuffixSource {
    /// Produce the next suffix (normally [`SUFFIX_LEN`] lowercase letters).
    fn next_suffix(&mut self) -> String;
}

/// Random lowercase suffixes.
#[derive(Debug)]
pub struct RandomSuffix {
    rng: StdRng,
}

impl RandomSuffix {
    /// Suffixes seeded from the OS.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible suffixes.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSuffix {
    fn default() -> Self {
        Self::new()
    }
}

impl SuffixSource for RandomSuffix {
    fn next_suffix(&mut self) -> String {
        (0..SUFFIX_LEN)
            .map(|_| char::from(self.rng.random_range(b'a'..=b'z')))
            .collect()
    }
}

/// Where a record ends up in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The requested name is free.
    Fresh(PathBuf),
    /// The requested name was taken; a derived name is used instead.
    Renamed {
        /// Name derived from the source's relative path
        requested: PathBuf,
        /// Name actually used
        resolved: PathBuf,
    },
    /// A file already sat at the requested name before this run.
    PreExisting(PathBuf),
}

impl Placement {
    /// Path the record would be written to, if it is written at all.
    #[must_use]
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Fresh(path) => Some(path),
            Self::Renamed { resolved, .. } => Some(resolved),
            Self::PreExisting(_) => None,
        }
    }
}

/// Filesystem identity of a target occupant.
///
/// Two spellings of one file (a symlinked directory, a case-insensitive
/// volume) share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FileKey {
    #[cfg(unix)]
    Inode { dev: u64, ino: u64 },
    #[cfg(not(unix))]
    Canonical(PathBuf),
}

impl FileKey {
    /// Identity of the entry at `path` without following a final symlink.
    #[cfg(unix)]
    fn of(path: &Path) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        let meta = std::fs::symlink_metadata(path).ok()?;
        Some(Self::Inode {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(path: &Path) -> Option<Self> {
        std::fs::canonicalize(path).ok().map(Self::Canonical)
    }
}

/// Target entries written (or planned) during the current run.
///
/// Tracked both by path and by file identity, so a file this run wrote is
/// recognised through any alias of its path.
#[derive(Debug, Default)]
pub struct TargetClaims {
    claimed: HashSet<PathBuf>,
    identities: HashSet<FileKey>,
}

impl TargetClaims {
    /// Create an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a path as owned by this run. If an entry exists there, its
    /// identity is remembered too.
    pub fn claim(&mut self, path: PathBuf) {
        if let Some(key) = FileKey::of(&path) {
            self.identities.insert(key);
        }
        self.claimed.insert(path);
    }

    /// Whether this run already owns a path, under this or any other
    /// spelling.
    #[must_use]
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains(path)
            || (!self.identities.is_empty()
                && FileKey::of(path).is_some_and(|key| self.identities.contains(&key)))
    }

    /// Number of claimed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Whether nothing has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// Requested target path of a copy-eligible record.
///
/// # Errors
///
/// Fails if the record's folder index is unknown or the source path is not
/// under that folder.
pub fn target_path_for(
    record: &FileRecord,
    copy_roots: &[PathBuf],
    target_root: &Path,
) -> Result<PathBuf, MergeError> {
    let root = copy_roots
        .get(record.folder_index)
        .ok_or_else(|| MergeError::UnknownFolder {
            path: record.source_path.clone(),
            folder_index: record.folder_index,
        })?;
    let relative =
        relative_to(&record.source_path, root).ok_or_else(|| MergeError::OutsideSourceRoot {
            path: record.source_path.clone(),
            root: root.clone(),
        })?;
    Ok(target_root.join(relative))
}

/// Derive `<stem>__COPY<suffix><.ext>` next to `requested`.
#[must_use]
pub fn candidate_name(requested: &Path, suffix: &str) -> PathBuf {
    let mut name = requested
        .file_stem()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(COPY_MARKER);
    name.push(suffix);
    if let Some(ext) = requested.extension() {
        name.push(".");
        name.push(ext);
    }
    requested.with_file_name(name)
}

fn is_occupied(path: &Path, claims: &TargetClaims) -> bool {
    claims.is_claimed(path) || path.symlink_metadata().is_ok()
}

/// Decide where a record goes.
///
/// A regular file found at the requested path that this run did not write
/// means the content is treated as already merged. Any other occupant
/// triggers renaming.
///
/// # Errors
///
/// [`MergeError::RenameExhausted`] if every candidate is occupied.
pub fn resolve_placement(
    requested: &Path,
    claims: &TargetClaims,
    suffixes: &mut dyn SuffixSource,
) -> Result<Placement, MergeError> {
    if !claims.is_claimed(requested) && requested.is_file() {
        return Ok(Placement::PreExisting(requested.to_path_buf()));
    }

    let mut candidate = requested.to_path_buf();
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        if !is_occupied(&candidate, claims) {
            return Ok(if attempt == 1 {
                Placement::Fresh(candidate)
            } else {
                Placement::Renamed {
                    requested: requested.to_path_buf(),
                    resolved: candidate,
                }
            });
        }
        log::debug!("Target name taken: {}", candidate.display());
        candidate = candidate_name(requested, &suffixes.next_suffix());
    }

    Err(MergeError::RenameExhausted {
        target: requested.to_path_buf(),
        attempts: MAX_NAME_ATTEMPTS,
    })
}
