//! Content-addressed indexes: folder-local maps, the global dedup index and
//! the collision tracker.
//!
//! # Overview
//!
//! - [`FolderMap`]: digest → canonical record for one folder pass, in
//!   discovery order.
//! - [`DedupIndex`]: union of all folder maps. A digest, once present, keeps
//!   its record for the rest of the run.
//! - [`CollisionTracker`]: digest → every non-canonical occurrence, in
//!   discovery order.
//!
//! # Example
//!
//! ```
//! use fdmerge::dedup::{CollisionTracker, DedupIndex, FileRecord, FolderMap, FolderRole};
//! use fdmerge::scanner::ContentDigest;
//! use std::path::PathBuf;
//!
//! let digest = ContentDigest::of_bytes(b"same");
//! let mut index = DedupIndex::new();
//! let mut collisions = CollisionTracker::new();
//! let mut local = FolderMap::new();
//!
//! let first = FileRecord::new(PathBuf::from("/a/x"), 0, FolderRole::CopyEligible);
//! let second = FileRecord::new(PathBuf::from("/a/y"), 0, FolderRole::CopyEligible);
//! local.observe(digest, first, &index, &mut collisions);
//! local.observe(digest, second, &index, &mut collisions);
//! index.absorb(local);
//!
//! assert_eq!(index.len(), 1);
//! assert_eq!(collisions.duplicates_of(&digest).len(), 1);
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::scanner::ContentDigest;

use super::record::FileRecord;

/// Outcome of observing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First occurrence of this content: the record became canonical.
    Canonical,
    /// Content already known: the record was filed as a duplicate.
    Duplicate,
}

/// Insertion-ordered digest → record map.
#[derive(Debug, Clone, Default)]
pub struct FolderMap {
    entries: Vec<(ContentDigest, FileRecord)>,
    positions: HashMap<ContentDigest, usize>,
}

impl FolderMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from entries, keeping the first record of any repeated
    /// digest.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (ContentDigest, FileRecord)>) -> Self {
        let mut map = Self::new();
        for (digest, record) in entries {
            map.insert_new(digest, record);
        }
        map
    }

    /// Number of digests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a digest is present.
    #[must_use]
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.positions.contains_key(digest)
    }

    /// Record stored for a digest.
    #[must_use]
    pub fn get(&self, digest: &ContentDigest) -> Option<&FileRecord> {
        self.positions.get(digest).map(|&i| &self.entries[i].1)
    }

    /// Insert a record unless the digest is already present.
    ///
    /// Returns `false` (leaving the existing record untouched) when the
    /// digest was already there.
    pub fn insert_new(&mut self, digest: ContentDigest, record: FileRecord) -> bool {
        if self.positions.contains_key(&digest) {
            return false;
        }
        self.positions.insert(digest, self.entries.len());
        self.entries.push((digest, record));
        true
    }

    /// File one hashed file against this folder's map and the global index.
    ///
    /// Content unknown to both becomes canonical in this map; anything else
    /// is appended to the collision tracker.
    pub fn observe(
        &mut self,
        digest: ContentDigest,
        record: FileRecord,
        index: &DedupIndex,
        collisions: &mut CollisionTracker,
    ) -> Observation {
        if index.contains(&digest) || self.contains(&digest) {
            collisions.record_duplicate(digest, record);
            Observation::Duplicate
        } else {
            self.insert_new(digest, record);
            Observation::Canonical
        }
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentDigest, &FileRecord)> + '_ {
        self.entries.iter().map(|(d, r)| (d, r))
    }

    /// Mutable access to every record, in insertion order.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut FileRecord> + '_ {
        self.entries.iter_mut().map(|(_, r)| r)
    }

    /// Consume the map into its ordered entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<(ContentDigest, FileRecord)> {
        self.entries
    }
}

/// Global digest → canonical record index for one run.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    map: FolderMap,
}

impl DedupIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unique contents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Whether a digest already has a canonical record.
    #[must_use]
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.map.contains(digest)
    }

    /// Canonical record of a digest.
    #[must_use]
    pub fn get(&self, digest: &ContentDigest) -> Option<&FileRecord> {
        self.map.get(digest)
    }

    /// Merge a finished folder map into the index.
    ///
    /// Existing canonical records are never replaced. A scanned folder map
    /// cannot overlap the index, but a loaded snapshot can; overlapping
    /// snapshot entries are dropped and their count returned.
    pub fn absorb(&mut self, local: FolderMap) -> usize {
        let mut dropped = 0;
        for (digest, record) in local.into_entries() {
            if !self.map.insert_new(digest, record) {
                log::debug!("Snapshot entry {digest} already canonical, keeping existing record");
                dropped += 1;
            }
        }
        dropped
    }

    /// Iterate canonical records in the order they were first seen.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentDigest, &FileRecord)> + '_ {
        self.map.iter()
    }

    /// Number of canonical records that will be copied.
    #[must_use]
    pub fn copy_eligible_count(&self) -> usize {
        self.iter().filter(|(_, r)| r.copy_eligible).count()
    }
}

/// Non-canonical occurrences, keyed by digest.
#[derive(Debug, Clone, Default)]
pub struct CollisionTracker {
    duplicates: BTreeMap<ContentDigest, Vec<FileRecord>>,
}

impl CollisionTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a duplicate occurrence of `digest`.
    pub fn record_duplicate(&mut self, digest: ContentDigest, record: FileRecord) {
        self.duplicates.entry(digest).or_default().push(record);
    }

    /// Duplicates recorded for a digest (empty if none).
    #[must_use]
    pub fn duplicates_of(&self, digest: &ContentDigest) -> &[FileRecord] {
        self.duplicates.get(digest).map_or(&[], Vec::as_slice)
    }

    /// Number of digests with at least one duplicate.
    #[must_use]
    pub fn duplicate_sets(&self) -> usize {
        self.duplicates.len()
    }

    /// Total number of duplicate occurrences.
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.duplicates.values().map(Vec::len).sum()
    }

    /// Whether no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
    }

    /// Iterate `(digest, duplicates)` in digest order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentDigest, &[FileRecord])> + '_ {
        self.duplicates.iter().map(|(d, v)| (d, v.as_slice()))
    }
}
