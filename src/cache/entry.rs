//! Snapshot entry definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dedup::FileRecord;
use crate::scanner::ContentDigest;

/// One digest → record pair as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hex-encoded SHA-256 of the file content
    pub digest: String,
    /// Absolute source path
    pub path: PathBuf,
    /// Folder index at the time the snapshot was written
    pub folder_index: usize,
    /// Copy eligibility at the time the snapshot was written
    pub copy_eligible: bool,
}

impl CacheEntry {
    /// Build an entry from an in-memory pair.
    #[must_use]
    pub fn from_record(digest: &ContentDigest, record: &FileRecord) -> Self {
        Self {
            digest: digest.to_hex(),
            path: record.source_path.clone(),
            folder_index: record.folder_index,
            copy_eligible: record.copy_eligible,
        }
    }

    /// Convert back into an in-memory pair.
    ///
    /// Returns `None` if the digest is not 64 hex characters.
    #[must_use]
    pub fn into_record(self) -> Option<(ContentDigest, FileRecord)> {
        let digest = ContentDigest::from_hex(&self.digest).ok()?;
        Some((
            digest,
            FileRecord {
                source_path: self.path,
                folder_index: self.folder_index,
                copy_eligible: self.copy_eligible,
            },
        ))
    }
}
