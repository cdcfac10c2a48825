//! File records and folder roles.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Role a source folder plays in a merge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderRole {
    /// Scanned to claim content, never copied from.
    CompareOnly,
    /// Canonical content found here is copied into the target.
    CopyEligible,
}

impl FolderRole {
    /// Whether records found under this role are copied.
    #[must_use]
    pub fn is_copy_eligible(self) -> bool {
        matches!(self, Self::CopyEligible)
    }
}

impl fmt::Display for FolderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompareOnly => write!(f, "compare-only"),
            Self::CopyEligible => write!(f, "copy-eligible"),
        }
    }
}

/// One file occurrence.
///
/// `folder_index` indexes the list of folders of the same role: a
/// copy-eligible record indexes the copy-eligible roots, a compare-only
/// record the compare-only roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the source file
    pub source_path: PathBuf,
    /// Index of the originating folder within its role's list
    pub folder_index: usize,
    /// Whether this record may be copied into the target
    pub copy_eligible: bool,
}

impl FileRecord {
    /// Create a record for a file found in a folder of the given role.
    #[must_use]
    pub fn new(source_path: PathBuf, folder_index: usize, role: FolderRole) -> Self {
        Self {
            source_path,
            folder_index,
            copy_eligible: role.is_copy_eligible(),
        }
    }

    /// Rebind a record loaded from a snapshot to the current pass.
    pub fn reassign(&mut self, folder_index: usize, role: FolderRole) {
        self.folder_index = folder_index;
        self.copy_eligible = role.is_copy_eligible();
    }

    /// Path of the source file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.source_path
    }
}
