//! Extension histogram for one folder pass (reporting only).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::path_utils::extension_of;

/// Tally of file extensions seen in one folder, including the empty
/// extension for files without one. Extensions keep their original case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtensionHistogram {
    counts: BTreeMap<String, usize>,
}

impl ExtensionHistogram {
    /// Create an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a histogram from a list of file paths.
    #[must_use]
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let mut histogram = Self::new();
        for path in paths {
            histogram.record(path);
        }
        histogram
    }

    /// Count one file.
    pub fn record(&mut self, path: &Path) {
        *self.counts.entry(extension_of(path)).or_insert(0) += 1;
    }

    /// Occurrences of an extension (with its leading dot, or `""`).
    #[must_use]
    pub fn count(&self, extension: &str) -> usize {
        self.counts.get(extension).copied().unwrap_or(0)
    }

    /// Total number of files counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Whether nothing was counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate `(extension, count)` pairs in extension order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.counts.iter().map(|(ext, count)| (ext.as_str(), *count))
    }
}
