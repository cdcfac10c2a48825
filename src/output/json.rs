//! JSON report for merge runs.
//!
//! Produces a machine-readable report of a finished merge, suitable for
//! scripting and automation.
//!
//! # Schema
//!
//! ```json
//! {
//!   "summary": {
//!     "target": "/merged",
//!     "unique_files": 120,
//!     "copy_eligible_files": 95,
//!     "duplicate_sets": 14,
//!     "duplicate_files": 21,
//!     "files_copied": 95,
//!     "files_renamed": 2,
//!     "skipped_existing": 0,
//!     "bytes_copied": 1048576,
//!     "dry_run": false,
//!     "duration_ms": 840,
//!     "exit_code": 0,
//!     "exit_code_name": "FM000",
//!     "generated_at": "2024-05-01T10:00:00+02:00"
//!   },
//!   "folders": [
//!     { "root": "/photos/old", "role": "copy-eligible", "index": 0,
//!       "from_cache": false, "files": 60, "extensions": { ".jpg": 58, "": 2 },
//!       "canonical": 60, "duplicates": 0, "elapsed_ms": 410 }
//!   ],
//!   "collisions": [
//!     { "digest": "ab12...", "duplicates": ["/photos/new/a.jpg"] }
//!   ],
//!   "renames": [ { "digest": "...", "requested": "...", "resolved": "..." } ],
//!   "copies": [ { "digest": "...", "source": "...", "target": "...", "bytes": 10 } ],
//!   "skipped_existing": [],
//!   "dry_run_stop": null
//! }
//! ```

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::dedup::{FolderReport, FolderRole};
use crate::error::ExitCode;
use crate::merge::{CopiedFile, MergeReport, PlannedCopy, RenameRecord};
use crate::scanner::{ContentDigest, ExtensionHistogram};

/// Errors while writing JSON output.
#[derive(Debug, Error)]
pub enum JsonOutputError {
    /// Serialization failed
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Writing failed
    #[error("Failed to write JSON output: {0}")]
    Io(#[from] std::io::Error),
}

/// Run-level counts.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Target folder
    pub target: PathBuf,
    /// Distinct contents across all source folders
    pub unique_files: usize,
    /// Distinct contents whose canonical record may be copied
    pub copy_eligible_files: usize,
    /// Contents seen more than once
    pub duplicate_sets: usize,
    /// Non-canonical occurrences
    pub duplicate_files: usize,
    /// Files written to the target
    pub files_copied: usize,
    /// Files written under a generated name
    pub files_renamed: usize,
    /// Records whose target name already existed before the run
    pub skipped_existing: usize,
    /// Bytes written to the target
    pub bytes_copied: u64,
    /// Whether the run copied nothing by request
    pub dry_run: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Numeric exit code
    pub exit_code: i32,
    /// Exit code prefix (e.g. "FM000")
    pub exit_code_name: String,
    /// When the report was produced
    pub generated_at: DateTime<Local>,
}

/// One folder pass.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFolder {
    pub root: PathBuf,
    pub role: FolderRole,
    pub index: usize,
    pub from_cache: bool,
    pub files: usize,
    pub extensions: ExtensionHistogram,
    pub canonical: usize,
    pub duplicates: usize,
    pub bytes_hashed: u64,
    pub elapsed_ms: u64,
}

impl JsonFolder {
    fn from_report(report: &FolderReport) -> Self {
        Self {
            root: report.root.clone(),
            role: report.role,
            index: report.index,
            from_cache: report.from_cache,
            files: report.files,
            extensions: report.histogram.clone(),
            canonical: report.canonical,
            duplicates: report.duplicates,
            bytes_hashed: report.bytes_hashed,
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }
}

/// Canonical file and the occurrences it shadows.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCollision {
    pub digest: ContentDigest,
    /// Canonical occurrence, if it is still in the index
    pub canonical: Option<PathBuf>,
    /// Every other occurrence, in discovery order
    pub duplicates: Vec<PathBuf>,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub summary: JsonSummary,
    pub folders: Vec<JsonFolder>,
    pub collisions: Vec<JsonCollision>,
    pub renames: Vec<RenameRecord>,
    pub copies: Vec<CopiedFile>,
    pub skipped_existing: Vec<PathBuf>,
    pub dry_run_stop: Option<PlannedCopy>,
}

impl JsonReport {
    /// Build the report for a finished run.
    #[must_use]
    pub fn new(report: &MergeReport, exit_code: ExitCode) -> Self {
        let outcome = &report.outcome;
        let summary = JsonSummary {
            target: report.target.clone(),
            unique_files: report.index.len(),
            copy_eligible_files: report.index.copy_eligible_count(),
            duplicate_sets: report.collisions.duplicate_sets(),
            duplicate_files: report.collisions.duplicate_files(),
            files_copied: outcome.copies.len(),
            files_renamed: outcome.renames.len(),
            skipped_existing: outcome.skipped_existing.len(),
            bytes_copied: outcome.bytes_copied(),
            dry_run: report.dry_run,
            duration_ms: report.duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
            generated_at: Local::now(),
        };

        let collisions = report
            .collisions
            .iter()
            .map(|(digest, records)| JsonCollision {
                digest: *digest,
                canonical: report.index.get(digest).map(|r| r.path().to_path_buf()),
                duplicates: records.iter().map(|r| r.path().to_path_buf()).collect(),
            })
            .collect();

        Self {
            summary,
            folders: report.folders.iter().map(JsonFolder::from_report).collect(),
            collisions,
            renames: outcome.renames.clone(),
            copies: outcome.copies.clone(),
            skipped_existing: outcome.skipped_existing.clone(),
            dry_run_stop: outcome.dry_run_stop.clone(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writeln!(writer)?;
        Ok(())
    }
}
