//! Content deduplication: records, indexes and the folder pipeline.
//!
//! - [`record`]: [`FileRecord`] and [`FolderRole`]
//! - [`index`]: [`FolderMap`], [`DedupIndex`], [`CollisionTracker`]
//! - [`finder`]: [`DuplicateFinder`], which runs the ordered folder passes
//!
//! The first occurrence of a content digest, in folder processing order and
//! then file enumeration order, is canonical. Later occurrences are
//! recorded as collisions and never copied.

pub mod finder;
pub mod index;
pub mod record;

pub use finder::{
    folder_plan, DuplicateFinder, FinderConfig, FinderResult, FolderReport, FolderSource,
    SourceFolder,
};
pub use index::{CollisionTracker, DedupIndex, FolderMap, Observation};
pub use record::{FileRecord, FolderRole};
