//! Reports for finished merge runs.
//!
//! - [`summary`]: colored text summary with optional collision and rename
//!   listings
//! - [`json`]: full JSON report for scripting
//!
//! # Example
//!
//! ```no_run
//! use fdmerge::error::ExitCode;
//! use fdmerge::merge::{MergeOptions, MergeRun};
//! use fdmerge::output::{JsonReport, Summary, SummaryOptions};
//! use std::path::PathBuf;
//!
//! let options = MergeOptions::new(PathBuf::from("/merged"), vec![PathBuf::from("/photos")]);
//! let report = MergeRun::new(options).execute().unwrap();
//!
//! print!("{}", Summary::new(&report, SummaryOptions::default()).render());
//! println!("{}", JsonReport::new(&report, ExitCode::Success).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod summary;

pub use json::{JsonOutputError, JsonReport};
pub use summary::{Summary, SummaryOptions};
