//! Structured error handling and exit codes.

use serde::Serialize;

use crate::merge::MergeError;

/// Exit codes for fdmerge.
///
/// - 0: Success
/// - 1: General error (missing folders, scan/copy I/O, vanished source,
///   state file write)
/// - 2: No free target name found after the bounded rename attempts
/// - 3: A copy failed verification
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The run completed.
    Success = 0,
    /// An error aborted the run.
    GeneralError = 1,
    /// Rename attempts were exhausted.
    RenameExhausted = 2,
    /// A copy did not match its source.
    IntegrityFailure = 3,
    /// The run was interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "FM000",
            Self::GeneralError => "FM001",
            Self::RenameExhausted => "FM002",
            Self::IntegrityFailure => "FM003",
            Self::Interrupted => "FM130",
        }
    }

    /// Exit code for an error returned by [`crate::run_app`].
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<MergeError>())
            .map_or(Self::GeneralError, MergeError::exit_code)
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "FM001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
