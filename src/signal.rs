//! Ctrl+C handling.
//!
//! A single `AtomicBool` is shared by the walker, the hasher and the copy
//! loop. The signal handler only raises it; the pipeline notices between
//! files and between copy records, so a file being copied is always
//! finished and verified before the run stops with exit code 130.
//!
//! ```rust,no_run
//! use fdmerge::signal::install_handler;
//!
//! let handler = install_handler();
//! let flag = handler.flag();
//! // hand `flag` to MergeRun::with_shutdown_flag
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with the flag lowered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown was requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Lower the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The flag itself, for components that poll it.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// The hook is registered once per process; later calls return the same
/// handler with its flag lowered. If registration fails (another hook is
/// already installed), an unhooked handler is returned so the run can
/// still proceed.
pub fn install_handler() -> ShutdownHandler {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return handler.clone();
    }

    let handler = GLOBAL_HANDLER.get_or_init(ShutdownHandler::new).clone();
    let flag = handler.flag();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing the current file...");
        let _ = stderr.flush();
        log::info!("Shutdown signal received");
    }) {
        log::debug!("Ctrl+C handler not installed: {}", e);
    }
    handler
}
