//! Progress reporting utilities using indicatif.
//!
//! The merge pipeline reports through [`ProgressCallback`]; [`Progress`]
//! renders those events as terminal bars. Phases emitted by the pipeline:
//!
//! - `"walking"`: enumerating one source folder (spinner)
//! - `"hashing"`: hashing that folder's files (bar)
//! - `"copying"`: copying canonical records into the target (bar)

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for the merge phases.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (`"walking"`, `"hashing"`, `"copying"`)
    /// * `total` - Total number of items to process (0 if unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message (usually the folder being
    /// processed).
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    hashing: Mutex<Option<ProgressBar>>,
    copying: Mutex<Option<ProgressBar>>,
    prefix: Mutex<String>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use fdmerge::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walking: Mutex::new(None),
            hashing: Mutex::new(None),
            copying: Mutex::new(None),
            prefix: Mutex::new(String::new()),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style(color: &str) -> ProgressStyle {
        let template = format!(
            "[{{elapsed_precise}}] [{{bar:40.{color}/blue}}] {{pos}}/{{len}} ({{percent}}%) {{msg}} (ETA: {{eta}})"
        );
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            "walking" => Some(&self.walking),
            "hashing" => Some(&self.hashing),
            "copying" => Some(&self.copying),
            _ => None,
        }
    }

    /// Bar that currently receives item updates.
    fn with_active_bar(&self, f: impl FnOnce(&ProgressBar)) {
        for slot in [&self.copying, &self.hashing, &self.walking] {
            if let Ok(guard) = slot.lock() {
                if let Some(pb) = guard.as_ref() {
                    f(pb);
                    return;
                }
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            "walking" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::walking_style());
                pb.set_message("Walking directory");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            "hashing" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style("cyan"));
                pb.set_message("Hashing");
                pb
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style("green"));
                pb.set_message(phase.to_string());
                pb
            }
        };

        if let Some(Ok(mut slot)) = self.slot(phase).map(Mutex::lock) {
            *slot = Some(pb);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let prefix = self.prefix.lock().map(|p| p.clone()).unwrap_or_default();
        let display_msg = if prefix.is_empty() {
            truncate_path(path, 30)
        } else {
            format!("{}: {}", prefix, truncate_path(path, 30))
        };

        self.with_active_bar(|pb| {
            pb.set_position(current as u64);
            pb.set_message(display_msg);
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let finished = match phase {
            "walking" => "Walking complete",
            "hashing" => "Hashing complete",
            "copying" => "Copying complete",
            _ => return,
        };
        if let Some(Ok(mut slot)) = self.slot(phase).map(Mutex::lock) {
            if let Some(pb) = slot.take() {
                pb.finish_with_message(finished);
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Ok(mut prefix) = self.prefix.lock() {
            *prefix = message.to_string();
        }
        self.with_active_bar(|pb| pb.set_message(message.to_string()));
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
