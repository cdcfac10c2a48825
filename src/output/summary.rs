//! Human-readable run summary.
//!
//! Colors come from `yansi`; call `yansi::disable()` before rendering to
//! get plain text (the binary does this for `--no-color`).

use std::fmt::Write as _;
use std::io::Write;

use bytesize::ByteSize;
use chrono::Local;
use yansi::Paint;

use crate::dedup::FolderReport;
use crate::merge::MergeReport;

/// Which optional listings to include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryOptions {
    /// List every set of identical files
    pub display_collisions: bool,
    /// List every file written under a derived name
    pub display_renames: bool,
    /// Indent listings across several lines instead of one line per entry
    pub human_readable: bool,
}

impl SummaryOptions {
    #[must_use]
    pub fn with_collisions(mut self, enabled: bool) -> Self {
        self.display_collisions = enabled;
        self
    }

    #[must_use]
    pub fn with_renames(mut self, enabled: bool) -> Self {
        self.display_renames = enabled;
        self
    }

    #[must_use]
    pub fn with_human_readable(mut self, enabled: bool) -> Self {
        self.human_readable = enabled;
        self
    }
}

/// Text summary of a merge run.
pub struct Summary<'a> {
    report: &'a MergeReport,
    options: SummaryOptions,
}

impl<'a> Summary<'a> {
    #[must_use]
    pub fn new(report: &'a MergeReport, options: SummaryOptions) -> Self {
        Self { report, options }
    }

    /// Render the summary to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.render_into(&mut out);
        out
    }

    /// Write the rendered summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.render().as_bytes())
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        let report = self.report;
        let outcome = &report.outcome;

        writeln!(
            out,
            "{} {}",
            "Merge finished".bold(),
            Local::now().format("%Y-%m-%d %H:%M:%S").dim()
        )?;
        writeln!(out, "Target: {}", report.target.display())?;
        writeln!(out)?;

        for folder in &report.folders {
            self.render_folder(out, folder)?;
        }

        if self.options.display_collisions {
            self.render_collisions(out)?;
        }
        if self.options.display_renames {
            self.render_renames(out)?;
        }

        writeln!(out, "{}", "Totals".bold().underline())?;
        writeln!(out, "  Unique files:        {}", report.index.len().cyan())?;
        writeln!(
            out,
            "  Duplicate sets:      {} ({} duplicate files)",
            report.collisions.duplicate_sets().yellow(),
            report.collisions.duplicate_files()
        )?;
        writeln!(
            out,
            "  Files copied:        {} ({})",
            outcome.copies.len().green(),
            ByteSize::b(outcome.bytes_copied())
        )?;
        writeln!(out, "  Files renamed:       {}", outcome.renames.len().magenta())?;
        if !outcome.skipped_existing.is_empty() {
            writeln!(
                out,
                "  Already in target:   {}",
                outcome.skipped_existing.len()
            )?;
        }
        writeln!(
            out,
            "  Elapsed:             {:.2}s",
            report.duration.as_secs_f64()
        )?;

        if report.dry_run {
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                "DRY RUN: NO FILES ACTUALLY COPIED".red().bold()
            )?;
            if let Some(stop) = &outcome.dry_run_stop {
                match &stop.target {
                    Some(target) => writeln!(
                        out,
                        "  First copy would be {} -> {}",
                        stop.source.display(),
                        target.display()
                    )?,
                    None => writeln!(
                        out,
                        "  First record {} is already in the target",
                        stop.source.display()
                    )?,
                }
            }
        }
        Ok(())
    }

    fn render_folder(&self, out: &mut String, folder: &FolderReport) -> std::fmt::Result {
        let source = if folder.from_cache { " (from state file)" } else { "" };
        writeln!(
            out,
            "{} [{} #{}]{}",
            folder.root.display().to_string().bold(),
            folder.role,
            folder.index,
            source
        )?;
        writeln!(
            out,
            "  {} files, {} new, {} duplicates, {} hashed in {:.2}s",
            folder.files,
            folder.canonical,
            folder.duplicates,
            ByteSize::b(folder.bytes_hashed),
            folder.elapsed.as_secs_f64()
        )?;
        if self.options.human_readable {
            for (ext, count) in folder.histogram.iter() {
                let label = if ext.is_empty() { "(none)" } else { ext };
                writeln!(out, "    {label:<12} {count}")?;
            }
            if !folder.histogram.is_empty() {
                writeln!(out, "    {:<12} {}", "total", folder.histogram.total())?;
            }
        } else if !folder.histogram.is_empty() {
            let parts: Vec<String> = folder
                .histogram
                .iter()
                .map(|(ext, count)| {
                    let label = if ext.is_empty() { "(none)" } else { ext };
                    format!("{label}={count}")
                })
                .collect();
            writeln!(out, "  extensions: {}", parts.join(" "))?;
        }
        writeln!(out)
    }

    fn render_collisions(&self, out: &mut String) -> std::fmt::Result {
        let report = self.report;
        writeln!(out, "{}", "Identical files".bold().underline())?;
        if report.collisions.is_empty() {
            writeln!(out, "  none")?;
        }
        for (digest, duplicates) in report.collisions.iter() {
            let canonical = report
                .index
                .get(digest)
                .map(|r| r.path().display().to_string())
                .unwrap_or_default();
            if self.options.human_readable {
                writeln!(out, "  {}", digest.dim())?;
                writeln!(out, "    {} (kept)", canonical)?;
                for record in duplicates {
                    writeln!(out, "    {}", record.path().display())?;
                }
            } else {
                let others: Vec<String> = duplicates
                    .iter()
                    .map(|r| r.path().display().to_string())
                    .collect();
                writeln!(out, "{digest} {canonical} <= {}", others.join(", "))?;
            }
        }
        writeln!(out)
    }

    fn render_renames(&self, out: &mut String) -> std::fmt::Result {
        let renames = &self.report.outcome.renames;
        writeln!(out, "{}", "Renamed copies".bold().underline())?;
        if renames.is_empty() {
            writeln!(out, "  none")?;
        }
        for rename in renames {
            if self.options.human_readable {
                writeln!(out, "  {}", rename.requested.display())?;
                writeln!(out, "    -> {}", rename.resolved.display())?;
            } else {
                writeln!(
                    out,
                    "{} -> {}",
                    rename.requested.display(),
                    rename.resolved.display()
                )?;
            }
        }
        writeln!(out)
    }
}
