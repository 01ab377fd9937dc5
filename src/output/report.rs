//! Reporting sinks.
//!
//! Every audited directory produces exactly one [`DirectoryReport`]. Sinks
//! write a report's lines in one go while holding their lock, so lines of
//! different directories never interleave, also when subtrees are audited
//! in parallel.

use crate::audit::DirectoryState;
use crate::diff::SnapshotDiff;
use crate::error::AuditError;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::error;

/// Outcome of auditing one directory.
#[derive(Debug)]
pub struct DirectoryReport {
    /// The audited directory.
    pub directory: PathBuf,
    /// Terminal state of the directory's audit.
    pub state: DirectoryState,
    /// Recoverable per-entry problems.
    pub warnings: Vec<AuditError>,
    /// Differences against the previous manifest (empty when unchanged).
    pub diff: SnapshotDiff,
    /// The failure that ended the audit, for [`DirectoryState::Failed`].
    pub error: Option<AuditError>,
}

/// Kind of a rendered report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Entry could not be read or recorded.
    Warning,
    /// Entry only in the current snapshot.
    Added,
    /// Entry only in the previous manifest.
    Deleted,
    /// Entry differs between the two.
    Changed,
    /// The directory's audit failed.
    Error,
}

/// One human-readable report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    /// Line kind, used for styling.
    pub kind: LineKind,
    /// Line text without terminator.
    pub text: String,
}

/// Renders a report as lines of the form `<directory>: <Kind>: <detail>`.
///
/// Warnings come first, then added, deleted and changed entries (each
/// sorted by name), then the error if the audit failed. A file that turned
/// into a directory (or back) under the same name is a `Changed` line.
#[must_use]
pub fn render_lines(report: &DirectoryReport) -> Vec<ReportLine> {
    let dir = report.directory.display();
    let mut lines = Vec::with_capacity(report.warnings.len() + report.diff.len() + 1);
    let mut push = |kind, text| lines.push(ReportLine { kind, text });

    for warning in &report.warnings {
        push(LineKind::Warning, format!("{dir}: {warning}"));
    }
    for entry in &report.diff.added {
        push(LineKind::Added, format!("{dir}: Added: {entry}"));
    }
    for entry in &report.diff.deleted {
        push(LineKind::Deleted, format!("{dir}: Deleted: {entry}"));
    }
    for (old, new) in &report.diff.changed {
        push(
            LineKind::Changed,
            format!("{dir}: Changed: {old}   ->   {new}"),
        );
    }
    if let Some(err) = &report.error {
        push(LineKind::Error, format!("{dir}: Error: {err}"));
    }
    lines
}

/// Receives one report per audited directory.
pub trait Reporter: Send + Sync {
    /// Records the outcome of one directory. Sink failures are logged, they
    /// never interrupt the walk.
    fn report(&self, report: &DirectoryReport);
}

/// Writes reports to any byte stream.
pub struct StreamReporter<W: Write + Send> {
    /// Output stream, locked per report.
    out: Mutex<W>,
    /// Wrap lines in ANSI colors by kind.
    colorize: bool,
    /// Precede every report with a `Processing <dir>` line.
    processing_lines: bool,
}

impl<W: Write + Send> StreamReporter<W> {
    /// Creates a reporter over `out`.
    pub fn new(out: W, colorize: bool, processing_lines: bool) -> Self {
        Self {
            out: Mutex::new(out),
            colorize,
            processing_lines,
        }
    }

    /// Locks the stream; a poisoned lock still holds a usable writer.
    fn lock(&self) -> MutexGuard<'_, W> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes all lines of `report` and flushes.
    fn write_report(&self, report: &DirectoryReport) -> io::Result<()> {
        let lines = render_lines(report);
        let mut out = self.lock();
        if self.processing_lines {
            writeln!(out, "Processing {}", report.directory.display())?;
        }
        for line in &lines {
            if self.colorize {
                writeln!(out, "{}", styled(line))?;
            } else {
                writeln!(out, "{}", line.text)?;
            }
        }
        out.flush()
    }
}

impl<W: Write + Send> Reporter for StreamReporter<W> {
    fn report(&self, report: &DirectoryReport) {
        if let Err(e) = self.write_report(report) {
            error!(
                "Failed to write report for {}: {e}",
                report.directory.display()
            );
        }
    }
}

/// Applies console colors to a whole line.
fn styled(line: &ReportLine) -> colored::ColoredString {
    let text = line.text.as_str();
    match line.kind {
        LineKind::Added => text.green(),
        LineKind::Deleted => text.red(),
        LineKind::Changed => text.yellow(),
        LineKind::Warning => text.yellow().bold(),
        LineKind::Error => text.red().bold(),
    }
}

/// Standard-output sink with colored lines.
pub struct ConsoleReporter {
    /// Wrapped stream reporter.
    inner: StreamReporter<io::Stdout>,
}

impl ConsoleReporter {
    /// Creates a console reporter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: StreamReporter::new(io::stdout(), true, false),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, report: &DirectoryReport) {
        super::verbose(&format!("Processing {}", report.directory.display()));
        self.inner.report(report);
    }
}

/// Run-scoped log file sink, `chksum_<YYYYmmdd_HHMMSS>.log`.
///
/// Writes a `Processing <dir>` line for every directory followed by its
/// report lines, flushed after each directory.
pub struct LogFileReporter {
    /// Wrapped stream reporter.
    inner: StreamReporter<BufWriter<File>>,
    /// Location of the log file.
    path: PathBuf,
}

impl LogFileReporter {
    /// Creates a new log file in `dir` named after the current local time.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the file cannot be created.
    pub fn create(dir: &Path) -> Result<Self> {
        Self::create_at(dir, Local::now())
    }

    /// Creates the log file for the run started at `started`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the file cannot be created.
    pub fn create_at(dir: &Path, started: DateTime<Local>) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        let path = dir.join(Self::file_name(started));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        Ok(Self {
            inner: StreamReporter::new(BufWriter::new(file), false, true),
            path,
        })
    }

    /// Log file name for a run started at `started`.
    #[must_use]
    pub fn file_name(started: DateTime<Local>) -> String {
        format!("chksum_{}.log", started.format("%Y%m%d_%H%M%S"))
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reporter for LogFileReporter {
    fn report(&self, report: &DirectoryReport) {
        self.inner.report(report);
    }
}

/// Collects rendered lines in memory.
#[derive(Default)]
pub struct MemoryReporter {
    /// Every rendered line, in report order.
    lines: Mutex<Vec<String>>,
    /// Number of reports received.
    reports: Mutex<usize>,
}

impl MemoryReporter {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines received so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of directory reports received so far.
    #[must_use]
    pub fn report_count(&self) -> usize {
        *self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, report: &DirectoryReport) {
        let rendered = render_lines(report);
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.extend(rendered.into_iter().map(|line| line.text));
        *self.reports.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }
}
