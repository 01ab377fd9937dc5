//! Tree traversal and the per-directory audit.
//!
//! Each visited directory goes through the same steps:
//!
//! 1. list its children, dropping excluded directory names
//! 2. load the previous manifest (absent means first audit)
//! 3. build the current snapshot
//! 4. identical to a present manifest: [`DirectoryState::Unchanged`]
//! 5. otherwise report the differences and replace the manifest:
//!    [`DirectoryState::Updated`], or [`DirectoryState::Failed`] if the
//!    write failed
//! 6. descend into the subdirectories in name order
//!
//! A directory's manifest is written before any of its children is
//! visited. Failures stay local to the directory (or subtree, when listing
//! fails); the walk always continues with the siblings.

mod abort;

pub use abort::AbortHandle;

use crate::config::Config;
use crate::diff::{SnapshotDiff, diff};
use crate::error::AuditError;
use crate::manifest::codec;
use crate::output::{DirectoryReport, Reporter};
use crate::scanner::{
    DirectoryListing, Fingerprinter, Sha256Fingerprinter, SnapshotBuilder, list_directory,
};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, error, warn};

/// Terminal state of one directory's audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    /// Snapshot equals the stored manifest; nothing written.
    Unchanged,
    /// Differences reported and the manifest replaced.
    Updated,
    /// The audit could not complete; any existing manifest is untouched.
    Failed,
}

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Directories whose manifest matched.
    pub unchanged: usize,
    /// Directories whose manifest was written.
    pub updated: usize,
    /// Directories whose audit failed after listing.
    pub failed: usize,
    /// Directories that could not be listed (their subtree is skipped).
    pub skipped: usize,
    /// Entries reported as added.
    pub added: usize,
    /// Entries reported as deleted.
    pub deleted: usize,
    /// Entries reported as changed.
    pub changed: usize,
    /// Entries that could not be read or recorded.
    pub warnings: usize,
}

impl RunSummary {
    /// `true` if at least one directory was audited to completion.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.unchanged + self.updated > 0
    }

    /// Number of directories visited.
    #[must_use]
    pub const fn directories(&self) -> usize {
        self.unchanged + self.updated + self.failed + self.skipped
    }

    /// Adds the totals of `other`.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.unchanged += other.unchanged;
        self.updated += other.updated;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.added += other.added;
        self.deleted += other.deleted;
        self.changed += other.changed;
        self.warnings += other.warnings;
        self
    }

    /// Counts one directory report.
    fn record(&mut self, report: &DirectoryReport) {
        match report.state {
            DirectoryState::Unchanged => self.unchanged += 1,
            DirectoryState::Updated => self.updated += 1,
            DirectoryState::Failed => self.failed += 1,
        }
        self.added += report.diff.added.len();
        self.deleted += report.diff.deleted.len();
        self.changed += report.diff.changed.len();
        self.warnings += report.warnings.len();
    }
}

/// Walks a tree and audits every directory in it.
pub struct Auditor<'a> {
    /// Reserved manifest file name.
    manifest_name: String,
    /// Directory names never listed nor descended into.
    excluded: BTreeSet<String>,
    /// Fingerprint read buffer size for the default fingerprinter.
    chunk_size: usize,
    /// Replaces the SHA-256 fingerprinter when set.
    fingerprinter: Option<Box<dyn Fingerprinter + 'a>>,
    /// Reporting channel.
    reporter: &'a dyn Reporter,
    /// Shared abort flag.
    abort: AbortHandle,
    /// Audit sibling subtrees concurrently.
    parallel: bool,
    /// Worker threads for parallel audits, 0 for the rayon default.
    threads: usize,
}

impl<'a> Auditor<'a> {
    /// Creates an auditor configured by `config`, reporting to `reporter`.
    #[must_use]
    pub fn new(config: &Config, reporter: &'a dyn Reporter) -> Self {
        Self {
            manifest_name: config.audit.manifest_name.clone(),
            excluded: config.excluded_set(),
            chunk_size: config.audit.chunk_size,
            fingerprinter: None,
            reporter,
            abort: AbortHandle::new(),
            parallel: config.performance.parallel,
            threads: config.performance.threads,
        }
    }

    /// Uses `fingerprinter` instead of the built-in SHA-256 one.
    #[must_use]
    pub fn with_fingerprinter(mut self, fingerprinter: Box<dyn Fingerprinter + 'a>) -> Self {
        self.fingerprinter = Some(fingerprinter);
        self
    }

    /// Shares `abort` with the caller so the run can be stopped externally.
    #[must_use]
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Audits the tree rooted at `root`.
    pub fn run(&self, root: &Path) -> RunSummary {
        let builtin;
        let fingerprinter: &dyn Fingerprinter = match &self.fingerprinter {
            Some(custom) => custom.as_ref(),
            None => {
                builtin = Sha256Fingerprinter::new(self.chunk_size, self.abort.clone());
                &builtin
            }
        };

        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                let source = io::Error::new(io::ErrorKind::NotADirectory, "not a directory");
                return self.listing_failed(root, source);
            }
            Err(source) => return self.listing_failed(root, source),
        }

        if self.parallel && self.threads > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .build()
            {
                Ok(pool) => return pool.install(|| self.visit(root, fingerprinter)),
                Err(e) => warn!("Falling back to the global thread pool: {e}"),
            }
        }
        self.visit(root, fingerprinter)
    }

    /// Audits `dir`, then its subtree.
    fn visit(&self, dir: &Path, fingerprinter: &dyn Fingerprinter) -> RunSummary {
        if self.abort.is_aborted() {
            return RunSummary::default();
        }

        let mut listing = match list_directory(dir, &self.excluded) {
            Ok(listing) => listing,
            Err(err) => return self.report_listing_failure(dir, err),
        };
        let children = std::mem::take(&mut listing.descend);

        let report = self.audit_directory(&listing, fingerprinter);
        let mut summary = RunSummary::default();
        summary.record(&report);
        self.reporter.report(&report);

        if self.parallel {
            children
                .par_iter()
                .map(|child| self.visit(child, fingerprinter))
                .reduce(RunSummary::default, RunSummary::merge)
                .merge(summary)
        } else {
            children
                .iter()
                .map(|child| self.visit(child, fingerprinter))
                .fold(summary, RunSummary::merge)
        }
    }

    /// Runs steps 2-5 for one listed directory.
    fn audit_directory(
        &self,
        listing: &DirectoryListing,
        fingerprinter: &dyn Fingerprinter,
    ) -> DirectoryReport {
        let dir = &listing.path;
        debug!("Processing {}", dir.display());
        let manifest_path = dir.join(&self.manifest_name);

        let past = match codec::read_manifest(&manifest_path) {
            Ok(past) => past,
            Err(err) => return failed(dir, Vec::new(), SnapshotDiff::default(), err),
        };

        let built = match SnapshotBuilder::new(fingerprinter, &self.manifest_name).build(listing) {
            Ok(built) => built,
            Err(err) => return failed(dir, Vec::new(), SnapshotDiff::default(), err),
        };

        if past.as_ref() == Some(&built.snapshot) {
            return DirectoryReport {
                directory: dir.clone(),
                state: DirectoryState::Unchanged,
                warnings: built.warnings,
                diff: SnapshotDiff::default(),
                error: None,
            };
        }

        // An absent manifest is an empty past; the first audit always writes one.
        let changes = diff(&past.unwrap_or_default(), &built.snapshot);
        match codec::write_manifest(&manifest_path, &built.snapshot, &self.abort) {
            Ok(()) => DirectoryReport {
                directory: dir.clone(),
                state: DirectoryState::Updated,
                warnings: built.warnings,
                diff: changes,
                error: None,
            },
            Err(err) => failed(dir, built.warnings, changes, err),
        }
    }

    /// Reports a directory that could not be listed.
    fn report_listing_failure(&self, dir: &Path, err: AuditError) -> RunSummary {
        warn!("{err}");
        self.reporter.report(&DirectoryReport {
            directory: dir.to_path_buf(),
            state: DirectoryState::Failed,
            warnings: Vec::new(),
            diff: SnapshotDiff::default(),
            error: Some(err),
        });
        RunSummary {
            skipped: 1,
            ..RunSummary::default()
        }
    }

    /// The root itself is missing or not a directory.
    fn listing_failed(&self, root: &Path, source: io::Error) -> RunSummary {
        self.report_listing_failure(
            root,
            AuditError::DirectoryListingFailed {
                path: root.to_path_buf(),
                source,
            },
        )
    }
}

/// Builds the report of a failed directory audit.
fn failed(
    dir: &Path,
    warnings: Vec<AuditError>,
    diff: SnapshotDiff,
    err: AuditError,
) -> DirectoryReport {
    error!("{err}");
    DirectoryReport {
        directory: dir.to_path_buf(),
        state: DirectoryState::Failed,
        warnings,
        diff,
        error: Some(err),
    }
}
