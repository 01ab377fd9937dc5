//! Command-line interface definitions for chksum.
//!
//! The CLI definitions are shared between the main binary and build tools
//! (like xtask) for man page generation.
//!
//! Field-level documentation is provided via clap attributes, so missing docs
//! are allowed for this module.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use crate::config::{Config, ReportSink};
use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for chksum.
#[derive(Parser, Debug)]
#[command(
    name = "chksum",
    version = crate::VERSION,
    about = "Directory-tree integrity auditor",
    long_about = "Walks a directory tree, keeps a .chksum manifest of sizes, modification \
                  times and SHA-256 digests in every directory, and reports files that were \
                  added, deleted or changed since the previous run"
)]
pub struct Cli {
    /// Root of the tree to audit
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "FILE", env = "CHKSUM_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Manifest file name written in every directory
    #[arg(long, value_name = "NAME")]
    pub manifest_name: Option<String>,

    /// Directory name to skip, in addition to the configured ones (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Do not skip the configured exclusion list
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Write the report to a timestamped log file instead of stdout
    #[arg(long)]
    pub log_file: bool,

    /// Directory receiving the log file (implies --log-file)
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Audit sibling subtrees in parallel
    #[arg(short, long)]
    pub parallel: bool,

    /// Worker threads for --parallel (0 = one per CPU)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Show verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

impl Cli {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(name) = &self.manifest_name {
            config.audit.manifest_name.clone_from(name);
        }
        if self.no_default_excludes {
            config.audit.excluded_dirs.clear();
        }
        config.audit.excluded_dirs.extend(self.exclude.iter().cloned());
        if self.log_file || self.log_dir.is_some() {
            config.report.sink = ReportSink::LogFile;
        }
        if let Some(dir) = &self.log_dir {
            config.report.log_dir = Some(dir.clone());
        }
        if self.parallel {
            config.performance.parallel = true;
        }
        if let Some(threads) = self.threads {
            config.performance.threads = threads;
        }
    }
}
