#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![allow(clippy::arithmetic_side_effects)] // Counters over directory entries cannot overflow

//! # chksum - Directory-Tree Integrity Auditor
//!
//! `chksum` walks a directory tree top-down and keeps a small text manifest
//! (`.chksum` by default) in every directory it visits. Each manifest records
//! the directory's immediate children: subdirectory names, and for files the
//! size, UTC modification time and SHA-256 digest. On every run the freshly
//! observed state is compared with the stored one, additions, deletions and
//! modifications are reported, and the manifest is rewritten when it differs.
//!
//! ## Architecture
//!
//! - [`manifest`]: entry and snapshot types, the line-oriented manifest codec
//! - [`scanner`]: directory listing, file fingerprinting, snapshot building
//! - [`diff`]: classification of two snapshots into added/deleted/changed
//! - [`audit`]: the per-directory state machine and tree traversal
//! - [`output`]: reporting sinks (console, log file, memory) and styling
//! - [`config`]: TOML configuration and validation
//! - [`error`]: error taxonomy shared by the components
//!
//! ## Example Usage
//!
//! ```no_run
//! use chksum::audit::Auditor;
//! use chksum::config::Config;
//! use chksum::output::ConsoleReporter;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let reporter = ConsoleReporter::new();
//! let summary = Auditor::new(&config, &reporter).run(std::path::Path::new("."));
//! println!("{} directories updated", summary.updated);
//! # Ok(())
//! # }
//! ```

/// Tree traversal and per-directory audit state machine.
pub mod audit;

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Configuration parsing, validation, and management.
pub mod config;

/// Snapshot comparison.
pub mod diff;

/// Error types for the audit components.
pub mod error;

/// Manifest entries, snapshots and the on-disk codec.
pub mod manifest;

/// Reporting channel and console output.
pub mod output;

/// Directory listing, fingerprinting and snapshot building.
pub mod scanner;

/// Current version of the chksum binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default manifest file name placed in every audited directory.
pub const DEFAULT_MANIFEST_NAME: &str = ".chksum";

/// Default configuration file path relative to the user config directory.
pub const DEFAULT_CONFIG_PATH: &str = "chksum/config.toml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "CHKSUM_CONFIG_PATH";

/// Environment variable holding a `tracing` filter directive.
pub const LOG_FILTER_ENV: &str = "CHKSUM_LOG";

/// Fingerprint read chunk size (128 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Field delimiter of manifest records. Not valid in filenames on the
/// platforms the manifests originate from.
pub const FIELD_DELIMITER: char = '*';
