pub mod parser;

use crate::{CONFIG_PATH_ENV, DEFAULT_CHUNK_SIZE, DEFAULT_CONFIG_PATH, DEFAULT_MANIFEST_NAME};
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Directory names never descended into: recycle bins, file-system
/// recovery folders and volume metadata.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "$RECYCLE.BIN",
    "found.000",
    "Recovery",
    "System Volume Information",
];

/// Startup configuration, read from `config.toml` and overridden by flags.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// `[audit]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AuditConfig {
    /// Reserved manifest file name, excluded from its own snapshot
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
    /// Directory names skipped during traversal
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
    /// Fingerprint read buffer in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Where diff lines go.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReportSink {
    /// Standard output, colored.
    #[default]
    Stdout,
    /// Timestamped log file.
    LogFile,
}

/// `[report]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ReportConfig {
    #[serde(default)]
    pub sink: ReportSink,
    /// Directory for `chksum_<timestamp>.log` files (default: current directory)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// `[performance]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct PerformanceConfig {
    /// Audit sibling subtrees concurrently
    #[serde(default)]
    pub parallel: bool,
    /// Worker threads for parallel audits, 0 lets rayon decide
    #[serde(default)]
    pub threads: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            manifest_name: default_manifest_name(),
            excluded_dirs: default_excluded_dirs(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Location of the configuration file: `$CHKSUM_CONFIG_PATH`, else
    /// `<config_dir>/chksum/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from a file.
    ///
    /// A missing file yields the defaults; nothing is created on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML
    /// - A value fails validation
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        parser::parse_config_file(path)
    }

    /// Exclusion list as a set for lookups during listing.
    #[must_use]
    pub fn excluded_set(&self) -> BTreeSet<String> {
        self.audit.excluded_dirs.iter().cloned().collect()
    }

    /// Re-runs validation, e.g. after command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        parser::validate_config(self)
    }
}

// Default functions for serde
fn default_manifest_name() -> String {
    DEFAULT_MANIFEST_NAME.to_string()
}

fn default_excluded_dirs() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS.iter().map(ToString::to_string).collect()
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
