#![allow(dead_code)]

use anyhow::Result;
use chksum::audit::{Auditor, RunSummary};
use chksum::config::Config;
use chksum::output::MemoryReporter;
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Digest of the two-byte content `hi`.
pub const HI_DIGEST: &str = "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4";

/// Digest of the five-byte content `hello`.
pub const HELLO_DIGEST: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

/// 2024-03-01T10:00:00+00:00
pub const FIXED_MTIME: i64 = 1_709_287_200;

/// Formatted form of [`FIXED_MTIME`].
pub const FIXED_MTIME_TEXT: &str = "2024-03-01T10:00:00+00:00";

/// Temporary directory tree for audit tests
pub struct TestTree {
    pub temp_dir: TempDir,
}

impl TestTree {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `content` to `rel` (creating parents) and pins its mtime.
    pub fn write(&self, rel: &str, content: &str) -> Result<PathBuf> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        filetime::set_file_mtime(&path, FileTime::from_unix_time(FIXED_MTIME, 0))?;
        Ok(path)
    }

    pub fn mkdir(&self, rel: &str) -> Result<PathBuf> {
        let path = self.path().join(rel);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Raw manifest text of the directory `rel` ("" for the root).
    pub fn manifest(&self, rel: &str) -> Result<String> {
        Ok(fs::read_to_string(self.manifest_path(rel))?)
    }

    pub fn manifest_path(&self, rel: &str) -> PathBuf {
        self.path().join(rel).join(".chksum")
    }

    pub fn has_manifest(&self, rel: &str) -> bool {
        self.manifest_path(rel).exists()
    }

    /// Audits the tree with the default configuration.
    pub fn audit(&self) -> (RunSummary, Vec<String>) {
        self.audit_with(&Config::default())
    }

    pub fn audit_with(&self, config: &Config) -> (RunSummary, Vec<String>) {
        let reporter = MemoryReporter::new();
        let summary = Auditor::new(config, &reporter).run(self.path());
        (summary, reporter.lines())
    }
}

/// True when the process can read files regardless of permission bits (root).
#[cfg(unix)]
pub fn permissions_ignored(path: &Path) -> bool {
    fs::read(path).is_ok()
}
