//! Single-level directory listing.
//!
//! Reads the immediate children of one directory and partitions them into
//! what gets recorded (directory names, file names) and what the walk
//! descends into. Excluded directory names are removed here, before any
//! descent is scheduled, so they never show up in a manifest either.

use crate::FIELD_DELIMITER;
use crate::error::{AuditError, AuditResult};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// The partitioned children of one directory.
#[derive(Debug, Default)]
pub struct DirectoryListing {
    /// The listed directory.
    pub path: PathBuf,
    /// Names recorded as directory entries, including symlinks to directories.
    pub directories: Vec<String>,
    /// Names to fingerprint, including symlinks to files and broken symlinks.
    pub files: Vec<String>,
    /// Real subdirectories the walk visits next, sorted by name.
    pub descend: Vec<PathBuf>,
    /// Children whose names cannot be stored in a manifest record.
    pub rejected: Vec<RejectedName>,
}

/// A child that was listed but cannot be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedName {
    /// Full path of the child.
    pub path: PathBuf,
    /// Why its name cannot be stored.
    pub reason: &'static str,
}

/// Lists `dir`, skipping subdirectories whose name is in `excluded`.
///
/// Symlinks are classified by their target: links to directories are
/// recorded but never descended into. Sockets, FIFOs and device nodes are
/// not recorded.
///
/// # Errors
///
/// Returns [`AuditError::DirectoryListingFailed`] if `dir` cannot be read.
pub fn list_directory(dir: &Path, excluded: &BTreeSet<String>) -> AuditResult<DirectoryListing> {
    let mut listing = DirectoryListing {
        path: dir.to_path_buf(),
        ..DirectoryListing::default()
    };

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            // A partial listing would record every unlisted child as deleted.
            Err(err) => {
                return Err(AuditError::DirectoryListingFailed {
                    path: dir.to_path_buf(),
                    source: into_io_error(err),
                });
            }
        };

        let file_type = entry.file_type();
        let is_dir = if file_type.is_symlink() {
            fs::metadata(entry.path()).is_ok_and(|m| m.is_dir())
        } else {
            file_type.is_dir()
        };

        let name = match recordable_name(entry.path()) {
            Ok(name) => Some(name),
            Err(reason) => {
                listing.rejected.push(RejectedName {
                    path: entry.path().to_path_buf(),
                    reason,
                });
                None
            }
        };

        if is_dir {
            if is_excluded(entry.path(), excluded) {
                debug!("Excluding {}", entry.path().display());
                continue;
            }
            if let Some(name) = name {
                listing.directories.push(name);
            }
            if !file_type.is_symlink() {
                listing.descend.push(entry.path().to_path_buf());
            }
        } else if file_type.is_file() || file_type.is_symlink() {
            if let Some(name) = name {
                listing.files.push(name);
            }
        } else {
            debug!("Skipping special file {}", entry.path().display());
        }
    }

    Ok(listing)
}

/// Returns the child's name if it can be stored in a manifest record.
fn recordable_name(path: &Path) -> Result<String, &'static str> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("name is not valid UTF-8")?;
    if name.contains(FIELD_DELIMITER) {
        return Err("name contains the '*' field delimiter");
    }
    if name.contains(['\n', '\r']) {
        return Err("name contains a line break");
    }
    Ok(name.to_string())
}

/// Exclusion is by exact name; non-UTF-8 names are compared lossily.
fn is_excluded(path: &Path, excluded: &BTreeSet<String>) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .is_some_and(|n| excluded.contains(n.as_ref()))
}

/// Extracts the underlying I/O error of a walkdir error.
fn into_io_error(err: walkdir::Error) -> io::Error {
    err.into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"))
}
