//! Error taxonomy for the audit pipeline.
//!
//! Each component returns an explicit error kind so that the orchestrator can
//! decide how far a failure reaches:
//!
//! | Error | Scope of the failure |
//! |---|---|
//! | [`FingerprintError`] / [`AuditError::FileUnreadable`] | one entry, omitted from the snapshot |
//! | [`AuditError::ManifestCorrupt`] / [`AuditError::ManifestUnreadable`] | one directory, audit aborted |
//! | [`AuditError::ManifestWriteFailed`] | one directory, marked failed, stale manifest kept |
//! | [`AuditError::DirectoryListingFailed`] | one directory subtree, skipped |

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to fingerprint a single file.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The file disappeared between listing and read.
    #[error("file not found: {0}")]
    NotFound(io::Error),

    /// Permission or locking failure.
    #[error("access denied: {0}")]
    AccessDenied(io::Error),

    /// Any other read or stat failure.
    #[error("{0}")]
    Io(io::Error),

    /// The run was aborted while the file was being read.
    #[error("aborted")]
    Aborted,
}

impl From<io::Error> for FingerprintError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(err),
            io::ErrorKind::PermissionDenied => Self::AccessDenied(err),
            _ => Self::Io(err),
        }
    }
}

/// Errors raised while auditing one directory.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A file could not be fingerprinted; the entry is left out of the snapshot.
    #[error("Unable to read {}: {source}", path.display())]
    FileUnreadable {
        /// Offending file.
        path: PathBuf,
        /// Underlying reason.
        #[source]
        source: FingerprintError,
    },

    /// A name that cannot be stored in a manifest record.
    #[error("Unable to record {}: {reason}", path.display())]
    UnrepresentableName {
        /// Offending entry.
        path: PathBuf,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// The manifest exists but one of its records is malformed.
    #[error("Corrupt manifest {} at line {line}: {reason}", path.display())]
    ManifestCorrupt {
        /// Manifest path, or empty when decoding in memory.
        path: PathBuf,
        /// One-based line number of the bad record.
        line: usize,
        /// Description of the problem.
        reason: String,
    },

    /// The manifest exists but could not be read.
    #[error("Unable to read checksum file {}: {source}", path.display())]
    ManifestUnreadable {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The new manifest could not be persisted; the previous one is untouched.
    #[error("Unable to write checksum file {}: {source}", path.display())]
    ManifestWriteFailed {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The directory's children could not be listed.
    #[error("Unable to list directory {}: {source}", path.display())]
    DirectoryListingFailed {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The run was aborted before the directory's manifest was committed.
    #[error("Audit of {} aborted", path.display())]
    Aborted {
        /// Directory path.
        path: PathBuf,
    },
}

impl AuditError {
    /// Attaches a manifest path to a corruption error produced by in-memory decoding.
    #[must_use]
    pub fn with_manifest_path(self, manifest: PathBuf) -> Self {
        match self {
            Self::ManifestCorrupt { line, reason, .. } => Self::ManifestCorrupt {
                path: manifest,
                line,
                reason,
            },
            other => other,
        }
    }
}

/// Result alias for audit operations.
pub type AuditResult<T> = std::result::Result<T, AuditError>;
