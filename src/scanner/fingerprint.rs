//! Streaming SHA-256 file fingerprints.

use crate::DEFAULT_CHUNK_SIZE;
use crate::audit::AbortHandle;
use crate::error::FingerprintError;
use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::SystemTime;

/// Content digest plus the metadata recorded for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    /// Size in bytes from the same stat call as `mtime`.
    pub size: u64,
    /// Modification time, see [`format_mtime`].
    pub mtime: String,
    /// Lowercase hex SHA-256.
    pub digest: String,
}

/// Computes fingerprints for files.
///
/// The snapshot builder only depends on this trait, so tests and callers
/// can substitute their own source of fingerprints.
pub trait Fingerprinter: Send + Sync {
    /// Fingerprints the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError`] when the file vanished, is not
    /// accessible, cannot be read, or the run was aborted.
    fn fingerprint(&self, path: &Path) -> Result<FileFingerprint, FingerprintError>;
}

/// Reads files in fixed-size chunks through SHA-256, so memory use is
/// bounded by the chunk size and not by the file size.
#[derive(Debug, Clone)]
pub struct Sha256Fingerprinter {
    /// Read buffer size.
    chunk_size: usize,
    /// Checked between chunks.
    abort: AbortHandle,
}

impl Sha256Fingerprinter {
    /// Creates a fingerprinter with the given chunk size (clamped to at least one byte).
    #[must_use]
    pub fn new(chunk_size: usize, abort: AbortHandle) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            abort,
        }
    }
}

impl Default for Sha256Fingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, AbortHandle::new())
    }
}

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<FileFingerprint, FingerprintError> {
        let mut file = File::open(path)?;
        let metadata = file.metadata()?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            if self.abort.is_aborted() {
                return Err(FingerprintError::Aborted);
            }
            let bytes_read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(FileFingerprint {
            size: metadata.len(),
            mtime: format_mtime(metadata.modified()?),
            digest: format!("{:x}", hasher.finalize()),
        })
    }
}

/// Formats a modification time as UTC ISO-8601 with an explicit `+00:00`
/// offset and microsecond precision. The fraction is omitted when it is
/// zero, e.g. `2024-03-01T10:00:00+00:00` or `2024-03-01T10:00:00.250000+00:00`.
///
/// Sub-microsecond remainders round half to even, carrying into the seconds.
#[must_use]
pub fn format_mtime(time: SystemTime) -> String {
    let utc = round_to_micros(time.into());
    if utc.timestamp_subsec_micros() == 0 {
        utc.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
    } else {
        utc.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
    }
}

/// Rounds to the nearest microsecond, ties to even.
fn round_to_micros(time: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = time.timestamp_subsec_nanos();
    let (mut micros, rest) = (nanos / 1_000, nanos % 1_000);
    if rest > 500 || (rest == 500 && micros % 2 == 1) {
        micros += 1;
    }
    time - TimeDelta::nanoseconds(i64::from(nanos)) + TimeDelta::microseconds(i64::from(micros))
}
