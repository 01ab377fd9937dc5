//! Line-oriented manifest codec.
//!
//! A manifest holds one record per line, fields separated by `*`:
//!
//! ```text
//! d*<name>
//! f*<name>*<size>*<mtime>*<sha256>
//! ```
//!
//! Lines end with `\n`; a trailing `\r` is tolerated on read so manifests
//! written on other platforms decode the same. Records are encoded in name
//! order, so an unchanged snapshot always encodes to identical bytes.

use super::entry::{Entry, Snapshot};
use crate::FIELD_DELIMITER;
use crate::audit::AbortHandle;
use crate::error::{AuditError, AuditResult};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;

/// Type tag of directory records.
pub const DIRECTORY_TAG: &str = "d";

/// Type tag of file records.
pub const FILE_TAG: &str = "f";

/// Encodes a snapshot as manifest text.
#[must_use]
pub fn encode(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for entry in snapshot.entries() {
        out.push_str(&encode_entry(entry));
        out.push('\n');
    }
    out
}

/// Encodes a single record without line terminator.
#[must_use]
pub fn encode_entry(entry: &Entry) -> String {
    match entry {
        Entry::Directory { name } => format!("{DIRECTORY_TAG}{FIELD_DELIMITER}{name}"),
        Entry::File {
            name,
            size,
            mtime,
            digest,
        } => format!(
            "{FILE_TAG}{d}{name}{d}{size}{d}{mtime}{d}{digest}",
            d = FIELD_DELIMITER
        ),
    }
}

/// Decodes manifest text.
///
/// # Errors
///
/// Returns [`AuditError::ManifestCorrupt`] (with an empty path) for the first
/// malformed record: unknown type tag, wrong field count, unparsable size,
/// malformed digest, empty name, or a name recorded twice.
pub fn decode(text: &str) -> AuditResult<Snapshot> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    let mut lines = text.split('\n').enumerate().peekable();

    while let Some((index, raw)) = lines.next() {
        // The piece after the final terminator is not a record.
        if raw.is_empty() && lines.peek().is_none() {
            break;
        }
        let line_no = index + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let entry = decode_line(line).map_err(|reason| corrupt(line_no, reason))?;
        if !seen.insert(entry.name().to_string()) {
            return Err(corrupt(
                line_no,
                format!("name '{}' recorded more than once", entry.name()),
            ));
        }
        entries.push(entry);
    }

    Ok(entries.into_iter().collect())
}

/// Decodes a single record.
fn decode_line(line: &str) -> Result<Entry, String> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();

    match fields[0] {
        DIRECTORY_TAG => {
            if fields.len() != 2 {
                return Err(format!(
                    "directory record has {} fields, expected 2",
                    fields.len()
                ));
            }
            Ok(Entry::directory(non_empty_name(fields[1])?))
        }
        FILE_TAG => {
            if fields.len() != 5 {
                return Err(format!(
                    "file record has {} fields, expected 5",
                    fields.len()
                ));
            }
            let size = fields[2]
                .parse::<u64>()
                .map_err(|e| format!("invalid size '{}': {e}", fields[2]))?;
            if fields[3].is_empty() {
                return Err("empty modification time".to_string());
            }
            if !is_hex_digest(fields[4]) {
                return Err(format!("invalid digest '{}'", fields[4]));
            }
            Ok(Entry::file(
                non_empty_name(fields[1])?,
                size,
                fields[3],
                fields[4],
            ))
        }
        other => Err(format!("Unsupported content type '{other}'")),
    }
}

/// Rejects empty names.
fn non_empty_name(name: &str) -> Result<&str, String> {
    if name.is_empty() {
        Err("empty name".to_string())
    } else {
        Ok(name)
    }
}

/// Lowercase hexadecimal, non-empty.
fn is_hex_digest(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Builds a corruption error without a path; callers attach it.
fn corrupt(line: usize, reason: String) -> AuditError {
    AuditError::ManifestCorrupt {
        path: PathBuf::new(),
        line,
        reason,
    }
}

/// Reads and decodes the manifest at `path`.
///
/// A missing manifest is the state of a directory that was never audited
/// and yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`AuditError::ManifestUnreadable`] if the file exists but cannot
/// be read as UTF-8 text, and [`AuditError::ManifestCorrupt`] if a record is
/// malformed.
pub fn read_manifest(path: &Path) -> AuditResult<Option<Snapshot>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AuditError::ManifestUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    decode(&text)
        .map(Some)
        .map_err(|e| e.with_manifest_path(path.to_path_buf()))
}

/// Suffix of the temporary file a manifest is staged in.
const TEMP_SUFFIX: &str = ".tmp";

/// Returns `true` for `<manifest_name>.<random>.tmp`, the name a manifest is
/// staged under before the rename. Such a file only outlives a run that was
/// killed mid-write and is never recorded.
#[must_use]
pub fn is_staging_file(name: &str, manifest_name: &str) -> bool {
    name.strip_prefix(manifest_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|rest| rest.len() > TEMP_SUFFIX.len() && rest.ends_with(TEMP_SUFFIX))
}

/// Replaces the manifest at `path` with the encoding of `snapshot`.
///
/// The content goes to a temporary file in the same directory, is synced,
/// and is then renamed over the old manifest. A replaced manifest keeps its
/// permissions; a new one gets the default mode for new files. On any
/// failure, including an abort raised before the rename, the previous
/// manifest is left as it was and the temporary file is removed.
///
/// # Errors
///
/// Returns [`AuditError::ManifestWriteFailed`] on I/O failure and
/// [`AuditError::Aborted`] if `abort` was raised.
pub fn write_manifest(path: &Path, snapshot: &Snapshot, abort: &AbortHandle) -> AuditResult<()> {
    let write_failed = |source: io::Error| AuditError::ManifestWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        "{}.",
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    let previous = fs::metadata(path).ok().filter(fs::Metadata::is_file);

    let mut builder = Builder::new();
    builder.prefix(&prefix).suffix(TEMP_SUFFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Masked by the umask like any newly created file.
        builder.permissions(fs::Permissions::from_mode(0o666));
    }

    let mut tmp = builder.tempfile_in(dir).map_err(write_failed)?;
    tmp.write_all(encode(snapshot).as_bytes())
        .map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    if let Some(previous) = previous {
        fs::set_permissions(tmp.path(), previous.permissions()).map_err(write_failed)?;
    }

    if abort.is_aborted() {
        return Err(AuditError::Aborted {
            path: dir.to_path_buf(),
        });
    }

    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}
