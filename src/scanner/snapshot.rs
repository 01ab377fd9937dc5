//! Builds the current snapshot of a directory from its listing.

use super::fingerprint::Fingerprinter;
use super::listing::DirectoryListing;
use crate::error::{AuditError, AuditResult, FingerprintError};
use crate::manifest::{Entry, Snapshot, codec};
use tracing::warn;

/// A freshly built snapshot and the per-entry problems met on the way.
#[derive(Debug)]
pub struct BuiltSnapshot {
    /// Entries that could be observed.
    pub snapshot: Snapshot,
    /// Recoverable problems: unreadable files and unrepresentable names.
    pub warnings: Vec<AuditError>,
}

/// Turns a [`DirectoryListing`] into a [`Snapshot`].
///
/// Files that cannot be fingerprinted are left out of the snapshot and
/// reported as warnings; against a previous manifest they show up as
/// deleted. The directory's own manifest, and staging files left behind by
/// an interrupted manifest write, are never part of its snapshot.
pub struct SnapshotBuilder<'a> {
    /// Source of file fingerprints.
    fingerprinter: &'a dyn Fingerprinter,
    /// Reserved manifest file name.
    manifest_name: &'a str,
}

impl<'a> SnapshotBuilder<'a> {
    /// Creates a builder.
    #[must_use]
    pub fn new(fingerprinter: &'a dyn Fingerprinter, manifest_name: &'a str) -> Self {
        Self {
            fingerprinter,
            manifest_name,
        }
    }

    /// Builds the snapshot for `listing`.
    ///
    /// # Errors
    ///
    /// Only fails with [`AuditError::Aborted`]; every other per-file failure
    /// degrades into a warning.
    pub fn build(&self, listing: &DirectoryListing) -> AuditResult<BuiltSnapshot> {
        let mut entries: Vec<Entry> = listing
            .directories
            .iter()
            .map(|name| Entry::directory(name.as_str()))
            .collect();
        let mut warnings: Vec<AuditError> = listing
            .rejected
            .iter()
            .map(|rejected| AuditError::UnrepresentableName {
                path: rejected.path.clone(),
                reason: rejected.reason,
            })
            .inspect(|err| warn!("{err}"))
            .collect();

        for name in &listing.files {
            if name == self.manifest_name || codec::is_staging_file(name, self.manifest_name) {
                continue;
            }
            let path = listing.path.join(name);
            match self.fingerprinter.fingerprint(&path) {
                Ok(fp) => entries.push(Entry::file(name.as_str(), fp.size, fp.mtime, fp.digest)),
                Err(FingerprintError::Aborted) => {
                    return Err(AuditError::Aborted {
                        path: listing.path.clone(),
                    });
                }
                Err(source) => {
                    let err = AuditError::FileUnreadable { path, source };
                    warn!("{err}");
                    warnings.push(err);
                }
            }
        }

        Ok(BuiltSnapshot {
            snapshot: entries.into_iter().collect(),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::fingerprint::{FileFingerprint, Sha256Fingerprinter};
    use crate::scanner::listing::{RejectedName, list_directory};
    use std::collections::BTreeSet;
    use std::fs;
    use std::io;
    use std::path::Path;
    use tempfile::tempdir;

    /// Fails for one file name, delegates the rest.
    struct DenyOne(&'static str);

    impl Fingerprinter for DenyOne {
        fn fingerprint(&self, path: &Path) -> Result<FileFingerprint, FingerprintError> {
            if path.file_name().is_some_and(|n| n == self.0) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied).into());
            }
            Sha256Fingerprinter::default().fingerprint(path)
        }
    }

    /// Always reports an abort.
    struct Aborting;

    impl Fingerprinter for Aborting {
        fn fingerprint(&self, _path: &Path) -> Result<FileFingerprint, FingerprintError> {
            Err(FingerprintError::Aborted)
        }
    }

    #[test]
    fn test_build_records_directories_and_files() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(dir.path().join("a.txt"), "hi")?;
        fs::write(dir.path().join(".chksum"), "d*sub\n")?;

        let listing = list_directory(dir.path(), &BTreeSet::new())?;
        let fingerprinter = Sha256Fingerprinter::default();
        let built = SnapshotBuilder::new(&fingerprinter, ".chksum").build(&listing)?;

        assert!(built.warnings.is_empty());
        assert_eq!(built.snapshot.names().collect::<Vec<_>>(), vec!["a.txt", "sub"]);
        assert_eq!(built.snapshot.get("sub"), Some(&Entry::directory("sub")));
        match built.snapshot.get("a.txt") {
            Some(Entry::File { size, digest, .. }) => {
                assert_eq!(*size, 2);
                assert_eq!(
                    digest,
                    "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4"
                );
            }
            other => panic!("expected file entry, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_leftover_staging_file_is_not_recorded() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join(".chksum"), "")?;
        fs::write(dir.path().join(".chksum.Xy12ab.tmp"), "f*a*1*t*ab\n")?;
        fs::write(dir.path().join("a.txt"), "hi")?;

        let listing = list_directory(dir.path(), &BTreeSet::new())?;
        let fingerprinter = Sha256Fingerprinter::default();
        let built = SnapshotBuilder::new(&fingerprinter, ".chksum").build(&listing)?;

        assert_eq!(built.snapshot.names().collect::<Vec<_>>(), vec!["a.txt"]);
        Ok(())
    }

    #[test]
    fn test_unreadable_file_is_omitted_with_warning() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("locked.bin"), "secret")?;
        fs::write(dir.path().join("open.txt"), "hi")?;

        let listing = list_directory(dir.path(), &BTreeSet::new())?;
        let fingerprinter = DenyOne("locked.bin");
        let built = SnapshotBuilder::new(&fingerprinter, ".chksum").build(&listing)?;

        assert_eq!(built.snapshot.names().collect::<Vec<_>>(), vec!["open.txt"]);
        assert_eq!(built.warnings.len(), 1);
        match &built.warnings[0] {
            AuditError::FileUnreadable { path, source } => {
                assert_eq!(path, &dir.path().join("locked.bin"));
                assert!(matches!(source, FingerprintError::AccessDenied(_)));
            }
            other => panic!("unexpected warning {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_rejected_names_become_warnings() {
        let listing = DirectoryListing {
            path: "/data".into(),
            rejected: vec![RejectedName {
                path: "/data/a*b".into(),
                reason: "name contains the '*' field delimiter",
            }],
            ..DirectoryListing::default()
        };
        let fingerprinter = Sha256Fingerprinter::default();
        let built = SnapshotBuilder::new(&fingerprinter, ".chksum")
            .build(&listing)
            .unwrap();

        assert!(built.snapshot.is_empty());
        assert!(matches!(
            built.warnings.as_slice(),
            [AuditError::UnrepresentableName { .. }]
        ));
    }

    #[test]
    fn test_abort_fails_the_whole_build() {
        let listing = DirectoryListing {
            path: "/data".into(),
            files: vec!["a.txt".to_string()],
            ..DirectoryListing::default()
        };
        let result = SnapshotBuilder::new(&Aborting, ".chksum").build(&listing);
        assert!(matches!(result, Err(AuditError::Aborted { .. })));
    }
}
