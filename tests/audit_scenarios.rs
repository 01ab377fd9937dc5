mod common;

use anyhow::Result;
use chksum::audit::Auditor;
use chksum::config::Config;
use chksum::error::FingerprintError;
use chksum::output::MemoryReporter;
use chksum::scanner::{FileFingerprint, Fingerprinter, Sha256Fingerprinter};
use common::{FIXED_MTIME_TEXT, HELLO_DIGEST, HI_DIGEST, TestTree};
use std::fs;
use std::io;
use std::path::Path;

/// Denies access to one file name and fingerprints everything else normally.
struct Deny(&'static str);

impl Fingerprinter for Deny {
    fn fingerprint(&self, path: &Path) -> Result<FileFingerprint, FingerprintError> {
        if path.file_name().is_some_and(|n| n == self.0) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied).into());
        }
        Sha256Fingerprinter::default().fingerprint(path)
    }
}

#[test]
fn test_empty_directory_gets_empty_manifest() -> Result<()> {
    let tree = TestTree::new()?;

    let (summary, lines) = tree.audit();

    assert_eq!(tree.manifest("")?, "");
    assert!(lines.is_empty());
    assert_eq!(summary.updated, 1);
    assert!(summary.succeeded());
    Ok(())
}

#[test]
fn test_first_audit_records_file() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a.txt", "hi")?;

    let (summary, lines) = tree.audit();

    assert_eq!(
        tree.manifest("")?,
        format!("f*a.txt*2*{FIXED_MTIME_TEXT}*{HI_DIGEST}\n")
    );
    assert_eq!(
        lines,
        vec![format!(
            "{}: Added: file 'a.txt' (size 2, mtime {FIXED_MTIME_TEXT}, sha256 {HI_DIGEST})",
            tree.path().display()
        )]
    );
    assert_eq!(summary.added, 1);
    Ok(())
}

#[test]
fn test_modified_file_is_changed() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a.txt", "hi")?;
    tree.audit();

    tree.write("a.txt", "hello")?;
    let (summary, lines) = tree.audit();

    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Changed: file 'a.txt' (size 2,"));
    assert!(lines[0].contains(HI_DIGEST));
    assert!(lines[0].ends_with(&format!(
        "->   file 'a.txt' (size 5, mtime {FIXED_MTIME_TEXT}, sha256 {HELLO_DIGEST})"
    )));
    assert_eq!(summary.changed, 1);
    assert_eq!(summary.updated, 1);
    assert!(tree.manifest("")?.contains(HELLO_DIGEST));
    Ok(())
}

#[test]
fn test_deleted_file_is_reported_and_dropped() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a.txt", "hi")?;
    let b = tree.write("b.txt", "hello")?;
    tree.audit();

    fs::remove_file(b)?;
    let (summary, lines) = tree.audit();

    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Deleted: file 'b.txt'"));
    assert_eq!(summary.deleted, 1);
    assert!(!tree.manifest("")?.contains("b.txt"));
    Ok(())
}

#[test]
fn test_unreadable_file_is_deleted_with_warning() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a.txt", "hi")?;
    tree.write("locked.bin", "secret")?;
    tree.audit();

    let reporter = MemoryReporter::new();
    let summary = Auditor::new(&Config::default(), &reporter)
        .with_fingerprinter(Box::new(Deny("locked.bin")))
        .run(tree.path());
    let lines = reporter.lines();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(&format!(
        "Unable to read {}",
        tree.path().join("locked.bin").display()
    )));
    assert!(lines[1].contains("Deleted: file 'locked.bin'"));
    assert_eq!(summary.warnings, 1);
    assert!(!tree.manifest("")?.contains("locked.bin"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_permission_denied_file() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let tree = TestTree::new()?;
    let locked = tree.write("locked.bin", "secret")?;
    tree.audit();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;
    if common::permissions_ignored(&locked) {
        return Ok(());
    }
    let (summary, lines) = tree.audit();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644))?;

    assert_eq!(summary.warnings, 1);
    assert!(lines[0].contains("access denied"));
    assert!(lines[1].contains("Deleted: file 'locked.bin'"));
    Ok(())
}

#[test]
fn test_second_audit_is_idempotent() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a.txt", "hi")?;
    tree.write("sub/b.txt", "hello")?;
    tree.mkdir("sub/empty")?;

    let (first, _) = tree.audit();
    assert_eq!(first.updated, 3);
    let root_before = tree.manifest("")?;
    let sub_before = tree.manifest("sub")?;

    let (second, lines) = tree.audit();

    assert!(lines.is_empty());
    assert_eq!(second.unchanged, 3);
    assert_eq!(second.updated, 0);
    assert_eq!(tree.manifest("")?, root_before);
    assert_eq!(tree.manifest("sub")?, sub_before);
    Ok(())
}

#[test]
fn test_nested_manifests_record_subdirectories() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a.txt", "hi")?;
    tree.write("sub/b.txt", "hello")?;

    tree.audit();

    assert_eq!(
        tree.manifest("")?,
        format!("f*a.txt*2*{FIXED_MTIME_TEXT}*{HI_DIGEST}\nd*sub\n")
    );
    assert_eq!(
        tree.manifest("sub")?,
        format!("f*b.txt*5*{FIXED_MTIME_TEXT}*{HELLO_DIGEST}\n")
    );
    Ok(())
}

#[test]
fn test_file_replaced_by_directory_is_changed() -> Result<()> {
    let tree = TestTree::new()?;
    let item = tree.write("item", "hi")?;
    tree.audit();

    fs::remove_file(&item)?;
    fs::create_dir(&item)?;
    let (summary, lines) = tree.audit();

    assert_eq!(summary.changed, 1);
    assert!(lines[0].contains("Changed: file 'item'"));
    assert!(lines[0].ends_with("->   directory 'item'"));
    Ok(())
}

#[test]
fn test_default_exclusions_are_not_visited() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("System Volume Information/meta.dat", "x")?;
    tree.write("keep/a.txt", "hi")?;

    tree.audit();

    assert_eq!(tree.manifest("")?, "d*keep\n");
    assert!(!tree.has_manifest("System Volume Information"));
    assert!(tree.has_manifest("keep"));
    Ok(())
}

#[test]
fn test_custom_exclusion_set() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("node_modules/pkg.js", "x")?;
    tree.write("Recovery/a.txt", "hi")?;

    let mut config = Config::default();
    config.audit.excluded_dirs = vec!["node_modules".to_string()];
    tree.audit_with(&config);

    assert_eq!(tree.manifest("")?, "d*Recovery\n");
    assert!(tree.has_manifest("Recovery"));
    assert!(!tree.has_manifest("node_modules"));
    Ok(())
}

#[test]
fn test_corrupt_manifest_fails_only_that_directory() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("bad/a.txt", "hi")?;
    tree.write("bad/inner/b.txt", "hello")?;
    tree.write("good/a.txt", "hi")?;
    fs::write(tree.manifest_path("bad"), "x*mystery\n")?;

    let (summary, lines) = tree.audit();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 3);
    assert_eq!(tree.manifest("bad")?, "x*mystery\n");
    assert!(tree.has_manifest("bad/inner"));
    assert!(tree.has_manifest("good"));
    let error = lines
        .iter()
        .find(|line| line.contains("Error:"))
        .expect("error line");
    assert!(error.contains("Corrupt manifest"));
    assert!(error.contains("at line 1"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_write_failure_keeps_walking() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let tree = TestTree::new()?;
    let locked = tree.mkdir("locked")?;
    tree.write("locked/a.txt", "hi")?;
    tree.write("open/a.txt", "hi")?;

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555))?;
    let marker = locked.join(".writable");
    let writable = fs::write(&marker, "").is_ok();
    let _ = fs::remove_file(&marker);
    if writable {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
        return Ok(());
    }

    let (summary, lines) = tree.audit();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 2);
    assert!(!tree.has_manifest("locked"));
    assert!(tree.has_manifest("open"));
    assert!(lines.iter().any(|l| l.contains("Unable to write checksum file")));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_unlistable_directory_is_skipped() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let tree = TestTree::new()?;
    let sealed = tree.mkdir("sealed")?;
    tree.write("sealed/a.txt", "hi")?;
    tree.write("open/a.txt", "hi")?;

    fs::set_permissions(&sealed, fs::Permissions::from_mode(0o000))?;
    if fs::read_dir(&sealed).is_ok() {
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755))?;
        return Ok(());
    }

    let (summary, lines) = tree.audit();
    fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755))?;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.updated, 2);
    assert!(summary.succeeded());
    assert!(tree.has_manifest("open"));
    assert!(!tree.has_manifest("sealed"));
    assert_eq!(tree.manifest("")?, "d*open\nd*sealed\n");
    assert!(lines.iter().any(|l| l.contains(&format!(
        "Error: Unable to list directory {}",
        sealed.display()
    ))));
    Ok(())
}

#[test]
fn test_custom_manifest_name() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a.txt", "hi")?;

    let mut config = Config::default();
    config.audit.manifest_name = ".sums".to_string();
    tree.audit_with(&config);
    let (summary, lines) = tree.audit_with(&config);

    assert!(tree.path().join(".sums").exists());
    assert!(!tree.has_manifest(""));
    assert!(lines.is_empty());
    assert_eq!(summary.unchanged, 1);
    Ok(())
}

#[test]
fn test_parallel_matches_sequential() -> Result<()> {
    let sequential = TestTree::new()?;
    let parallel = TestTree::new()?;
    for tree in [&sequential, &parallel] {
        for i in 0..6 {
            tree.write(&format!("d{i}/f.txt"), "hi")?;
            tree.write(&format!("d{i}/nested/g.txt"), "hello")?;
        }
    }

    let (seq_summary, _) = sequential.audit();
    let mut config = Config::default();
    config.performance.parallel = true;
    config.performance.threads = 3;
    let (par_summary, lines) = parallel.audit_with(&config);

    assert_eq!(seq_summary, par_summary);
    assert_eq!(par_summary.updated, 13);
    // Six directory lines at the root, two per d<i>, one per nested.
    assert_eq!(lines.len(), 6 + 12 + 6);
    for i in 0..6 {
        assert_eq!(
            sequential.manifest(&format!("d{i}"))?,
            parallel.manifest(&format!("d{i}"))?
        );
    }
    Ok(())
}
