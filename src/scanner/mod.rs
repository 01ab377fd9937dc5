//! Observing the current state of a directory.
//!
//! - [`crate::scanner::listing`] - lists and partitions one directory's children
//! - [`crate::scanner::fingerprint`] - streams a file through SHA-256
//! - [`crate::scanner::snapshot`] - combines both into a [`crate::manifest::Snapshot`]

pub mod fingerprint;
pub mod listing;
pub mod snapshot;

pub use fingerprint::{FileFingerprint, Fingerprinter, Sha256Fingerprinter};
pub use listing::{DirectoryListing, list_directory};
pub use snapshot::{BuiltSnapshot, SnapshotBuilder};
