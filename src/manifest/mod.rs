//! Per-directory manifests.
//!
//! Every audited directory owns one manifest file holding the snapshot of
//! its immediate children as observed by the last run that changed it.
//!
//! - [`crate::manifest::Entry`] / [`crate::manifest::Snapshot`] - in-memory model
//! - [`crate::manifest::codec`] - text encoding plus atomic load/store
//!
//! # Usage
//!
//! ```no_run
//! use chksum::audit::AbortHandle;
//! use chksum::manifest::{Entry, Snapshot, codec};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let snapshot: Snapshot = vec![Entry::directory("photos")].into_iter().collect();
//! let path = Path::new("/mnt/archive/.chksum");
//! codec::write_manifest(path, &snapshot, &AbortHandle::new())?;
//! assert_eq!(codec::read_manifest(path)?, Some(snapshot));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod entry;

pub use entry::{Entry, Snapshot};
