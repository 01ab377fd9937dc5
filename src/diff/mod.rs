//! Snapshot comparison.
//!
//! Both snapshots are name-keyed, so every name of `past ∪ current` falls
//! into exactly one of: added, deleted, changed, unchanged. A name whose
//! entry switched between file and directory counts as changed, not as a
//! deletion plus an addition.

use crate::manifest::{Entry, Snapshot};

/// Classified differences between two snapshots of the same directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Entries only present in the current snapshot, by name.
    pub added: Vec<Entry>,
    /// Entries only present in the past snapshot, by name.
    pub deleted: Vec<Entry>,
    /// `(old, new)` pairs for names whose entry differs in any field, by name.
    pub changed: Vec<(Entry, Entry)>,
    /// Number of names whose entry is identical in both snapshots.
    pub unchanged: usize,
}

impl SnapshotDiff {
    /// Returns `true` if nothing was added, deleted or changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }

    /// Number of reported differences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len() + self.changed.len()
    }
}

/// Compares `past` (from the manifest) against `current` (freshly built).
#[must_use]
pub fn diff(past: &Snapshot, current: &Snapshot) -> SnapshotDiff {
    let mut result = SnapshotDiff::default();

    // Snapshot iteration is name ordered, so every list comes out sorted.
    for entry in current.entries() {
        match past.get(entry.name()) {
            None => result.added.push(entry.clone()),
            Some(old) if old != entry => result.changed.push((old.clone(), entry.clone())),
            Some(_) => result.unchanged += 1,
        }
    }
    result.deleted = past
        .entries()
        .filter(|entry| !current.contains(entry.name()))
        .cloned()
        .collect();

    result
}
