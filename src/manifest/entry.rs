//! Entry and snapshot types.

use std::collections::BTreeMap;
use std::fmt;

/// One child of an audited directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entry {
    /// A subdirectory. It is audited on its own when the walk descends into it.
    Directory {
        /// Directory name.
        name: String,
    },
    /// A regular file (or a symlink resolved to one).
    File {
        /// File name.
        name: String,
        /// Size in bytes.
        size: u64,
        /// Last modification time, UTC, ISO-8601 with offset.
        mtime: String,
        /// Lowercase hex SHA-256 of the content.
        digest: String,
    },
}

impl Entry {
    /// Creates a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::Directory { name: name.into() }
    }

    /// Creates a file entry.
    pub fn file(
        name: impl Into<String>,
        size: u64,
        mtime: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self::File {
            name: name.into(),
            size,
            mtime: mtime.into(),
            digest: digest.into(),
        }
    }

    /// Name of the entry within its directory.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name } | Self::File { name, .. } => name,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory { name } => write!(f, "directory '{name}'"),
            Self::File {
                name,
                size,
                mtime,
                digest,
            } => write!(
                f,
                "file '{name}' (size {size}, mtime {mtime}, sha256 {digest})"
            ),
        }
    }
}

/// The entry set observed for one directory, keyed by name.
///
/// Iteration is always in lexicographic name order, which keeps manifest
/// encoding and diff output deterministic. Comparison is by content, never
/// by the order entries were observed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Entries keyed by name.
    entries: BTreeMap<String, Entry>,
}

impl Snapshot {
    /// Creates an empty snapshot (the state of a directory never audited).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Returns `true` if an entry with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Later entries replace earlier ones with the same name.
impl FromIterator<Entry> for Snapshot {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.name().to_string(), entry))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file(name: &str) -> Entry {
        Entry::file(
            name,
            2,
            "2024-01-01T00:00:00+00:00",
            "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4",
        )
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let a: Snapshot = vec![Entry::directory("sub"), sample_file("a.txt")]
            .into_iter()
            .collect();
        let b: Snapshot = vec![sample_file("a.txt"), Entry::directory("sub")]
            .into_iter()
            .collect();
        assert_eq!(a, b);
        assert_eq!(a.names().collect::<Vec<_>>(), vec!["a.txt", "sub"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Entry::directory("photos").to_string(), "directory 'photos'");
        let shown = sample_file("a.txt").to_string();
        assert!(shown.starts_with("file 'a.txt' (size 2, mtime 2024-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_type_change_is_inequality() {
        assert_ne!(Entry::directory("x"), sample_file("x"));
    }
}
