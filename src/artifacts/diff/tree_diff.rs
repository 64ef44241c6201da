//! File-level tree diff
//!
//! Compares two flattened directory snapshots path by path and records, per
//! path, whether a file was added, deleted, or modified. Snapshots come from
//! the index (`Index::flatten`) or a stored tree walk
//! (`Database::flatten_tree`), so the comparison itself never touches the
//! store. Rename detection is out of scope; paths are compared by name only.

use crate::artifacts::database::database_entry::DatabaseEntry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A change to a single path between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Added(DatabaseEntry),
    Deleted(DatabaseEntry),
    Modified {
        old: DatabaseEntry,
        new: DatabaseEntry,
    },
}

impl TreeChange {
    pub fn from_entries(old: Option<DatabaseEntry>, new: Option<DatabaseEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChange::Added(new)),
            (Some(old), None) => Some(TreeChange::Deleted(old)),
            (Some(old), Some(new)) if old != new => Some(TreeChange::Modified { old, new }),
            _ => None,
        }
    }

    pub fn old_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChange::Deleted(entry) => Some(entry),
            TreeChange::Modified { old, .. } => Some(old),
            TreeChange::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChange::Added(entry) => Some(entry),
            TreeChange::Modified { new, .. } => Some(new),
            TreeChange::Deleted(_) => None,
        }
    }

    pub fn status_char(&self) -> char {
        match self {
            TreeChange::Added(_) => 'A',
            TreeChange::Deleted(_) => 'D',
            TreeChange::Modified { .. } => 'M',
        }
    }
}

/// Changes keyed by path, in path order.
pub type ChangeSet = BTreeMap<PathBuf, TreeChange>;

/// Compare two flattened snapshots (path → entry) over the union of their
/// paths.
pub fn diff_flat(
    old: &BTreeMap<PathBuf, DatabaseEntry>,
    new: &BTreeMap<PathBuf, DatabaseEntry>,
) -> ChangeSet {
    let mut changes = ChangeSet::new();

    let paths: BTreeSet<&PathBuf> = old.keys().chain(new.keys()).collect();
    for path in paths {
        if let Some(change) = TreeChange::from_entries(old.get(path).cloned(), new.get(path).cloned())
        {
            changes.insert(path.clone(), change);
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
    use crate::artifacts::objects::object_id::ObjectId;
    use pretty_assertions::assert_eq;

    fn entry(fill: &str) -> DatabaseEntry {
        DatabaseEntry::new(
            ObjectId::try_parse(fill.repeat(20)).unwrap(),
            EntryMode::File(FileMode::Regular),
        )
    }

    fn snapshot(entries: &[(&str, DatabaseEntry)]) -> BTreeMap<PathBuf, DatabaseEntry> {
        entries
            .iter()
            .map(|(path, entry)| (PathBuf::from(path), entry.clone()))
            .collect()
    }

    #[test]
    fn classifies_additions_deletions_and_modifications() {
        let old = snapshot(&[("kept.txt", entry("aa")), ("gone.txt", entry("bb")), ("edit.txt", entry("cc"))]);
        let new = snapshot(&[("kept.txt", entry("aa")), ("edit.txt", entry("dd")), ("new.txt", entry("ee"))]);

        let changes = diff_flat(&old, &new);

        assert_eq!(changes.len(), 3);
        assert_eq!(changes[&PathBuf::from("gone.txt")].status_char(), 'D');
        assert_eq!(changes[&PathBuf::from("new.txt")].status_char(), 'A');
        assert_eq!(changes[&PathBuf::from("edit.txt")].status_char(), 'M');
        assert!(!changes.contains_key(&PathBuf::from("kept.txt")));
    }

    #[test]
    fn a_mode_change_alone_is_a_modification() {
        let regular = entry("aa");
        let executable = DatabaseEntry::new(regular.oid.clone(), EntryMode::File(FileMode::Executable));

        let changes = diff_flat(
            &snapshot(&[("run.sh", regular.clone())]),
            &snapshot(&[("run.sh", executable.clone())]),
        );

        assert_eq!(
            changes[&PathBuf::from("run.sh")],
            TreeChange::Modified {
                old: regular,
                new: executable
            }
        );
    }

    #[test]
    fn identical_snapshots_produce_no_changes() {
        let snap = snapshot(&[("a.txt", entry("aa")), ("d/b.txt", entry("bb"))]);

        assert!(diff_flat(&snap, &snap).is_empty());
    }

    #[test]
    fn old_and_new_entry_accessors_match_the_change_kind() {
        let added = TreeChange::Added(entry("aa"));
        assert!(added.old_entry().is_none());
        assert!(added.new_entry().is_some());

        let deleted = TreeChange::Deleted(entry("bb"));
        assert!(deleted.old_entry().is_some());
        assert!(deleted.new_entry().is_none());
    }
}
