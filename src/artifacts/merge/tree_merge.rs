//! Path-level three-way merge
//!
//! Combines two trees against their merge base, path by path. One-sided
//! changes apply directly; both-sides changes fall through to the line-level
//! merge, and unresolvable combinations are collected as conflicts together
//! with their marker-rendered content.

use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::merge::three_way::merge_lines;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

/// Why a path could not be merged automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both sides changed the content in different ways.
    Content,
    /// One side deleted, the other modified; the modification is kept.
    DeleteModify,
    /// Both sides added different content.
    AddAdd,
}

impl ConflictKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ConflictKind::Content => "content",
            ConflictKind::DeleteModify => "delete/modify",
            ConflictKind::AddAdd => "add/add",
        }
    }
}

/// A path the merge could not resolve.
#[derive(Debug, Clone)]
pub struct MergeConflictEntry {
    pub path: PathBuf,
    pub kind: ConflictKind,
    /// Marker-rendered content to place in the working tree, when the
    /// conflict has textual form.
    pub working_text: Option<String>,
}

/// Result of merging two trees against a base.
#[derive(Debug, Default)]
pub struct TreeMergeOutcome {
    /// The merged snapshot; for conflicted paths this holds the entry that
    /// stays staged (ours, or the surviving side of a delete/modify).
    pub entries: BTreeMap<PathBuf, DatabaseEntry>,
    pub conflicts: Vec<MergeConflictEntry>,
}

impl TreeMergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Store a flattened snapshot as trees, bottom-up, returning the root id.
pub fn write_tree(
    database: &Database,
    entries: &BTreeMap<PathBuf, DatabaseEntry>,
) -> anyhow::Result<ObjectId> {
    use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
    use crate::artifacts::objects::tree::Tree;

    let index_entries: Vec<IndexEntry> = entries
        .iter()
        .map(|(path, entry)| {
            IndexEntry::new(
                path.clone(),
                entry.oid.clone(),
                EntryMetadata {
                    mode: entry.mode,
                    ..Default::default()
                },
            )
        })
        .collect();

    let root = Tree::build(index_entries.iter())?;
    root.traverse(&|tree| {
        database.store(tree)?;
        Ok(())
    })?;

    root.object_id()
}

pub struct TreeMerger<'d> {
    database: &'d Database,
    theirs_label: String,
}

impl<'d> TreeMerger<'d> {
    pub fn new(database: &'d Database, theirs_label: String) -> Self {
        Self {
            database,
            theirs_label,
        }
    }

    /// Merge flattened snapshots of base, ours and theirs.
    ///
    /// Cleanly merged content produces new blobs in the store; conflicted
    /// paths carry their marker text for the working tree instead.
    pub fn merge(
        &self,
        base: &BTreeMap<PathBuf, DatabaseEntry>,
        ours: &BTreeMap<PathBuf, DatabaseEntry>,
        theirs: &BTreeMap<PathBuf, DatabaseEntry>,
    ) -> anyhow::Result<TreeMergeOutcome> {
        let mut outcome = TreeMergeOutcome {
            entries: ours.clone(),
            conflicts: Vec::new(),
        };

        let paths: BTreeSet<&PathBuf> = base
            .keys()
            .chain(ours.keys())
            .chain(theirs.keys())
            .collect();

        for path in paths {
            let base_entry = base.get(path);
            let our_entry = ours.get(path);
            let their_entry = theirs.get(path);

            match (base_entry, our_entry, their_entry) {
                // untouched or identically changed on both sides
                (_, o, t) if o == t => {}

                // only theirs changed relative to base
                (b, o, Some(t)) if b == o => {
                    outcome.entries.insert(path.clone(), t.clone());
                }
                (b, o, None) if b == o => {
                    outcome.entries.remove(path);
                }

                // only ours changed relative to base: ours is already in place
                (b, _, t) if b == t => {}

                // deleted on one side, modified on the other
                (Some(_), Some(kept), None) => {
                    debug!(path = %path.display(), "delete/modify conflict, keeping ours");
                    outcome
                        .conflicts
                        .push(self.delete_modify_conflict(path, kept)?);
                }
                (Some(_), None, Some(kept)) => {
                    debug!(path = %path.display(), "delete/modify conflict, keeping theirs");
                    outcome.entries.insert(path.clone(), kept.clone());
                    outcome
                        .conflicts
                        .push(self.delete_modify_conflict(path, kept)?);
                }

                // added on both sides with different content
                (None, Some(o), Some(t)) => {
                    self.merge_file(path, None, o, t, ConflictKind::AddAdd, &mut outcome)?;
                }

                // changed on both sides with different content
                (Some(b), Some(o), Some(t)) => {
                    self.merge_file(path, Some(b), o, t, ConflictKind::Content, &mut outcome)?;
                }

                // ours-only addition: already staged
                (None, Some(_), None) => {}

                // theirs-only addition
                (None, None, Some(t)) => {
                    outcome.entries.insert(path.clone(), t.clone());
                }

                // cannot occur: both sides absent is covered by `o == t`
                (_, None, None) => unreachable!("path listed without any entry"),
            }
        }

        Ok(outcome)
    }

    fn merge_file(
        &self,
        path: &PathBuf,
        base: Option<&DatabaseEntry>,
        ours: &DatabaseEntry,
        theirs: &DatabaseEntry,
        kind: ConflictKind,
        outcome: &mut TreeMergeOutcome,
    ) -> anyhow::Result<()> {
        let base_lines = match base {
            Some(entry) => self.blob_lines(&entry.oid)?,
            None => Vec::new(),
        };
        let our_lines = self.blob_lines(&ours.oid)?;
        let their_lines = self.blob_lines(&theirs.oid)?;

        let result = merge_lines(&base_lines, &our_lines, &their_lines, &self.theirs_label);

        // the mode follows whichever side changed it
        let mode = if base.map(|b| b.mode) == Some(ours.mode) {
            theirs.mode
        } else {
            ours.mode
        };

        if result.conflicted {
            outcome.conflicts.push(MergeConflictEntry {
                path: path.clone(),
                kind,
                working_text: Some(result.text),
            });
            return Ok(());
        }

        let blob = Blob::new(Bytes::from(result.text.into_bytes()));
        let oid = self.database.store(&blob)?;
        outcome
            .entries
            .insert(path.clone(), DatabaseEntry::new(oid, mode));

        Ok(())
    }

    fn delete_modify_conflict(
        &self,
        path: &PathBuf,
        kept: &DatabaseEntry,
    ) -> anyhow::Result<MergeConflictEntry> {
        let blob = self
            .database
            .parse_blob(&kept.oid)?
            .ok_or_else(|| anyhow::anyhow!("entry {} is not a blob", kept.oid))?;

        Ok(MergeConflictEntry {
            path: path.clone(),
            kind: ConflictKind::DeleteModify,
            working_text: Some(String::from_utf8_lossy(blob.content()).into_owned()),
        })
    }

    fn blob_lines(&self, oid: &ObjectId) -> anyhow::Result<Vec<String>> {
        let blob = self
            .database
            .parse_blob(oid)?
            .ok_or_else(|| anyhow::anyhow!("entry {} is not a blob", oid))?;

        Ok(blob.lines())
    }
}
