//! Change detection
//!
//! Compares index entries against fresh stat data first (size, mode,
//! timestamps) and only re-hashes file content when the cheap checks are
//! inconclusive.

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::object::Object;
use crate::artifacts::status::file_change::{IndexChange, WorkspaceChange};
use derive_new::new;
use std::path::Path;

#[derive(new)]
pub struct Inspector<'r> {
    repository: &'r Repository,
}

impl<'r> Inspector<'r> {
    /// Whether a path (file or directory) contains anything tracked.
    pub fn is_trackable_content(&self, path: &Path, index: &Index) -> anyhow::Result<bool> {
        if self.repository.workspace().path().join(path).is_file() {
            return Ok(!index.is_directly_tracked(path));
        }

        let children = self.repository.workspace().list_dir(Some(path))?;

        let files = children.iter().filter(|p| !self.repository.workspace().is_dir(p));
        let dirs = children.iter().filter(|p| self.repository.workspace().is_dir(p));

        // files first so a direct hit short-circuits the recursion
        for child in files.chain(dirs) {
            if index.is_directly_tracked(child) {
                continue;
            }
            if self.is_trackable_content(child, index)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn is_content_changed(&self, entry: &IndexEntry) -> anyhow::Result<bool> {
        let blob = self.repository.workspace().parse_blob(&entry.name)?;
        Ok(blob.object_id()? != entry.oid)
    }

    /// Classify one path between index and working tree.
    pub fn check_index_against_workspace(
        &self,
        entry: Option<&IndexEntry>,
        stat: Option<&EntryMetadata>,
    ) -> anyhow::Result<WorkspaceChange> {
        match (entry, stat) {
            (None, _) => Ok(WorkspaceChange::Untracked),
            (Some(_), None) => Ok(WorkspaceChange::Deleted),
            (Some(entry), Some(stat)) if !entry.stat_match(stat) => Ok(WorkspaceChange::Modified),
            (Some(entry), Some(stat)) if entry.times_match(stat) => Ok(WorkspaceChange::None),
            (Some(entry), Some(_)) if self.is_content_changed(entry)? => {
                Ok(WorkspaceChange::Modified)
            }
            _ => Ok(WorkspaceChange::None),
        }
    }

    /// Classify one path between HEAD's tree and the index.
    pub fn check_index_against_head_tree(
        &self,
        entry: Option<&IndexEntry>,
        head_entry: Option<&DatabaseEntry>,
    ) -> IndexChange {
        match (entry, head_entry) {
            (Some(entry), Some(head_entry))
                if head_entry.mode != entry.metadata.mode || head_entry.oid != entry.oid =>
            {
                IndexChange::Modified
            }
            (Some(_), None) => IndexChange::Added,
            (None, Some(_)) => IndexChange::Deleted,
            _ => IndexChange::None,
        }
    }
}
