//! Full status scan
//!
//! Walks the working tree once, collecting stat data for tracked files and
//! untracked paths (directories are reported whole, not their contents, and
//! only when they actually contain files). Then classifies every index
//! entry against both the working tree and HEAD's tree.

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::ignore::IgnoreRules;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::status::file_change::{FileChange, IndexChange, WorkspaceChange};
use crate::artifacts::status::inspector::Inspector;
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub type FileStatSet = BTreeMap<PathBuf, EntryMetadata>;
pub type HeadTree = BTreeMap<PathBuf, DatabaseEntry>;

/// Everything `status` (and the commands built on it) needs to know.
#[derive(Debug, Clone, Default)]
pub struct StatusInfo {
    /// Fresh stat data for tracked files found in the working tree.
    pub file_stats: FileStatSet,
    /// Untracked files and directories, ignore rules applied.
    pub untracked: BTreeSet<PathBuf>,
    /// Classified changes keyed by path.
    pub changes: BTreeMap<PathBuf, FileChange>,
    /// HEAD's tree, flattened.
    pub head_tree: HeadTree,
}

impl StatusInfo {
    pub fn staged(&self) -> impl Iterator<Item = (&PathBuf, &IndexChange)> {
        self.changes
            .iter()
            .filter(|(_, change)| change.index_change != IndexChange::None)
            .map(|(path, change)| (path, &change.index_change))
    }

    pub fn unstaged(&self) -> impl Iterator<Item = (&PathBuf, &WorkspaceChange)> {
        self.changes
            .iter()
            .filter(|(_, change)| change.workspace_change != WorkspaceChange::None)
            .map(|(path, change)| (path, &change.workspace_change))
    }

    pub fn is_clean(&self) -> bool {
        self.untracked.is_empty()
            && self
                .changes
                .values()
                .all(|change| *change == FileChange::default())
    }
}

#[derive(new)]
pub struct StatusScan<'r> {
    repository: &'r Repository,
}

impl<'r> StatusScan<'r> {
    /// Scan the working tree and classify every path. Fresh stat data for
    /// unchanged entries is written back into the index so later scans can
    /// skip re-hashing.
    pub fn scan(&self, index: &mut Index) -> anyhow::Result<StatusInfo> {
        let mut info = StatusInfo {
            head_tree: self.repository.head_tree()?,
            ..Default::default()
        };

        let inspector = Inspector::new(self.repository);
        let mut ignore = IgnoreRules::new(self.repository.workspace().path().to_path_buf());

        self.scan_workspace(None, index, &inspector, &mut ignore, &mut info)?;
        self.check_index_entries(index, &inspector, &mut info)?;
        self.collect_deleted_head_files(index, &mut info);

        Ok(info)
    }

    fn scan_workspace(
        &self,
        prefix: Option<&Path>,
        index: &Index,
        inspector: &Inspector<'_>,
        ignore: &mut IgnoreRules,
        info: &mut StatusInfo,
    ) -> anyhow::Result<()> {
        for path in self.repository.workspace().list_dir(prefix)? {
            let is_dir = self.repository.workspace().is_dir(&path);

            if index.is_directly_tracked(&path) {
                if is_dir {
                    self.scan_workspace(Some(&path), index, inspector, ignore, info)?;
                } else {
                    let stat = self.repository.workspace().stat_file(&path)?;
                    info.file_stats.insert(path, stat);
                }
                continue;
            }

            if ignore.is_ignored(&path, is_dir) {
                continue;
            }

            // report whole untracked directories, but only when they hold
            // something trackable
            if inspector.is_trackable_content(&path, index)? {
                info.untracked.insert(path);
            }
        }

        Ok(())
    }

    fn check_index_entries(
        &self,
        index: &mut Index,
        inspector: &Inspector<'_>,
        info: &mut StatusInfo,
    ) -> anyhow::Result<()> {
        let entries: Vec<IndexEntry> = index.entries().cloned().collect();

        for entry in entries {
            let stat = info.file_stats.get(&entry.name);

            let workspace_change =
                inspector.check_index_against_workspace(Some(&entry), stat)?;
            if workspace_change != WorkspaceChange::None {
                info.changes
                    .entry(entry.name.clone())
                    .or_default()
                    .workspace_change = workspace_change;
            } else if let Some(stat) = stat {
                index.update_entry_stat(&entry, stat.clone());
            }

            let index_change = inspector
                .check_index_against_head_tree(Some(&entry), info.head_tree.get(&entry.name));
            if index_change != IndexChange::None {
                info.changes
                    .entry(entry.name.clone())
                    .or_default()
                    .index_change = index_change;
            }
        }

        Ok(())
    }

    fn collect_deleted_head_files(&self, index: &Index, info: &mut StatusInfo) {
        for path in info.head_tree.keys() {
            if !index.is_directly_tracked(path) {
                info.changes.entry(path.clone()).or_default().index_change = IndexChange::Deleted;
            }
        }
    }
}
