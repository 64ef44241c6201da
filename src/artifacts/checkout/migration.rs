//! Checkout migration
//!
//! Turns the working tree and index from the currently tracked snapshot
//! into a target tree in three phases:
//!
//! 1. **Plan**: diff the index's snapshot against the target and check every
//!    touched path for conflicts — local modifications (`Dirty`) and
//!    untracked files that would be clobbered (`WouldOverwriteUntracked`).
//! 2. **Apply**: deletions first (pruning emptied directories), then writes
//!    with the executable bit per mode.
//! 3. **Index**: mirror every action into the index with fresh stat data.
//!
//! Nothing is written until the whole plan has passed the conflict check.

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::core::RepoError;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::{ChangeSet, TreeChange, diff_flat};
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object::hash_object;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::status::file_change::WorkspaceChange;
use crate::artifacts::status::inspector::Inspector;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct Migration<'r> {
    repository: &'r Repository,
    changes: ChangeSet,
    dirty: Vec<PathBuf>,
    clobbered_untracked: Vec<PathBuf>,
}

impl<'r> Migration<'r> {
    /// Plan a migration from the index's current snapshot to `target`.
    pub fn from_index_to_target(
        repository: &'r Repository,
        index: &Index,
        target: &BTreeMap<PathBuf, DatabaseEntry>,
    ) -> Self {
        let changes = diff_flat(&index.flatten(), target);
        Self::with_changes(repository, changes)
    }

    pub fn with_changes(repository: &'r Repository, changes: ChangeSet) -> Self {
        Migration {
            repository,
            changes,
            dirty: Vec::new(),
            clobbered_untracked: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    /// Restore working tree and index to `target` unconditionally,
    /// discarding local changes to tracked files. Untracked files are left
    /// alone. Used by `reset --hard` and the stash.
    pub fn force_restore(
        repository: &Repository,
        index: &mut Index,
        target: &BTreeMap<PathBuf, DatabaseEntry>,
    ) -> anyhow::Result<()> {
        for path in index.tracked_paths() {
            if !target.contains_key(&path) {
                repository.workspace().remove_file(&path)?;
            }
        }

        let mut entries = Vec::with_capacity(target.len());
        for (path, entry) in target {
            let blob = repository
                .database()
                .parse_blob(&entry.oid)?
                .with_context(|| format!("entry {} is not a blob", entry.oid))?;
            repository
                .workspace()
                .write_file(path, blob.content(), entry.mode)?;

            let stat = repository.workspace().stat_file(path)?;
            entries.push(IndexEntry::new(path.clone(), entry.oid.clone(), stat));
        }

        index.replace(entries);

        Ok(())
    }

    /// Check conflicts, then apply the migration to working tree and index.
    pub fn apply(mut self, index: &mut Index) -> anyhow::Result<()> {
        self.plan(index)?;
        self.update_workspace()?;
        self.update_index(index)?;

        Ok(())
    }

    fn plan(&mut self, index: &Index) -> anyhow::Result<()> {
        let inspector = Inspector::new(self.repository);

        let changes: Vec<(PathBuf, TreeChange)> = self
            .changes
            .iter()
            .map(|(path, change)| (path.clone(), change.clone()))
            .collect();

        for (path, change) in &changes {
            self.check_for_conflict(path, change, index, &inspector)?;
        }

        if !self.clobbered_untracked.is_empty() {
            return Err(
                RepoError::WouldOverwriteUntracked(std::mem::take(&mut self.clobbered_untracked))
                    .into(),
            );
        }
        if !self.dirty.is_empty() {
            return Err(RepoError::Dirty(std::mem::take(&mut self.dirty)).into());
        }

        Ok(())
    }

    fn check_for_conflict(
        &mut self,
        path: &Path,
        change: &TreeChange,
        index: &Index,
        inspector: &Inspector<'_>,
    ) -> anyhow::Result<()> {
        let entry = index.entry_by_path(path);
        let stat = self.repository.workspace().stat_file(path).ok();

        match (entry, stat) {
            // tracked and present: any local modification would be lost
            (Some(entry), Some(stat)) => {
                let workspace_change =
                    inspector.check_index_against_workspace(Some(entry), Some(&stat))?;
                if workspace_change != WorkspaceChange::None {
                    self.dirty.push(path.to_path_buf());
                }
            }

            // tracked but locally deleted: only an incoming modification is
            // a conflict, an incoming deletion agrees with the user
            (Some(_), None) => {
                if matches!(change, TreeChange::Modified { .. }) {
                    self.dirty.push(path.to_path_buf());
                }
            }

            // untracked file in the way of incoming content
            (None, Some(stat)) => {
                if stat.mode.is_tree() {
                    // a directory where a file must go; refuse when it holds
                    // anything trackable
                    if change.new_entry().is_some()
                        && inspector.is_trackable_content(path, index)?
                    {
                        self.clobbered_untracked.push(path.to_path_buf());
                    }
                } else if let Some(new_entry) = change.new_entry() {
                    // identical content is not an overwrite
                    let content = self.repository.workspace().read_file(path)?;
                    let oid = hash_object(ObjectType::Blob, &content)?;
                    if oid != new_entry.oid {
                        self.clobbered_untracked.push(path.to_path_buf());
                    }
                }
            }

            (None, None) => {}
        }

        Ok(())
    }

    fn update_workspace(&self) -> anyhow::Result<()> {
        // deletions first so directory/file swaps cannot collide
        for (path, change) in &self.changes {
            if matches!(change, TreeChange::Deleted(_)) {
                debug!(path = %path.display(), "removing file");
                self.repository.workspace().remove_file(path)?;
            }
        }

        for (path, change) in &self.changes {
            if let Some(entry) = change.new_entry() {
                let blob = self
                    .repository
                    .database()
                    .parse_blob(&entry.oid)?
                    .with_context(|| format!("entry {} is not a blob", entry.oid))?;

                debug!(path = %path.display(), oid = %entry.oid, "writing file");
                self.repository
                    .workspace()
                    .write_file(path, blob.content(), entry.mode)?;
            }
        }

        Ok(())
    }

    fn update_index(&self, index: &mut Index) -> anyhow::Result<()> {
        for (path, change) in &self.changes {
            match change {
                TreeChange::Deleted(_) => index.remove(path),
                TreeChange::Added(entry) | TreeChange::Modified { new: entry, .. } => {
                    let stat = self.repository.workspace().stat_file(path)?;
                    index.add(IndexEntry::new(path.clone(), entry.oid.clone(), stat));
                }
            }
        }

        Ok(())
    }
}
