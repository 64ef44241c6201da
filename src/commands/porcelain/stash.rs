use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::merge::tree_merge::write_tree;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::stash::StashLog;
use std::io::Write;

impl Repository {
    /// Save index and working tree as a stash entry, then reset both to
    /// HEAD.
    ///
    /// A stash entry is a commit pair: an index commit `(index-tree,
    /// parent = HEAD)` and a stash commit `(work-tree, parents = [HEAD,
    /// index-commit])` carrying the message. Only the stash commit id goes
    /// into the log.
    pub fn stash_push(&self) -> anyhow::Result<()> {
        let head_oid = self.head_oid()?;
        let head_commit = self
            .database()
            .parse_commit(&head_oid)?
            .ok_or_else(|| anyhow::anyhow!("HEAD {} is not a commit", head_oid))?;

        let mut index = self.index_mut();
        index.load()?;

        let index_tree = index.as_tree(self.database())?;

        // snapshot tracked files at their current working-tree content
        let mut work_entries = index.flatten();
        for (path, entry) in work_entries.iter_mut() {
            if !self.workspace().exists(path) {
                continue;
            }
            let blob = self.workspace().parse_blob(path)?;
            entry.oid = self.database().store(&blob)?;
            entry.mode = self.workspace().stat_file(path)?.mode;
        }
        work_entries.retain(|path, _| self.workspace().exists(path));
        let work_tree = write_tree(self.database(), &work_entries)?;

        let author = self.author()?;
        let branch_label = {
            let current_ref = self.refs().current_ref()?;
            if current_ref.is_detached() {
                "(no branch)".to_string()
            } else {
                current_ref.short_name().to_string()
            }
        };
        let message = format!(
            "WIP on {}: {} {}",
            branch_label,
            head_oid.short(),
            head_commit.short_message()
        );

        let index_commit = Commit::new(
            vec![head_oid.clone()],
            index_tree,
            author.clone(),
            format!("index on {}", branch_label),
        );
        let index_commit_oid = self.database().store(&index_commit)?;

        let stash_commit = Commit::new(
            vec![head_oid.clone(), index_commit_oid],
            work_tree,
            author,
            message.clone(),
        );
        let stash_oid = self.database().store(&stash_commit)?;

        StashLog::new(&self.repo_path()).push(&stash_oid)?;

        // back to a clean checkout of HEAD
        let head_tree = self.tree_of_commit(&head_oid)?;
        Migration::force_restore(self, &mut index, &head_tree)?;
        index.write_updates()?;

        writeln!(self.writer(), "Saved working directory and index state {}", message)?;

        Ok(())
    }

    pub fn stash_list(&self) -> anyhow::Result<()> {
        for (position, oid) in StashLog::new(&self.repo_path()).list()?.iter().enumerate() {
            let commit = self
                .database()
                .parse_commit(oid)?
                .ok_or_else(|| anyhow::anyhow!("stash entry {} is not a commit", oid))?;
            writeln!(
                self.writer(),
                "stash@{{{}}}: {}",
                position,
                commit.short_message()
            )?;
        }

        Ok(())
    }

    /// Restore the most recent stash entry and drop it from the log.
    pub fn stash_pop(&self) -> anyhow::Result<()> {
        let log = StashLog::new(&self.repo_path());
        let Some(stash_oid) = log.list()?.first().cloned() else {
            anyhow::bail!("error: no stash entries found");
        };

        let stash_commit = self
            .database()
            .parse_commit(&stash_oid)?
            .ok_or_else(|| anyhow::anyhow!("stash entry {} is not a commit", stash_oid))?;
        let index_commit_oid = stash_commit
            .parents()
            .get(1)
            .ok_or_else(|| anyhow::anyhow!("stash entry {} is missing its index commit", stash_oid))?
            .clone();

        let mut index = self.index_mut();
        index.load()?;

        // working tree first; conflicts abort before the log is touched
        let work_tree = self.database().flatten_tree(stash_commit.tree_oid())?;
        let migration = Migration::from_index_to_target(self, &index, &work_tree);
        migration.apply(&mut index)?;

        // then restore what was staged; blank stat data forces content
        // verification, so restored unstaged edits still show up
        let index_tree = self.tree_of_commit(&index_commit_oid)?;
        let entries: Vec<IndexEntry> = index_tree
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
        index.replace(entries);
        index.write_updates()?;

        log.pop()?;

        writeln!(
            self.writer(),
            "Dropped stash@{{0}} ({})",
            stash_oid.short()
        )?;

        Ok(())
    }
}
