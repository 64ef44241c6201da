use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::core::RepoError;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::diff_flat;
use crate::artifacts::merge::base::MergeBaseFinder;
use crate::artifacts::merge::tree_merge::TreeMerger;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::revision::revision::Revision;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

impl Repository {
    /// Merge another revision into HEAD: fast-forward when possible,
    /// three-way otherwise. Conflicts leave markers in the working tree and
    /// MERGE_HEAD behind for the concluding commit.
    pub fn merge(&self, target: &str) -> anyhow::Result<()> {
        let head_oid = self.head_oid()?;
        let their_oid = Revision::resolve_commit_expression(target, self)?;

        let base_oid = MergeBaseFinder::new(self.database())
            .find(&head_oid, &their_oid)?
            .ok_or_else(|| {
                anyhow::anyhow!("fatal: refusing to merge unrelated histories")
            })?;

        debug!(base = %base_oid, ours = %head_oid, theirs = %their_oid, "merge base found");

        if base_oid == their_oid {
            writeln!(self.writer(), "Already up to date.")?;
            return Ok(());
        }

        let mut index = self.index_mut();
        index.load()?;

        if base_oid == head_oid {
            // fast-forward: no new commit, just move to theirs
            let their_tree = self.tree_of_commit(&their_oid)?;
            let migration = Migration::from_index_to_target(self, &index, &their_tree);
            migration.apply(&mut index)?;
            index.write_updates()?;

            self.refs().update_head(&their_oid)?;

            writeln!(
                self.writer(),
                "Updating {}..{}",
                head_oid.short(),
                their_oid.short()
            )?;
            writeln!(self.writer(), "Fast-forward")?;
            return Ok(());
        }

        let base_tree = self.tree_of_commit(&base_oid)?;
        let our_tree = self.tree_of_commit(&head_oid)?;
        let their_tree = self.tree_of_commit(&their_oid)?;

        let merger = TreeMerger::new(self.database(), target.to_string());
        let outcome = merger.merge(&base_tree, &our_tree, &their_tree)?;

        // materialise everything that merged cleanly; conflict checks
        // against local changes still apply
        let changes = diff_flat(&index.flatten(), &outcome.entries);
        Migration::with_changes(self, changes).apply(&mut index)?;

        // conflicted files get their marker text in the working tree while
        // the index keeps our side staged
        for conflict in &outcome.conflicts {
            if let Some(text) = &conflict.working_text {
                let mode = outcome
                    .entries
                    .get(&conflict.path)
                    .map(|entry| entry.mode)
                    .unwrap_or_default();
                self.workspace().write_file(&conflict.path, text.as_bytes(), mode)?;
            }
        }

        index.write_updates()?;

        if !outcome.is_clean() {
            for conflict in &outcome.conflicts {
                eprintln!(
                    "CONFLICT ({}): merge conflict in {}",
                    conflict.kind.describe(),
                    conflict.path.display()
                );
            }
            self.refs().write_merge_head(&their_oid)?;
            writeln!(
                self.writer(),
                "Automatic merge failed; fix conflicts and then commit the result."
            )?;
            return Err(RepoError::MergeConflict.into());
        }

        let tree_oid = index.as_tree(self.database())?;
        let author = self.author()?;
        let message = format!("Merge {} into HEAD", target);
        let commit = Commit::new(
            vec![head_oid.clone(), their_oid.clone()],
            tree_oid,
            author,
            message,
        );
        let commit_oid = self.database().store(&commit)?;
        self.refs().update_head(&commit_oid)?;

        writeln!(
            self.writer(),
            "Merge made by the three-way strategy."
        )?;

        Ok(())
    }

    pub(crate) fn tree_of_commit(
        &self,
        oid: &ObjectId,
    ) -> anyhow::Result<BTreeMap<PathBuf, DatabaseEntry>> {
        let commit = self
            .database()
            .parse_commit(oid)?
            .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", oid))?;
        self.database().flatten_tree(commit.tree_oid())
    }
}
