use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::core::RepoError;
use crate::artifacts::merge::base::MergeBaseFinder;
use crate::artifacts::merge::tree_merge::{TreeMerger, write_tree};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::revision::revision::Revision;
use std::io::Write;
use tracing::debug;

impl Repository {
    /// Replay the commits in `merge_base(HEAD, target)..HEAD` onto the
    /// target, oldest first.
    ///
    /// Every replay is a three-way tree merge computed against the store
    /// only; the working tree is touched once at the very end, so a
    /// conflict aborts with nothing to clean up.
    pub fn rebase(&self, target: &str) -> anyhow::Result<()> {
        let head_oid = self.head_oid()?;
        let onto_oid = Revision::resolve_commit_expression(target, self)?;

        let base_oid = MergeBaseFinder::new(self.database())
            .find(&head_oid, &onto_oid)?
            .ok_or_else(|| {
                anyhow::anyhow!("fatal: refusing to rebase onto unrelated history")
            })?;

        if base_oid == onto_oid || head_oid == onto_oid {
            writeln!(self.writer(), "Current branch is up to date.")?;
            return Ok(());
        }

        let mut index = self.index_mut();
        index.load()?;

        if base_oid == head_oid {
            // nothing of ours to replay: fast-forward to the target
            let onto_tree = self.tree_of_commit(&onto_oid)?;
            let migration = Migration::from_index_to_target(self, &index, &onto_tree);
            migration.apply(&mut index)?;
            index.write_updates()?;
            self.refs().update_head(&onto_oid)?;

            writeln!(
                self.writer(),
                "Fast-forwarded to {}.",
                onto_oid.short()
            )?;
            return Ok(());
        }

        // the commits to replay, oldest first, following first parents
        let mut chain: Vec<ObjectId> = Vec::new();
        let mut current = head_oid.clone();
        while current != base_oid {
            let commit = self
                .database()
                .parse_commit(&current)?
                .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", current))?;
            chain.push(current.clone());
            match commit.parent() {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }
        chain.reverse();

        let mut new_tip = onto_oid.clone();
        for oid in &chain {
            let commit = self
                .database()
                .parse_commit(oid)?
                .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", oid))?;

            let parent_tree = match commit.parent() {
                Some(parent) => self.tree_of_commit(parent)?,
                None => Default::default(),
            };
            let current_tree = self.tree_of_commit(&new_tip)?;
            let commit_tree = self.tree_of_commit(oid)?;

            debug!(replaying = %oid, onto = %new_tip, "rebase step");

            let merger = TreeMerger::new(self.database(), oid.short().to_string());
            let outcome = merger.merge(&parent_tree, &current_tree, &commit_tree)?;

            if !outcome.is_clean() {
                for conflict in &outcome.conflicts {
                    eprintln!(
                        "CONFLICT ({}): {} while replaying {}",
                        conflict.kind.describe(),
                        conflict.path.display(),
                        oid.short()
                    );
                }
                eprintln!("rebase aborted; working tree left untouched");
                return Err(RepoError::MergeConflict.into());
            }

            let tree_oid = write_tree(self.database(), &outcome.entries)?;
            let replayed = Commit::new(
                vec![new_tip.clone()],
                tree_oid,
                commit.author().clone(),
                commit.message().to_string(),
            );
            new_tip = self.database().store(&replayed)?;
        }

        // materialise the rebased tip, then move the branch
        let tip_tree = self.tree_of_commit(&new_tip)?;
        let migration = Migration::from_index_to_target(self, &index, &tip_tree);
        migration.apply(&mut index)?;
        index.write_updates()?;
        self.refs().update_head(&new_tip)?;

        writeln!(
            self.writer(),
            "Successfully rebased {} commit(s) onto {}.",
            chain.len(),
            onto_oid.short()
        )?;

        Ok(())
    }
}
