use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::revision::revision::Revision;
use std::io::Write;

/// How much state `reset` rewinds besides HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Move HEAD only; index and working tree stay.
    Soft,
    /// Move HEAD and reset the index; working tree stays.
    Mixed,
    /// Move HEAD, reset the index, and restore the working tree.
    Hard,
}

impl Repository {
    pub fn reset(&self, mode: ResetMode, rev: &str) -> anyhow::Result<()> {
        let target_oid = Revision::resolve_commit_expression(rev, self)?;
        let target_commit = self
            .database()
            .parse_commit(&target_oid)?
            .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", target_oid))?;

        // branch (or detached HEAD) moves first; index and working tree
        // follow per mode
        self.refs().update_head(&target_oid)?;

        match mode {
            ResetMode::Soft => {}
            ResetMode::Mixed => {
                let mut index = self.index_mut();
                index.load()?;
                index.read_tree(self.database(), target_commit.tree_oid())?;
                index.write_updates()?;
            }
            ResetMode::Hard => {
                let mut index = self.index_mut();
                index.load()?;
                let target_tree = self.database().flatten_tree(target_commit.tree_oid())?;
                Migration::force_restore(self, &mut index, &target_tree)?;
                index.write_updates()?;

                writeln!(
                    self.writer(),
                    "HEAD is now at {} {}",
                    target_oid.short(),
                    target_commit.short_message()
                )?;
            }
        }

        Ok(())
    }
}
