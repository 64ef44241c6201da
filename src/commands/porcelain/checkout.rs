use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::revision::ref_name::RefName;
use crate::artifacts::revision::revision::Revision;
use std::io::Write;

const DETACHMENT_NOTICE: &str = r#"You are in 'detached HEAD' state. You can look around, make experimental
changes and commit them, and you can discard any commits you make in this
state without impacting any branches by performing another checkout.

If you want to create a new branch to retain commits you create, you may
do so (now or later) by using the branch command."#;

impl Repository {
    /// Materialise a target revision and move HEAD, attaching it when the
    /// target is a branch name and detaching it otherwise.
    pub fn checkout(&self, target: &str) -> anyhow::Result<()> {
        let was_detached = self.refs().current_ref()?.is_detached();

        let target_oid = Revision::resolve_commit_expression(target, self)?;
        let target_commit = self
            .database()
            .parse_commit(&target_oid)?
            .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", target_oid))?;
        let target_tree = self.database().flatten_tree(target_commit.tree_oid())?;

        let mut index = self.index_mut();
        index.load()?;

        let migration = Migration::from_index_to_target(self, &index, &target_tree);
        migration.apply(&mut index)?;
        index.write_updates()?;

        // attach to a branch when the target names one, detach otherwise
        let branch = RefName::try_parse(target.to_string())
            .ok()
            .filter(|name| self.refs().branch_exists(name));

        match &branch {
            Some(branch) => self.refs().attach_head(branch)?,
            None => self.refs().detach_head(&target_oid)?,
        }

        match &branch {
            Some(branch) => {
                writeln!(self.writer(), "Switched to branch '{}'", branch)?;
            }
            None => {
                if !was_detached {
                    writeln!(
                        self.writer(),
                        "Note: checking out '{}'.\n\n{}\n",
                        target,
                        DETACHMENT_NOTICE
                    )?;
                }
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
