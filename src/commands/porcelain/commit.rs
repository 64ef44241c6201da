use crate::areas::repository::Repository;
use crate::artifacts::core::RepoError;
use crate::artifacts::objects::commit::Commit;
use std::io::Write;
use tracing::debug;

impl Repository {
    /// Build a tree from the index and advance the current branch. When a
    /// merge is in progress (MERGE_HEAD exists) the commit gets both
    /// parents and concludes the merge.
    pub fn commit(&self, message: &str) -> anyhow::Result<()> {
        let mut index = self.index_mut();
        index.load()?;

        let tree_oid = index.as_tree(self.database())?;

        let head_oid = self.refs().read_head()?;
        let merge_head = self.refs().read_merge_head()?;

        // refuse empty commits unless a merge is being concluded
        if merge_head.is_none() {
            let unchanged = match &head_oid {
                Some(head_oid) => {
                    let head_commit = self
                        .database()
                        .parse_commit(head_oid)?
                        .ok_or_else(|| anyhow::anyhow!("HEAD {} is not a commit", head_oid))?;
                    head_commit.tree_oid() == &tree_oid
                }
                None => index.is_empty(),
            };
            if unchanged {
                return Err(RepoError::NothingToCommit.into());
            }
        }

        let mut parents = Vec::new();
        if let Some(head_oid) = &head_oid {
            parents.push(head_oid.clone());
        }
        if let Some(merge_oid) = &merge_head {
            parents.push(merge_oid.clone());
        }

        let author = self.author()?;
        let commit = Commit::new(parents, tree_oid, author, message.trim().to_string());
        let commit_oid = self.database().store(&commit)?;
        debug!(oid = %commit_oid, "created commit");

        self.refs().update_head(&commit_oid)?;
        self.refs().clear_merge_head()?;

        let current_ref = self.refs().current_ref()?;
        let branch_label = if current_ref.is_detached() {
            "detached HEAD".to_string()
        } else {
            current_ref.short_name().to_string()
        };
        let root_label = if head_oid.is_none() { "(root-commit) " } else { "" };

        writeln!(
            self.writer(),
            "[{} {}{}] {}",
            branch_label,
            root_label,
            commit_oid.short(),
            commit.short_message()
        )?;

        Ok(())
    }
}
