use crate::areas::repository::Repository;
use crate::artifacts::core::RepoError;
use std::path::Path;

impl Repository {
    /// Remove tracked paths from working tree and index, staging the
    /// deletion.
    pub fn rm(&self, paths: &[String]) -> anyhow::Result<()> {
        let mut index = self.index_mut();
        index.load()?;

        // validate before mutating anything
        for path in paths {
            if !index.is_directly_tracked(Path::new(path)) {
                return Err(RepoError::NotFound(format!(
                    "pathspec '{}' did not match any tracked files",
                    path
                ))
                .into());
            }
        }

        for path in paths {
            let path = Path::new(path);
            self.workspace().remove_file(path)?;
            index.remove(path);
        }

        index.write_updates()?;

        Ok(())
    }
}
