use crate::areas::repository::{REPO_DIR, Repository};
use anyhow::Context;
use std::fs;
use std::io::Write;

impl Repository {
    pub fn init(&self) -> anyhow::Result<()> {
        let repo_path = self.repo_path();

        if repo_path.exists() {
            anyhow::bail!(
                "fatal: repository already exists in {}",
                repo_path.display()
            );
        }

        fs::create_dir_all(self.database().objects_path())
            .with_context(|| format!("failed to create {}/objects", REPO_DIR))?;
        fs::create_dir_all(repo_path.join("refs").join("heads"))
            .with_context(|| format!("failed to create {}/refs/heads", REPO_DIR))?;
        fs::create_dir_all(repo_path.join("refs").join("tags"))
            .with_context(|| format!("failed to create {}/refs/tags", REPO_DIR))?;
        fs::create_dir_all(repo_path.join("stash"))
            .with_context(|| format!("failed to create {}/stash", REPO_DIR))?;

        fs::write(repo_path.join("HEAD"), "ref: refs/heads/main\n")
            .context("failed to write HEAD")?;
        fs::write(repo_path.join("index"), b"").context("failed to write index")?;
        fs::write(repo_path.join("config"), b"").context("failed to write config")?;

        writeln!(
            self.writer(),
            "Initialized empty PyGit repository in {}",
            repo_path.display()
        )?;

        Ok(())
    }
}
