use crate::areas::repository::Repository;
use crate::artifacts::core::RepoError;
use std::io::Write;

impl Repository {
    /// Get or set a `section.key` value in `.pygit/config`.
    pub fn config_command(&self, key: &str, value: Option<&str>) -> anyhow::Result<()> {
        match value {
            Some(value) => {
                let mut config = self.config()?;
                config.set(key, value)?;
                config.save(&self.config_path())?;
            }
            None => {
                let config = self.config()?;
                let value = config
                    .get(key)
                    .ok_or_else(|| RepoError::NotFound(format!("config key '{}'", key)))?;
                writeln!(self.writer(), "{}", value)?;
            }
        }

        Ok(())
    }
}
