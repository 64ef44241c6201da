//! Repository configuration
//!
//! `.pygit/config` is a small INI file: `[section]` headers and
//! `key = value` lines, addressed externally as `section.key`. The author
//! identity resolves from the `PYGIT_AUTHOR_NAME`/`PYGIT_AUTHOR_EMAIL`
//! environment pair first, then from `user.name`/`user.email`.

use crate::artifacts::core::Lockfile;
use crate::artifacts::objects::commit::Author;
use std::collections::BTreeMap;
use std::path::Path;

pub const AUTHOR_NAME_ENV: &str = "PYGIT_AUTHOR_NAME";
pub const AUTHOR_EMAIL_ENV: &str = "PYGIT_AUTHOR_EMAIL";

#[derive(Debug, Default)]
pub struct Config {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// Parse a config file; a missing file is an empty config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current = String::new();

        for (line_number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = section.trim().to_string();
                sections.entry(current.clone()).or_default();
            } else if let Some((key, value)) = line.split_once('=') {
                if current.is_empty() {
                    anyhow::bail!("config line {} outside of a section", line_number + 1);
                }
                sections
                    .entry(current.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            } else {
                anyhow::bail!("malformed config line {}: '{}'", line_number + 1, line);
            }
        }

        Ok(Config { sections })
    }

    /// Look up a `section.key` value.
    pub fn get(&self, key: &str) -> Option<&str> {
        let (section, name) = key.split_once('.')?;
        self.sections.get(section)?.get(name).map(String::as_str)
    }

    /// Set a `section.key` value in memory.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let (section, name) = key
            .split_once('.')
            .ok_or_else(|| anyhow::anyhow!("config key must be of the form section.key: '{}'", key))?;

        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());

        Ok(())
    }

    /// Write the config back atomically.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut lock = Lockfile::acquire(path)?;
        lock.write(self.render().as_bytes())?;
        lock.commit()
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (section, entries) in &self.sections {
            out.push_str(&format!("[{}]\n", section));
            for (key, value) in entries {
                out.push_str(&format!("\t{} = {}\n", key, value));
            }
        }
        out
    }

    /// The commit author: the environment pair when both variables are set,
    /// the `user` section otherwise.
    pub fn author(&self) -> anyhow::Result<Author> {
        let env_name = std::env::var(AUTHOR_NAME_ENV).ok();
        let env_email = std::env::var(AUTHOR_EMAIL_ENV).ok();

        if let (Some(name), Some(email)) = (env_name, env_email) {
            return Ok(Author::new(name, email));
        }

        let name = self.get("user.name");
        let email = self.get("user.email");

        match (name, email) {
            (Some(name), Some(email)) => Ok(Author::new(name.to_string(), email.to_string())),
            _ => anyhow::bail!(
                "author identity unknown: set {} and {} or configure user.name and user.email",
                AUTHOR_NAME_ENV,
                AUTHOR_EMAIL_ENV
            ),
        }
    }
}
