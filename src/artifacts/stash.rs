//! Stash log
//!
//! Stash entries live in the ordinary object store as commit pairs (see
//! `commands::porcelain::stash`); this module only manages the ordered log
//! of stash-commit ids at `.pygit/stash/log`, newest first, one per line.

use crate::artifacts::core::Lockfile;
use crate::artifacts::objects::object_id::ObjectId;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct StashLog {
    path: PathBuf,
}

impl StashLog {
    pub fn new(repo_path: &Path) -> Self {
        StashLog {
            path: repo_path.join("stash").join("log"),
        }
    }

    /// All stash ids, `stash@{0}` first.
    pub fn list(&self) -> anyhow::Result<Vec<ObjectId>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        std::fs::read_to_string(&self.path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| ObjectId::try_parse(line.trim().to_string()))
            .collect()
    }

    /// Prepend a new stash id.
    pub fn push(&self, oid: &ObjectId) -> anyhow::Result<()> {
        let mut entries = self.list()?;
        entries.insert(0, oid.clone());
        self.write(&entries)
    }

    /// Remove and return `stash@{0}`.
    pub fn pop(&self) -> anyhow::Result<Option<ObjectId>> {
        let mut entries = self.list()?;
        if entries.is_empty() {
            return Ok(None);
        }

        let top = entries.remove(0);
        self.write(&entries)?;
        Ok(Some(top))
    }

    fn write(&self, entries: &[ObjectId]) -> anyhow::Result<()> {
        let mut lock = Lockfile::acquire(&self.path)?;
        for oid in entries {
            lock.write(oid.as_ref().as_bytes())?;
            lock.write(b"\n")?;
        }
        lock.commit()
    }
}
