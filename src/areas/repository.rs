//! Repository handle
//!
//! Discovers the `.pygit` directory by walking upward from the starting
//! point and wires together the database, index, refs, workspace and
//! config. Every command is implemented as a method on [`Repository`]
//! (see `commands::porcelain`), writing user-facing output to the injected
//! writer.

use crate::areas::config::Config;
use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::core::RepoError;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::object_id::ObjectId;
use std::cell::{RefCell, RefMut};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Repository directory name.
pub const REPO_DIR: &str = ".pygit";

const DATABASE_DIR: &str = "objects";
const INDEX_FILE: &str = "index";
const CONFIG_FILE: &str = "config";

pub struct Repository {
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    index: RefCell<Index>,
    database: Database,
    workspace: Workspace,
    refs: Refs,
}

impl Repository {
    /// Open the repository rooted exactly at `path` (used by `init`, which
    /// may run before `.pygit` exists).
    pub fn at(path: PathBuf, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let path = path.canonicalize()?;
        let repo_path = path.join(REPO_DIR);

        Ok(Repository {
            index: RefCell::new(Index::new(
                repo_path.join(INDEX_FILE).into_boxed_path(),
            )),
            database: Database::new(repo_path.join(DATABASE_DIR).into_boxed_path()),
            workspace: Workspace::new(path.clone().into_boxed_path()),
            refs: Refs::new(repo_path.into_boxed_path()),
            writer: RefCell::new(writer),
            path: path.into_boxed_path(),
        })
    }

    /// Walk upward from `start` until a `.pygit` directory is found.
    pub fn discover(start: &Path, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let start = start.canonicalize().map_err(|_| RepoError::NotARepo)?;
        let mut current = start.as_path();

        loop {
            if current.join(REPO_DIR).is_dir() {
                return Self::at(current.to_path_buf(), writer);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => return Err(RepoError::NotARepo.into()),
            }
        }
    }

    /// The working-tree root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `.pygit` directory.
    pub fn repo_path(&self) -> PathBuf {
        self.path.join(REPO_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.repo_path().join(CONFIG_FILE)
    }

    pub fn writer(&self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn index_mut(&self) -> RefMut<'_, Index> {
        self.index.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn config(&self) -> anyhow::Result<Config> {
        Config::load(&self.config_path())
    }

    /// The commit author for this invocation: environment override first,
    /// then configuration.
    pub fn author(&self) -> anyhow::Result<Author> {
        self.config()?.author()
    }

    /// HEAD's tree flattened to `path → (blob-id, mode)`; empty when HEAD
    /// is unborn.
    pub fn head_tree(&self) -> anyhow::Result<BTreeMap<PathBuf, DatabaseEntry>> {
        match self.refs.read_head()? {
            Some(head_oid) => {
                let commit = self
                    .database
                    .parse_commit(&head_oid)?
                    .ok_or_else(|| anyhow::anyhow!("HEAD {} is not a commit", head_oid))?;
                self.database.flatten_tree(commit.tree_oid())
            }
            None => Ok(BTreeMap::new()),
        }
    }

    /// Resolve HEAD, failing with `Unborn` when there are no commits yet.
    pub fn head_oid(&self) -> anyhow::Result<ObjectId> {
        self.refs
            .read_head()?
            .ok_or_else(|| RepoError::Unborn.into())
    }
}
