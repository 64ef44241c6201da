//! Error taxonomy and lock files
//!
//! Commands propagate `anyhow::Error`; the variants below travel inside it
//! and are what the binary matches on to render a single diagnostic line and
//! pick the exit code. Internal invariant violations (digest mismatches,
//! tree ordering) stay plain `anyhow` errors and may abort loudly.

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// User-visible failure kinds.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("fatal: not a pygit repository (or any of the parent directories): .pygit")]
    NotARepo,

    #[error("fatal: object or ref not found: {0}")]
    NotFound(String),

    #[error("fatal: object {oid} is corrupt: {reason}")]
    Corrupt { oid: String, reason: String },

    #[error("fatal: short id '{prefix}' is ambiguous\n{}", candidate_lines(.candidates))]
    Ambiguous {
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("fatal: bad revision '{0}'")]
    BadRevision(String),

    #[error(
        "error: your local changes to the following files would be overwritten:\n{}\nPlease commit your changes or stash them first.",
        path_lines(.0)
    )]
    Dirty(Vec<PathBuf>),

    #[error(
        "error: the following untracked working tree files would be overwritten:\n{}\nPlease move or remove them before you switch branches.",
        path_lines(.0)
    )]
    WouldOverwriteUntracked(Vec<PathBuf>),

    #[error("error: merge halted with conflicts; fix them and commit the result")]
    MergeConflict,

    #[error("nothing to commit, working tree clean")]
    NothingToCommit,

    #[error("fatal: ref '{0}' already exists")]
    RefExists(String),

    #[error("fatal: ref '{0}' is in use and cannot be deleted")]
    RefInUse(String),

    #[error(
        "fatal: unable to create lock file '{}': another process holds it (or a stale lock remains; remove it to recover)",
        .0.display()
    )]
    Locked(PathBuf),

    #[error("fatal: the current branch does not have any commits yet")]
    Unborn,

    #[error("fatal: too many symbolic reference hops while resolving '{0}'")]
    TooManyHops(String),
}

fn path_lines(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for path in paths {
        let _ = write!(out, "\t{}\n", path.display());
    }
    out.pop();
    out
}

fn candidate_lines(candidates: &[String]) -> String {
    let mut out = String::from("hint: the candidates are:");
    for candidate in candidates {
        let _ = write!(out, "\nhint:   {}", candidate);
    }
    out
}

/// Exclusive on-disk lock plus staged content for an atomic file update.
///
/// The lock file is `<target>.lock`, created with `O_CREAT|O_EXCL`; a
/// pre-existing lock means another process is mid-operation (or died and
/// left a stale lock behind). Content is written into the lock file and
/// renamed over the target on commit, so the target always holds either the
/// old or the new bytes.
#[derive(Debug)]
pub struct Lockfile {
    target: PathBuf,
    lock_path: PathBuf,
    file: Option<File>,
}

impl Lockfile {
    pub fn acquire(target: &Path) -> anyhow::Result<Self> {
        let lock_path = Self::lock_path_for(target);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    anyhow::Error::from(RepoError::Locked(lock_path.clone()))
                }
                _ => anyhow::Error::from(err),
            })?;

        Ok(Lockfile {
            target: target.to_path_buf(),
            lock_path,
            file: Some(file),
        })
    }

    fn lock_path_for(target: &Path) -> PathBuf {
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        target.with_file_name(name)
    }

    pub fn write(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.file
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("lock file already committed"))?
            .write_all(data)?;

        Ok(())
    }

    pub fn file_mut(&mut self) -> anyhow::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("lock file already committed"))
    }

    /// Flush and atomically rename the staged content over the target.
    pub fn commit(mut self) -> anyhow::Result<()> {
        let file = self
            .file
            .take()
            .ok_or_else(|| anyhow::anyhow!("lock file already committed"))?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&self.lock_path, &self.target)?;

        Ok(())
    }

    /// Release the lock without touching the target.
    pub fn rollback(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.file.take().is_some() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        self.release();
    }
}
