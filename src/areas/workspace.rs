//! Working tree
//!
//! File-system operations on the checkout rooted next to `.pygit/`: listing
//! and reading files for `add` and `status`, writing blobs and pruning
//! directories when a tree is materialised. All paths handed out are
//! relative to the root.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::blob::Blob;
use anyhow::Context;
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const REPO_DIR_NAME: &str = ".pygit";
const IGNORED_PATHS: [&str; 3] = [REPO_DIR_NAME, ".", ".."];

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a file into a blob.
    pub fn parse_blob(&self, path: &Path) -> anyhow::Result<Blob> {
        Ok(Blob::new(Bytes::from(self.read_file(path)?)))
    }

    /// Immediate children of a directory, repository dir excluded, as
    /// root-relative paths.
    pub fn list_dir(&self, dir_path: Option<&Path>) -> anyhow::Result<Vec<PathBuf>> {
        let dir_path = match dir_path {
            Some(p) => self.path.join(p),
            None => self.path.to_path_buf(),
        };

        if !dir_path.is_dir() {
            anyhow::bail!("not a directory: {}", dir_path.display());
        }

        let mut paths = std::fs::read_dir(&dir_path)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| self.relative_if_not_ignored(&entry.path()))
            .collect::<Vec<_>>();
        paths.sort();

        Ok(paths)
    }

    /// Every file under a path (or the whole tree), repository dir excluded,
    /// as root-relative paths.
    pub fn list_files(&self, root: Option<&Path>) -> anyhow::Result<Vec<PathBuf>> {
        let root = match root {
            Some(p) => self.path.join(p),
            None => self.path.to_path_buf(),
        };

        if !root.exists() {
            anyhow::bail!("pathspec did not match any files: {}", root.display());
        }

        if root.is_dir() {
            let mut files = WalkDir::new(&root)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_file())
                .filter_map(|entry| self.relative_if_not_ignored(entry.path()))
                .collect::<Vec<_>>();
            files.sort();
            Ok(files)
        } else {
            Ok(vec![
                root.strip_prefix(self.path.as_ref())
                    .map(PathBuf::from)
                    .unwrap_or_default(),
            ])
        }
    }

    fn relative_if_not_ignored(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(self.path.as_ref()).ok()?;

        let ignored = relative.components().any(|component| {
            matches!(component, std::path::Component::Normal(name)
                if IGNORED_PATHS.contains(&name.to_string_lossy().as_ref()))
        });

        if ignored { None } else { Some(relative.to_path_buf()) }
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.path.join(path).exists()
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        self.path.join(path).is_dir()
    }

    /// Read a file's raw bytes; content is opaque, no encoding is assumed.
    pub fn read_file(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        let full_path = self.path.join(path);
        std::fs::read(&full_path)
            .with_context(|| format!("unable to read file {}", full_path.display()))
    }

    pub fn stat_file(&self, path: &Path) -> anyhow::Result<EntryMetadata> {
        let metadata = std::fs::metadata(self.path.join(path))?;
        (path, metadata).try_into()
    }

    /// Write blob content to a path, creating parent directories and
    /// applying the executable bit per mode.
    pub fn write_file(&self, path: &Path, content: &[u8], mode: EntryMode) -> anyhow::Result<()> {
        let full_path = self.path.join(path);

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("unable to create directory {}", parent.display()))?;
        }

        // a directory in the way has already been cleared by the migration
        // plan; anything left here is a plain file to overwrite
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full_path)
            .with_context(|| format!("unable to open file {}", full_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("unable to write file {}", full_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = if mode.is_executable() {
                std::fs::Permissions::from_mode(0o755)
            } else {
                std::fs::Permissions::from_mode(0o644)
            };
            std::fs::set_permissions(&full_path, permissions).with_context(|| {
                format!("unable to set permissions on {}", full_path.display())
            })?;
        }

        Ok(())
    }

    /// Delete a file and prune any parent directories the deletion emptied.
    pub fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        let full_path = self.path.join(path);

        if full_path.is_file() {
            std::fs::remove_file(&full_path)
                .with_context(|| format!("unable to remove file {}", full_path.display()))?;
        } else if full_path.is_dir() {
            std::fs::remove_dir_all(&full_path)
                .with_context(|| format!("unable to remove directory {}", full_path.display()))?;
        }

        self.prune_empty_dirs(path)
    }

    fn prune_empty_dirs(&self, path: &Path) -> anyhow::Result<()> {
        let mut parent = path.parent();

        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }

            let full_dir = self.path.join(dir);
            match full_dir.read_dir() {
                Ok(mut entries) => {
                    if entries.next().is_none() {
                        std::fs::remove_dir(&full_dir).with_context(|| {
                            format!("unable to remove directory {}", full_dir.display())
                        })?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }

            parent = dir.parent();
        }

        Ok(())
    }
}
