//! Reference store
//!
//! Name-to-id bindings under `.pygit/refs/heads/*` and `.pygit/refs/tags/*`,
//! plus the distinguished `HEAD` and the transient `MERGE_HEAD`. Each ref is
//! a one-line text file holding either a 40-hex object id or a symbolic
//! pointer `ref: <path>`.
//!
//! HEAD is normally symbolic (attached to a branch); writing through it
//! updates the branch it points at. A direct HEAD is the detached state.

use crate::artifacts::core::{Lockfile, RepoError};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::revision::ref_name::{RefName, SymRef};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Upper bound on symbolic indirection when resolving a ref.
pub const MAX_SYMREF_HOPS: usize = 8;

const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// The parsed content of a ref file.
#[derive(Debug, Clone)]
pub enum RefValue {
    Direct(ObjectId),
    Symbolic(SymRef),
}

/// Reference store rooted at the repository directory.
#[derive(Debug)]
pub struct Refs {
    path: Box<Path>,
}

impl Refs {
    pub fn new(path: Box<Path>) -> Self {
        Refs { path }
    }

    fn head_path(&self) -> std::path::PathBuf {
        self.path.join("HEAD")
    }

    fn merge_head_path(&self) -> std::path::PathBuf {
        self.path.join("MERGE_HEAD")
    }

    fn heads_path(&self) -> std::path::PathBuf {
        self.path.join("refs").join("heads")
    }

    fn tags_path(&self) -> std::path::PathBuf {
        self.path.join("refs").join("tags")
    }

    /// Read a single ref file without following indirection.
    pub fn read_ref(&self, sym_ref: &SymRef) -> anyhow::Result<Option<RefValue>> {
        Self::read_ref_file(&self.path.join(sym_ref.as_path()))
    }

    fn read_ref_file(path: &Path) -> anyhow::Result<Option<RefValue>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {}", path.display()))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref) = symref {
            Ok(Some(RefValue::Symbolic(SymRef::new(symref[1].to_string()))))
        } else {
            Ok(Some(RefValue::Direct(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }

    /// Follow symbolic indirection to an object id.
    ///
    /// `Ok(None)` is the unborn state: a symbolic chain ending at a file
    /// that does not exist yet (HEAD right after `init`). More than
    /// [`MAX_SYMREF_HOPS`] hops is an error.
    pub fn resolve(&self, sym_ref: &SymRef) -> anyhow::Result<Option<ObjectId>> {
        let mut current = sym_ref.clone();

        for _ in 0..MAX_SYMREF_HOPS {
            match self.read_ref(&current)? {
                Some(RefValue::Direct(oid)) => return Ok(Some(oid)),
                Some(RefValue::Symbolic(next)) => current = next,
                None => return Ok(None),
            }
        }

        Err(RepoError::TooManyHops(sym_ref.as_path().to_string()).into())
    }

    /// The final symbolic name HEAD points at: the current branch when
    /// attached, `HEAD` itself when detached.
    pub fn current_ref(&self) -> anyhow::Result<SymRef> {
        let mut current = SymRef::head();

        for _ in 0..MAX_SYMREF_HOPS {
            match self.read_ref(&current)? {
                Some(RefValue::Symbolic(next)) => current = next,
                Some(RefValue::Direct(_)) | None => return Ok(current),
            }
        }

        Err(RepoError::TooManyHops("HEAD".to_string()).into())
    }

    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.resolve(&SymRef::head())
    }

    /// Advance HEAD: writes the branch file when attached, HEAD itself when
    /// detached.
    pub fn update_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        let target = self.current_ref()?;
        debug!(target = %target, oid = %oid, "updating head");
        self.update_ref_file(&self.path.join(target.as_path()), oid.as_ref())
    }

    /// Point HEAD directly at a commit (detached state).
    pub fn detach_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(&self.head_path(), oid.as_ref())
    }

    /// Attach HEAD to a branch.
    pub fn attach_head(&self, branch: &RefName) -> anyhow::Result<()> {
        self.update_ref_file(
            &self.head_path(),
            &format!("ref: refs/heads/{}", branch.as_ref()),
        )
    }

    pub fn branch_exists(&self, name: &RefName) -> bool {
        self.heads_path().join(name.as_ref()).exists()
    }

    pub fn tag_exists(&self, name: &RefName) -> bool {
        self.tags_path().join(name.as_ref()).exists()
    }

    pub fn create_branch(&self, name: &RefName, oid: &ObjectId) -> anyhow::Result<()> {
        if self.branch_exists(name) {
            return Err(RepoError::RefExists(name.to_string()).into());
        }

        self.update_ref_file(&self.heads_path().join(name.as_ref()), oid.as_ref())
    }

    pub fn update_branch(&self, name: &RefName, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(&self.heads_path().join(name.as_ref()), oid.as_ref())
    }

    pub fn read_branch(&self, name: &RefName) -> anyhow::Result<Option<ObjectId>> {
        self.resolve(&SymRef::for_branch(name))
    }

    /// Delete a branch, refusing for the branch HEAD is attached to.
    pub fn delete_branch(&self, name: &RefName) -> anyhow::Result<ObjectId> {
        let sym_ref = SymRef::for_branch(name);

        if self.current_ref()? == sym_ref {
            return Err(RepoError::RefInUse(name.to_string()).into());
        }

        let oid = self
            .resolve(&sym_ref)?
            .ok_or_else(|| RepoError::NotFound(format!("branch '{}'", name)))?;

        let branch_path = self.heads_path().join(name.as_ref());
        std::fs::remove_file(&branch_path)
            .with_context(|| format!("failed to delete branch file {}", branch_path.display()))?;
        self.prune_empty_parent_dirs(&branch_path, &self.heads_path())?;

        Ok(oid)
    }

    pub fn create_tag(&self, name: &RefName, oid: &ObjectId) -> anyhow::Result<()> {
        if self.tag_exists(name) {
            return Err(RepoError::RefExists(name.to_string()).into());
        }

        self.update_ref_file(&self.tags_path().join(name.as_ref()), oid.as_ref())
    }

    pub fn read_tag(&self, name: &RefName) -> anyhow::Result<Option<ObjectId>> {
        self.resolve(&SymRef::for_tag(name))
    }

    pub fn list_branches(&self) -> anyhow::Result<BTreeMap<SymRef, ObjectId>> {
        self.list_refs(&self.heads_path())
    }

    pub fn list_tags(&self) -> anyhow::Result<BTreeMap<SymRef, ObjectId>> {
        self.list_refs(&self.tags_path())
    }

    fn list_refs(&self, root: &Path) -> anyhow::Result<BTreeMap<SymRef, ObjectId>> {
        let mut refs = BTreeMap::new();

        for entry in WalkDir::new(root).into_iter().filter_map(|entry| entry.ok()) {
            if !entry.path().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(self.path.as_ref()) else {
                continue;
            };
            let sym_ref = SymRef::new(relative.to_string_lossy().to_string());
            if let Some(oid) = self.resolve(&sym_ref)? {
                refs.insert(sym_ref, oid);
            }
        }

        Ok(refs)
    }

    pub fn write_merge_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(&self.merge_head_path(), oid.as_ref())
    }

    pub fn read_merge_head(&self) -> anyhow::Result<Option<ObjectId>> {
        match Self::read_ref_file(&self.merge_head_path())? {
            Some(RefValue::Direct(oid)) => Ok(Some(oid)),
            Some(RefValue::Symbolic(_)) => anyhow::bail!("MERGE_HEAD cannot be symbolic"),
            None => Ok(None),
        }
    }

    pub fn clear_merge_head(&self) -> anyhow::Result<()> {
        let path = self.merge_head_path();
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    /// Atomically replace a ref file through its lock file.
    fn update_ref_file(&self, path: &Path, content: &str) -> anyhow::Result<()> {
        let mut lock = Lockfile::acquire(path)?;
        lock.write(content.as_bytes())?;
        lock.write(b"\n")?;
        lock.commit()
    }

    fn prune_empty_parent_dirs(&self, path: &Path, stop: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && parent != stop
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent)
                .with_context(|| format!("failed to remove empty ref directory {}", parent.display()))?;
            self.prune_empty_parent_dirs(parent, stop)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn repo_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("refs").join("heads")).unwrap();
        std::fs::create_dir_all(dir.path().join("refs").join("tags")).unwrap();
        std::fs::write(dir.path().join("HEAD"), "ref: refs/heads/main\n").unwrap();
        dir
    }

    fn oid(fill: &str) -> ObjectId {
        ObjectId::try_parse(fill.repeat(20)).unwrap()
    }

    #[rstest]
    fn fresh_head_is_unborn(repo_dir: TempDir) {
        let refs = Refs::new(repo_dir.path().to_path_buf().into_boxed_path());

        assert!(refs.read_head().unwrap().is_none());
        assert_eq!(refs.current_ref().unwrap().as_path(), "refs/heads/main");
    }

    #[rstest]
    fn updating_head_writes_through_to_the_branch(repo_dir: TempDir) {
        let refs = Refs::new(repo_dir.path().to_path_buf().into_boxed_path());

        refs.update_head(&oid("ab")).unwrap();

        assert_eq!(refs.read_head().unwrap(), Some(oid("ab")));
        let branch_content =
            std::fs::read_to_string(repo_dir.path().join("refs/heads/main")).unwrap();
        assert_eq!(branch_content.trim(), oid("ab").as_ref());
        // HEAD itself stays symbolic
        let head_content = std::fs::read_to_string(repo_dir.path().join("HEAD")).unwrap();
        assert!(head_content.starts_with("ref:"));
    }

    #[rstest]
    fn duplicate_branch_creation_is_refused(repo_dir: TempDir) {
        let refs = Refs::new(repo_dir.path().to_path_buf().into_boxed_path());
        let name = RefName::try_parse("feature".into()).unwrap();

        refs.create_branch(&name, &oid("ab")).unwrap();
        let err = refs.create_branch(&name, &oid("cd")).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RepoError>(),
            Some(RepoError::RefExists(_))
        ));
    }

    #[rstest]
    fn deleting_the_current_branch_is_refused(repo_dir: TempDir) {
        let refs = Refs::new(repo_dir.path().to_path_buf().into_boxed_path());
        let main = RefName::try_parse("main".into()).unwrap();
        refs.create_branch(&main, &oid("ab")).unwrap();

        let err = refs.delete_branch(&main).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepoError>(),
            Some(RepoError::RefInUse(_))
        ));
    }

    #[rstest]
    fn deleting_a_nested_branch_prunes_empty_dirs(repo_dir: TempDir) {
        let refs = Refs::new(repo_dir.path().to_path_buf().into_boxed_path());
        let name = RefName::try_parse("feature/login".into()).unwrap();

        refs.create_branch(&name, &oid("ab")).unwrap();
        refs.delete_branch(&name).unwrap();

        assert!(!repo_dir.path().join("refs/heads/feature").exists());
    }

    #[rstest]
    fn symbolic_cycles_hit_the_hop_limit(repo_dir: TempDir) {
        let refs = Refs::new(repo_dir.path().to_path_buf().into_boxed_path());
        std::fs::write(repo_dir.path().join("refs/heads/a"), "ref: refs/heads/b\n").unwrap();
        std::fs::write(repo_dir.path().join("refs/heads/b"), "ref: refs/heads/a\n").unwrap();

        let err = refs
            .resolve(&SymRef::new("refs/heads/a".into()))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepoError>(),
            Some(RepoError::TooManyHops(_))
        ));
    }

    #[rstest]
    fn detach_and_reattach_head(repo_dir: TempDir) {
        let refs = Refs::new(repo_dir.path().to_path_buf().into_boxed_path());
        let main = RefName::try_parse("main".into()).unwrap();
        refs.create_branch(&main, &oid("ab")).unwrap();

        refs.detach_head(&oid("cd")).unwrap();
        assert!(refs.current_ref().unwrap().is_detached());
        assert_eq!(refs.read_head().unwrap(), Some(oid("cd")));

        refs.attach_head(&main).unwrap();
        assert!(!refs.current_ref().unwrap().is_detached());
        assert_eq!(refs.read_head().unwrap(), Some(oid("ab")));
    }

    #[rstest]
    fn merge_head_round_trip(repo_dir: TempDir) {
        let refs = Refs::new(repo_dir.path().to_path_buf().into_boxed_path());

        assert!(refs.read_merge_head().unwrap().is_none());
        refs.write_merge_head(&oid("ef")).unwrap();
        assert_eq!(refs.read_merge_head().unwrap(), Some(oid("ef")));
        refs.clear_merge_head().unwrap();
        assert!(refs.read_merge_head().unwrap().is_none());
    }
}
