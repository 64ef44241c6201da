//! Revision resolution
//!
//! Turns a user-supplied revision expression into an object id. Base names
//! resolve in a fixed order, first match wins:
//!
//! 1. a literal 40-hex id present in the store
//! 2. a unique abbreviated hex prefix (at least 4 characters)
//! 3. `HEAD` (or the `@` alias) through the symbolic chain
//! 4. a branch under `refs/heads/`
//! 5. a tag under `refs/tags/`, peeled through annotated tag objects
//!
//! Suffixes `~N`, `^` and `^N` then walk the commit graph.

use crate::areas::repository::Repository;
use crate::artifacts::core::RepoError;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::revision::ref_name::RefName;
use crate::artifacts::revision::{ANCESTOR_REGEX, NTH_PARENT_REGEX, PARENT_REGEX, REV_ALIASES};
use anyhow::Context;

/// A parsed revision expression.
#[derive(Debug, Clone)]
pub enum Revision {
    /// A base name: branch, tag, `HEAD`, or an object id (possibly
    /// abbreviated).
    Name(String),
    /// `<rev>^` — first parent.
    Parent(Box<Revision>),
    /// `<rev>^N` — Nth parent of a merge commit.
    NthParent(Box<Revision>, usize),
    /// `<rev>~N` — Nth first-parent ancestor.
    Ancestor(Box<Revision>, usize),
}

impl Revision {
    pub fn parse(revision: &str) -> anyhow::Result<Revision> {
        let nth_parent = regex::Regex::new(NTH_PARENT_REGEX)
            .with_context(|| format!("invalid revision regex: {NTH_PARENT_REGEX}"))?;
        let parent = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid revision regex: {PARENT_REGEX}"))?;
        let ancestor = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid revision regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = nth_parent.captures(revision) {
            let base = Self::parse(&caps[1])?;
            let n: usize = caps[2]
                .parse()
                .map_err(|_| RepoError::BadRevision(revision.to_string()))?;
            return Ok(Revision::NthParent(Box::new(base), n));
        }

        if let Some(caps) = parent.captures(revision) {
            let base = Self::parse(&caps[1])?;
            return Ok(Revision::Parent(Box::new(base)));
        }

        if let Some(caps) = ancestor.captures(revision) {
            let base = Self::parse(&caps[1])?;
            let n: usize = caps[2]
                .parse()
                .map_err(|_| RepoError::BadRevision(revision.to_string()))?;
            return Ok(Revision::Ancestor(Box::new(base), n));
        }

        let name = *REV_ALIASES.get(revision).unwrap_or(&revision);
        if name != "HEAD" && !looks_like_oid(name) {
            // names that are neither ids nor valid ref names can never
            // resolve; reject them early
            RefName::try_parse(name.to_string())
                .map_err(|_| RepoError::BadRevision(revision.to_string()))?;
        }

        Ok(Revision::Name(name.to_string()))
    }

    /// Resolve to an object id, without requiring any particular kind.
    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<ObjectId> {
        match self {
            Revision::Name(name) => resolve_name(name, repository),
            Revision::Parent(base) => {
                let oid = base.resolve_commit(repository)?;
                nth_parent_of(&oid, 1, repository)
            }
            Revision::NthParent(base, n) => {
                let oid = base.resolve_commit(repository)?;
                nth_parent_of(&oid, *n, repository)
            }
            Revision::Ancestor(base, generations) => {
                let mut oid = base.resolve_commit(repository)?;
                for _ in 0..*generations {
                    oid = nth_parent_of(&oid, 1, repository)?;
                }
                Ok(oid)
            }
        }
    }

    /// Resolve to a commit id, peeling tags and rejecting other kinds.
    pub fn resolve_commit(&self, repository: &Repository) -> anyhow::Result<ObjectId> {
        let oid = self.resolve(repository)?;
        let peeled = repository.database().peel(&oid)?;

        match repository.database().kind_of(&peeled)? {
            ObjectType::Commit => Ok(peeled),
            kind => anyhow::bail!("object {} is a {}, not a commit", peeled.short(), kind),
        }
    }

    /// Parse and resolve in one step.
    pub fn resolve_expression(
        expression: &str,
        repository: &Repository,
    ) -> anyhow::Result<ObjectId> {
        Self::parse(expression)?.resolve(repository)
    }

    /// Parse and resolve to a commit in one step.
    pub fn resolve_commit_expression(
        expression: &str,
        repository: &Repository,
    ) -> anyhow::Result<ObjectId> {
        Self::parse(expression)?.resolve_commit(repository)
    }
}

fn looks_like_oid(name: &str) -> bool {
    name.len() >= 4 && name.len() <= OBJECT_ID_LENGTH && name.chars().all(|c| c.is_ascii_hexdigit())
}

fn resolve_name(name: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
    // 1. literal full id present in the store
    if name.len() == OBJECT_ID_LENGTH
        && let Ok(oid) = ObjectId::try_parse(name.to_string())
        && repository.database().exists(&oid)
    {
        return Ok(oid);
    }

    // 2. unique abbreviated prefix
    if looks_like_oid(name) {
        let matches = repository.database().find_by_prefix(&name.to_ascii_lowercase())?;
        match matches.len() {
            0 => {} // fall through to the ref namespace
            1 => return Ok(matches[0].clone()),
            _ => {
                let candidates = matches
                    .iter()
                    .map(|oid| {
                        let kind = repository
                            .database()
                            .kind_of(oid)
                            .map(|kind| kind.to_string())
                            .unwrap_or_else(|_| "unknown".to_string());
                        format!("{} {}", oid.short(), kind)
                    })
                    .collect();
                return Err(RepoError::Ambiguous {
                    prefix: name.to_string(),
                    candidates,
                }
                .into());
            }
        }
    }

    // 3. HEAD through the symbolic chain
    if name == "HEAD" {
        return repository
            .refs()
            .read_head()?
            .ok_or_else(|| RepoError::Unborn.into());
    }

    // 4. branch, 5. tag (peeled)
    if let Ok(ref_name) = RefName::try_parse(name.to_string()) {
        if let Some(oid) = repository.refs().read_branch(&ref_name)? {
            return Ok(oid);
        }
        if let Some(oid) = repository.refs().read_tag(&ref_name)? {
            return repository.database().peel(&oid);
        }
    }

    Err(RepoError::BadRevision(name.to_string()).into())
}

fn nth_parent_of(
    oid: &ObjectId,
    n: usize,
    repository: &Repository,
) -> anyhow::Result<ObjectId> {
    let commit = repository
        .database()
        .parse_commit(oid)?
        .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", oid))?;

    if n == 0 || n > commit.parents().len() {
        return Err(RepoError::BadRevision(format!("{}^{}", oid.short(), n)).into());
    }

    Ok(commit.parents()[n - 1].clone())
}
