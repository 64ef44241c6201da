//! Merge-base search
//!
//! Finds the best common ancestor of two commits: a common ancestor that is
//! not itself an ancestor of another common ancestor. The walk marks every
//! reachable commit with the side (ours/theirs) it was reached from; commits
//! carrying both marks are common ancestors, and redundant ones (reachable
//! from another candidate) are filtered out.
//!
//! Criss-cross histories can leave several best candidates; the smallest
//! object id wins, which keeps the choice deterministic across runs and
//! platforms.

use crate::areas::database::{CommitCache, Database};
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Side: u8 {
        const OURS = 0b01;
        const THEIRS = 0b10;
        const BOTH = Self::OURS.bits() | Self::THEIRS.bits();
    }
}

pub struct MergeBaseFinder<'d> {
    database: &'d Database,
    cache: CommitCache,
}

impl<'d> MergeBaseFinder<'d> {
    pub fn new(database: &'d Database) -> Self {
        Self {
            database,
            cache: CommitCache::new(),
        }
    }

    /// The best common ancestor of `ours` and `theirs`, or `None` for
    /// unrelated histories.
    pub fn find(&mut self, ours: &ObjectId, theirs: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        let common = self.common_ancestors(ours, theirs)?;
        if common.is_empty() {
            return Ok(None);
        }

        debug!(candidates = common.len(), "merge base candidates");

        // drop candidates reachable from another candidate
        let mut best = Vec::new();
        for candidate in &common {
            let redundant = common.iter().any(|other| {
                other != candidate
                    && self
                        .is_strict_ancestor(candidate, other)
                        .unwrap_or(false)
            });
            if !redundant {
                best.push(candidate.clone());
            }
        }

        // deterministic tiebreak for criss-cross histories
        best.sort();
        Ok(best.into_iter().next())
    }

    /// Mark every ancestor of both tips with the side it was reached from;
    /// the commits marked from both sides are the common ancestors.
    fn common_ancestors(
        &mut self,
        ours: &ObjectId,
        theirs: &ObjectId,
    ) -> anyhow::Result<HashSet<ObjectId>> {
        let mut marks: HashMap<ObjectId, Side> = HashMap::new();
        let mut queue: VecDeque<(ObjectId, Side)> = VecDeque::new();

        queue.push_back((ours.clone(), Side::OURS));
        queue.push_back((theirs.clone(), Side::THEIRS));

        while let Some((oid, side)) = queue.pop_front() {
            let seen = marks.entry(oid.clone()).or_insert(Side::empty());
            if seen.contains(side) {
                continue;
            }
            *seen |= side;

            for parent in self.cache.parents(self.database, &oid)? {
                queue.push_back((parent, side));
            }
        }

        Ok(marks
            .into_iter()
            .filter(|(_, side)| side.contains(Side::BOTH))
            .map(|(oid, _)| oid)
            .collect())
    }

    /// Whether `ancestor` is reachable from `descendant` without being it.
    fn is_strict_ancestor(
        &mut self,
        ancestor: &ObjectId,
        descendant: &ObjectId,
    ) -> anyhow::Result<bool> {
        if ancestor == descendant {
            return Ok(false);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([descendant.clone()]);

        while let Some(oid) = queue.pop_front() {
            if !visited.insert(oid.clone()) {
                continue;
            }
            for parent in self.cache.parents(self.database, &oid)? {
                if &parent == ancestor {
                    return Ok(true);
                }
                queue.push_back(parent);
            }
        }

        Ok(false)
    }
}
