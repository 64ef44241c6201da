//! Tree object
//!
//! A tree is a directory snapshot: entries `(mode, name, id)` sorted
//! ascending by raw name bytes, names free of `/` and NUL. Sub-trees are
//! referenced by entries with mode `40000`.
//!
//! On disk each entry is `mode SP name NUL raw-20-byte-id`, and the whole
//! payload carries the usual `tree <size>\0` header.
//!
//! Trees are built bottom-up from index entries (`build` + post-order
//! `traverse` so child ids exist before the parent is stored) and read back
//! shallowly; recursion through stored sub-trees goes through the database.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, pack};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// A node of a tree being built: a file leaf or a nested sub-tree.
#[derive(Debug, Clone)]
enum TreeNode {
    Leaf(DatabaseEntry),
    Subtree(Tree),
}

impl TreeNode {
    fn mode(&self) -> EntryMode {
        match self {
            TreeNode::Leaf(entry) => entry.mode,
            TreeNode::Subtree(_) => EntryMode::Directory,
        }
    }

    fn oid(&self) -> anyhow::Result<ObjectId> {
        match self {
            TreeNode::Leaf(entry) => Ok(entry.oid.clone()),
            TreeNode::Subtree(tree) => tree.object_id(),
        }
    }
}

/// Directory snapshot, sorted by raw name bytes.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: BTreeMap<String, TreeNode>,
}

impl Tree {
    /// Build a tree hierarchy from flat index entries.
    ///
    /// Entries are grouped by their parent directories; intermediate
    /// sub-trees are created on demand, so empty directories never appear.
    pub fn build<'e>(entries: impl Iterator<Item = &'e IndexEntry>) -> anyhow::Result<Self> {
        let mut root = Self::default();

        for entry in entries {
            let parents = entry.parent_dirs();
            root.add_entry(&parents, entry)?;
        }

        Ok(root)
    }

    fn add_entry(&mut self, parents: &[&std::path::Path], entry: &IndexEntry) -> anyhow::Result<()> {
        if parents.is_empty() {
            self.nodes.insert(
                entry.basename()?.to_string(),
                TreeNode::Leaf(DatabaseEntry::new(entry.oid.clone(), entry.metadata.mode)),
            );
            return Ok(());
        }

        let name = parents[0]
            .file_name()
            .and_then(|name| name.to_str())
            .context("invalid directory name in index entry")?
            .to_string();

        let subtree = match self
            .nodes
            .entry(name)
            .or_insert_with(|| TreeNode::Subtree(Tree::default()))
        {
            TreeNode::Subtree(tree) => tree,
            TreeNode::Leaf(_) => anyhow::bail!(
                "index entry {} collides with a file at one of its parent directories",
                entry.name.display()
            ),
        };

        subtree.add_entry(&parents[1..], entry)
    }

    /// Post-order traversal: children first, so their ids are storable
    /// before the parent tree that references them.
    pub fn traverse<F>(&self, func: &F) -> anyhow::Result<()>
    where
        F: Fn(&Tree) -> anyhow::Result<()>,
    {
        for node in self.nodes.values() {
            if let TreeNode::Subtree(tree) = node {
                tree.traverse(func)?;
            }
        }

        func(self)
    }

    /// Shallow entries of a tree read back from the store.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &DatabaseEntry)> {
        self.nodes.iter().filter_map(|(name, node)| match node {
            TreeNode::Leaf(entry) => Some((name, entry)),
            TreeNode::Subtree(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut payload = Vec::new();

        for (name, node) in &self.nodes {
            payload.write_all(format!("{} {}", node.mode().as_str(), name).as_bytes())?;
            payload.push(0);
            node.oid()?.write_binary_to(&mut payload)?;
        }

        pack(ObjectType::Tree, &payload)
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut nodes = BTreeMap::new();

        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if *mode_bytes.last().unwrap() != b' ' {
                anyhow::bail!("unexpected EOF in tree entry mode");
            }
            mode_bytes.pop();

            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || *name_bytes.last().unwrap() != b'\0' {
                anyhow::bail!("unexpected EOF in tree entry name");
            }
            name_bytes.pop();
            let name = std::str::from_utf8(&name_bytes)?.to_owned();

            let oid = ObjectId::read_binary_from(&mut reader)
                .context("unexpected EOF in tree entry id")?;

            if nodes
                .insert(name.clone(), TreeNode::Leaf(DatabaseEntry::new(oid, mode)))
                .is_some()
            {
                anyhow::bail!("duplicate tree entry name: {}", name);
            }
        }

        Ok(Tree { nodes })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.nodes
            .iter()
            .map(|(name, node)| {
                let kind = match node.mode() {
                    EntryMode::Directory => ObjectType::Tree,
                    _ => ObjectType::Blob,
                };
                format!(
                    "{} {} {}\t{}",
                    node.mode().as_str(),
                    kind.as_str(),
                    node.oid().unwrap_or_default().as_ref(),
                    name
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::FileMode;
    use crate::artifacts::index::index_entry::EntryMetadata;
    use crate::artifacts::objects::object::hash_object;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn entry(path: &str, content: &str) -> IndexEntry {
        let oid = hash_object(ObjectType::Blob, content.as_bytes()).unwrap();
        IndexEntry::new(
            PathBuf::from(path),
            oid,
            EntryMetadata {
                mode: EntryMode::File(FileMode::Regular),
                ..Default::default()
            },
        )
    }

    #[rstest]
    fn builds_nested_trees_from_flat_entries() {
        let entries = vec![entry("b.txt", "b"), entry("a/1.txt", "1"), entry("a/2.txt", "2")];
        let tree = Tree::build(entries.iter()).unwrap();

        let names: Vec<_> = tree.nodes.keys().cloned().collect();
        assert_eq!(names, vec!["a".to_string(), "b.txt".to_string()]);
    }

    #[rstest]
    fn serialization_roundtrips_shallow_entries() {
        let entries = vec![entry("a.txt", "alpha"), entry("z.txt", "omega")];
        let tree = Tree::build(entries.iter()).unwrap();

        let serialized = tree.serialize().unwrap();
        let header_end = serialized.iter().position(|&b| b == 0).unwrap();
        let parsed = Tree::deserialize(Cursor::new(serialized.slice(header_end + 1..))).unwrap();

        assert_eq!(parsed.object_id().unwrap(), tree.object_id().unwrap());
        assert_eq!(parsed.entries().count(), 2);
    }

    #[rstest]
    fn entry_order_is_independent_of_insertion_order() {
        let forward = vec![entry("a.txt", "x"), entry("m/n.txt", "y"), entry("z.txt", "z")];
        let mut backward = forward.clone();
        backward.reverse();

        let first = Tree::build(forward.iter()).unwrap().object_id().unwrap();
        let second = Tree::build(backward.iter()).unwrap().object_id().unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    fn rejects_duplicate_names_when_reading() {
        let entries = vec![entry("a.txt", "x")];
        let tree = Tree::build(entries.iter()).unwrap();
        let serialized = tree.serialize().unwrap();
        let header_end = serialized.iter().position(|&b| b == 0).unwrap();
        let payload = serialized.slice(header_end + 1..);

        let doubled: Vec<u8> = payload.iter().chain(payload.iter()).copied().collect();
        assert!(Tree::deserialize(Cursor::new(doubled)).is_err());
    }
}
