//! Staging area
//!
//! An ordered map from working-tree paths to staged blob ids and metadata,
//! persisted in the binary format described in `artifacts::index`. The index
//! bridges the working tree and the next tree: `add`/`rm` mutate it, commit
//! turns it into trees, checkout replaces it from a tree.
//!
//! A staged deletion is the absence of an entry for a path present in HEAD's
//! tree; the status engine derives the staged state by diffing.

use crate::areas::database::Database;
use crate::artifacts::core::Lockfile;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{ENTRY_BLOCK, ENTRY_MIN_SIZE, EntryMetadata, IndexEntry};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use anyhow::anyhow;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

/// The staging area: sorted, duplicate-free entries plus a directory map for
/// fast parent/child lookups.
#[derive(Debug)]
pub struct Index {
    path: Box<Path>,
    entries: BTreeMap<PathBuf, IndexEntry>,
    children: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    header: IndexHeader,
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            header: IndexHeader::new(String::from(SIGNATURE), VERSION, 0),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the path is a tracked file or a directory containing
    /// tracked files.
    pub fn is_directly_tracked(&self, path: &Path) -> bool {
        self.entries.contains_key(path) || self.children.contains_key(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        self.entries.keys().cloned().collect()
    }

    /// The index as a flat `path → (blob-id, mode)` snapshot.
    pub fn flatten(&self) -> BTreeMap<PathBuf, DatabaseEntry> {
        self.entries
            .iter()
            .map(|(path, entry)| {
                (
                    path.clone(),
                    DatabaseEntry::new(entry.oid.clone(), entry.metadata.mode),
                )
            })
            .collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.header = IndexHeader::empty();
        self.changed = false;
    }

    /// Load the index from disk, verifying the trailing checksum. A missing
    /// or empty file yields an empty index.
    pub fn load(&mut self) -> anyhow::Result<()> {
        self.clear();

        if !self.path.exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new().read(true).open(&self.path)?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        if lock.deref_mut().metadata()?.len() == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(lock.deref_mut());
        let entries_count = self.parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;

        reader.verify()
    }

    fn parse_header<T: std::io::Read>(&self, reader: &mut Checksum<T>) -> anyhow::Result<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        let header = IndexHeader::deserialize(&header_bytes)?;

        if header.marker != SIGNATURE {
            return Err(anyhow!("invalid index file signature"));
        }
        if header.version != VERSION {
            return Err(anyhow!("unsupported index file version: {}", header.version));
        }

        Ok(header.entries_count)
    }

    fn parse_entries<T: std::io::Read>(
        &mut self,
        entries_count: u32,
        reader: &mut Checksum<T>,
    ) -> anyhow::Result<()> {
        for _ in 0..entries_count {
            let mut entry_bytes = reader.read(ENTRY_MIN_SIZE)?.to_vec();

            // entries are padded to the alignment block and end with NUL
            while entry_bytes[entry_bytes.len() - 1] != 0 {
                entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
            }

            let entry = IndexEntry::deserialize(std::io::Cursor::new(Bytes::from(entry_bytes)))?;
            self.store_entry(entry);
        }

        self.header.entries_count = entries_count;

        Ok(())
    }

    /// Upsert an entry, evicting anything it conflicts with: a file at one
    /// of its parent directories, or children when a directory becomes a
    /// file.
    pub fn add(&mut self, entry: IndexEntry) {
        self.discard_conflicts(&entry);
        self.store_entry(entry);

        self.header.entries_count = self.entries.len() as u32;
        self.changed = true;
    }

    /// Remove an entry (or a whole tracked directory) from the index. This
    /// is how deletions are staged.
    pub fn remove(&mut self, path: &Path) {
        self.remove_entry(path);
        self.remove_children(path);

        self.header.entries_count = self.entries.len() as u32;
        self.changed = true;
    }

    pub fn update_entry_stat(&mut self, entry: &IndexEntry, stat: EntryMetadata) {
        if let Some(existing) = self.entries.get_mut(&entry.name) {
            existing.metadata = stat;
            self.changed = true;
        }
    }

    fn discard_conflicts(&mut self, entry: &IndexEntry) {
        for parent in entry.parent_dirs() {
            self.remove_entry(&parent.to_path_buf());
        }
        self.remove_children(&entry.name.clone());
    }

    fn store_entry(&mut self, entry: IndexEntry) {
        for parent in entry.parent_dirs() {
            self.children
                .entry(parent.to_path_buf())
                .or_default()
                .insert(entry.name.clone());
        }

        self.entries.insert(entry.name.clone(), entry);
    }

    fn remove_entry(&mut self, path: &Path) {
        if let Some(entry) = self.entries.remove(path) {
            for parent in entry.parent_dirs() {
                let parent = parent.to_path_buf();
                if let Some(children) = self.children.get_mut(&parent) {
                    children.remove(path);
                    if children.is_empty() {
                        self.children.remove(&parent);
                    }
                }
            }
        }
    }

    fn remove_children(&mut self, path: &Path) {
        if let Some(children) = self.children.remove(path) {
            for child in children {
                self.remove_entry(&child);
            }
        }
    }

    /// Persist the index atomically through its lock file.
    pub fn write_updates(&mut self) -> anyhow::Result<()> {
        let mut lock = Lockfile::acquire(&self.path)?;

        {
            let mut writer = Checksum::new(lock.file_mut()?);

            self.header = IndexHeader {
                entries_count: self.entries.len() as u32,
                ..self.header.clone()
            };
            writer.write(&self.header.serialize()?)?;

            for entry in self.entries.values() {
                writer.write(&entry.serialize()?)?;
            }

            writer.write_checksum()?;
        }

        lock.commit()?;
        self.changed = false;

        Ok(())
    }

    /// Build trees bottom-up from the current entries, store every sub-tree,
    /// and return the root tree id.
    pub fn as_tree(&self, database: &Database) -> anyhow::Result<ObjectId> {
        let root = Tree::build(self.entries.values())?;

        root.traverse(&|tree| {
            database.store(tree)?;
            Ok(())
        })?;

        root.object_id()
    }

    /// Replace every entry at once, preserving path order.
    pub fn replace(&mut self, entries: impl IntoIterator<Item = IndexEntry>) {
        self.clear();
        for entry in entries {
            self.store_entry(entry);
        }

        self.header.entries_count = self.entries.len() as u32;
        self.changed = true;
    }

    /// Replace the index contents with the flattened entries of a stored
    /// tree. Stat metadata starts out blank and is refreshed as files are
    /// materialised or inspected.
    pub fn read_tree(&mut self, database: &Database, tree_oid: &ObjectId) -> anyhow::Result<()> {
        let flattened = database.flatten_tree(tree_oid)?;

        self.clear();
        for (path, entry) in flattened {
            let metadata = EntryMetadata {
                mode: entry.mode,
                ..Default::default()
            };
            self.store_entry(IndexEntry::new(path, entry.oid, metadata));
        }

        self.header.entries_count = self.entries.len() as u32;
        self.changed = true;

        Ok(())
    }
}
