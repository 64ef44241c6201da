//! Loose-object database
//!
//! Content-addressed storage for blobs, trees, commits and tags. Objects are
//! zlib-compressed and stored under `.pygit/objects/<aa>/<38-hex>`; writes go
//! through a temp file and an atomic rename, reads verify the digest so a
//! corrupt or truncated object is never handed to a caller.

use crate::artifacts::core::RepoError;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable, hash_object};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Object database rooted at `.pygit/objects`.
#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Store an object, returning its id. A no-op when the object already
    /// exists (identical content always hashes to the same path).
    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        let oid = object.object_id()?;
        let object_path = self.path.join(oid.to_path());

        if !object_path.exists() {
            let parent = object_path
                .parent()
                .with_context(|| format!("invalid object path {}", object_path.display()))?;
            std::fs::create_dir_all(parent).with_context(|| {
                format!("unable to create object directory {}", parent.display())
            })?;

            self.write_object(&object_path, object.serialize()?)?;
            debug!(oid = %oid, kind = %object.object_type(), "stored object");
        }

        Ok(oid)
    }

    /// Whether an object with this id is present.
    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.path.join(oid.to_path()).exists()
    }

    /// Load and verify an object, returning its kind and payload.
    pub fn load(&self, oid: &ObjectId) -> anyhow::Result<(ObjectType, Bytes)> {
        let raw = self.read_verified(oid)?;

        let header_end = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| RepoError::Corrupt {
                oid: oid.to_string(),
                reason: "missing header terminator".into(),
            })?;
        let header = std::str::from_utf8(&raw[..header_end]).map_err(|_| RepoError::Corrupt {
            oid: oid.to_string(),
            reason: "non-UTF-8 header".into(),
        })?;
        let kind = header
            .split(' ')
            .next()
            .and_then(|kind| ObjectType::try_from(kind).ok())
            .ok_or_else(|| RepoError::Corrupt {
                oid: oid.to_string(),
                reason: format!("malformed header '{}'", header),
            })?;

        Ok((kind, raw.slice(header_end + 1..)))
    }

    /// The kind of a stored object.
    pub fn kind_of(&self, oid: &ObjectId) -> anyhow::Result<ObjectType> {
        Ok(self.load(oid)?.0)
    }

    /// Parse an object into its typed form.
    pub fn parse_object(&self, oid: &ObjectId) -> anyhow::Result<ObjectBox> {
        let (kind, payload) = self.load(oid)?;
        let reader = Cursor::new(payload);

        match kind {
            ObjectType::Blob => Ok(ObjectBox::Blob(Box::new(Blob::deserialize(reader)?))),
            ObjectType::Tree => Ok(ObjectBox::Tree(Box::new(Tree::deserialize(reader)?))),
            ObjectType::Commit => Ok(ObjectBox::Commit(Box::new(Commit::deserialize(reader)?))),
            ObjectType::Tag => Ok(ObjectBox::Tag(Box::new(Tag::deserialize(reader)?))),
        }
    }

    pub fn parse_blob(&self, oid: &ObjectId) -> anyhow::Result<Option<Blob>> {
        match self.parse_object(oid)? {
            ObjectBox::Blob(blob) => Ok(Some(*blob)),
            _ => Ok(None),
        }
    }

    pub fn parse_tree(&self, oid: &ObjectId) -> anyhow::Result<Option<Tree>> {
        match self.parse_object(oid)? {
            ObjectBox::Tree(tree) => Ok(Some(*tree)),
            _ => Ok(None),
        }
    }

    pub fn parse_commit(&self, oid: &ObjectId) -> anyhow::Result<Option<Commit>> {
        match self.parse_object(oid)? {
            ObjectBox::Commit(commit) => Ok(Some(*commit)),
            _ => Ok(None),
        }
    }

    pub fn parse_tag(&self, oid: &ObjectId) -> anyhow::Result<Option<Tag>> {
        match self.parse_object(oid)? {
            ObjectBox::Tag(tag) => Ok(Some(*tag)),
            _ => Ok(None),
        }
    }

    /// Follow tag indirection until a non-tag object is reached.
    pub fn peel(&self, oid: &ObjectId) -> anyhow::Result<ObjectId> {
        let mut current = oid.clone();
        while let Some(tag) = self.parse_tag(&current)? {
            current = tag.target().clone();
        }
        Ok(current)
    }

    /// The tree a given id names: trees directly, commits and tags through
    /// their targets.
    pub fn tree_of(&self, oid: &ObjectId) -> anyhow::Result<Tree> {
        match self.parse_object(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            ObjectBox::Commit(commit) => self.tree_of(commit.tree_oid()),
            ObjectBox::Tag(tag) => self.tree_of(tag.target()),
            ObjectBox::Blob(_) => anyhow::bail!("object {} does not name a tree", oid),
        }
    }

    /// Flatten a tree (or commit) into `path → (blob-id, mode)`.
    pub fn flatten_tree(&self, oid: &ObjectId) -> anyhow::Result<BTreeMap<PathBuf, DatabaseEntry>> {
        let mut flattened = BTreeMap::new();
        self.flatten_into(oid, Path::new(""), &mut flattened)?;
        Ok(flattened)
    }

    fn flatten_into(
        &self,
        oid: &ObjectId,
        prefix: &Path,
        out: &mut BTreeMap<PathBuf, DatabaseEntry>,
    ) -> anyhow::Result<()> {
        let tree = self.tree_of(oid)?;

        for (name, entry) in tree.entries() {
            let path = prefix.join(name);
            if entry.is_tree() {
                self.flatten_into(&entry.oid, &path, out)?;
            } else {
                out.insert(path, entry.clone());
            }
        }

        Ok(())
    }

    /// All object ids starting with the given hex prefix.
    ///
    /// Prefixes of two or more characters narrow the search to one fan-out
    /// directory; shorter ones scan all of them.
    pub fn find_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let mut matches = Vec::new();

        let dirs: Vec<String> = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{:02x}", i)).collect()
        };

        for dir_name in dirs {
            let dir_path = self.path.join(&dir_name);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&dir_path)? {
                let entry = entry?;
                let file_name = entry.file_name();
                let full_oid = format!("{}{}", dir_name, file_name.to_string_lossy());

                if full_oid.starts_with(prefix)
                    && let Ok(oid) = ObjectId::try_parse(full_oid)
                {
                    matches.push(oid);
                }
            }
        }

        matches.sort();
        Ok(matches)
    }

    /// Read, decompress, and digest-check a stored object.
    fn read_verified(&self, oid: &ObjectId) -> anyhow::Result<Bytes> {
        let object_path = self.path.join(oid.to_path());

        let compressed = std::fs::read(&object_path)
            .map_err(|_| RepoError::NotFound(oid.to_string()))?;

        let raw = Self::decompress(&compressed).map_err(|err| RepoError::Corrupt {
            oid: oid.to_string(),
            reason: format!("decompression failed: {}", err),
        })?;

        let mut reader = Cursor::new(&raw);
        let mut header = Vec::new();
        reader.read_until(b'\0', &mut header)?;
        if header.pop() != Some(b'\0') {
            return Err(RepoError::Corrupt {
                oid: oid.to_string(),
                reason: "missing header terminator".into(),
            }
            .into());
        }

        let payload = &raw[header.len() + 1..];
        let kind = std::str::from_utf8(&header)
            .ok()
            .and_then(|header| header.split(' ').next())
            .and_then(|kind| ObjectType::try_from(kind).ok())
            .ok_or_else(|| RepoError::Corrupt {
                oid: oid.to_string(),
                reason: "malformed header".into(),
            })?;

        let actual = hash_object(kind, payload)?;
        if &actual != oid {
            return Err(RepoError::Corrupt {
                oid: oid.to_string(),
                reason: format!("digest mismatch: content hashes to {}", actual),
            }
            .into());
        }

        Ok(raw)
    }

    fn write_object(&self, object_path: &Path, content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .with_context(|| format!("invalid object path {}", object_path.display()))?;
        let temp_path = object_dir.join(format!("tmp-obj-{}", rand::random::<u32>()));

        let compressed = Self::compress(&content)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("unable to open object file {}", temp_path.display()))?;
        file.write_all(&compressed)
            .with_context(|| format!("unable to write object file {}", temp_path.display()))?;
        file.sync_all()?;
        drop(file);

        // rename within the same directory makes the write atomic
        std::fs::rename(&temp_path, object_path).with_context(|| {
            format!("unable to rename object file to {}", object_path.display())
        })?;

        Ok(())
    }

    fn compress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .context("unable to compress object content")?;

        encoder
            .finish()
            .context("unable to finish compressing object content")
    }

    fn decompress(data: &[u8]) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .context("unable to decompress object content")?;

        Ok(Bytes::from(decompressed))
    }
}

/// Parent/timestamp cache for commit-graph traversal.
///
/// Merge-base search and log touch the same commits repeatedly; caching the
/// slim form avoids re-reading and re-parsing full commit objects.
#[derive(Debug, Default)]
pub struct CommitCache {
    commits: HashMap<ObjectId, SlimCommit>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slim_commit(
        &mut self,
        database: &Database,
        oid: &ObjectId,
    ) -> anyhow::Result<&SlimCommit> {
        if !self.commits.contains_key(oid) {
            let commit = database
                .parse_commit(oid)?
                .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", oid))?;

            self.commits.insert(
                oid.clone(),
                SlimCommit {
                    oid: oid.clone(),
                    parents: commit.parents().to_vec(),
                    timestamp: commit.timestamp(),
                },
            );
        }

        Ok(&self.commits[oid])
    }

    pub fn parents(
        &mut self,
        database: &Database,
        oid: &ObjectId,
    ) -> anyhow::Result<Vec<ObjectId>> {
        Ok(self.slim_commit(database, oid)?.parents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn database(dir: &TempDir) -> Database {
        Database::new(dir.path().join("objects").into_boxed_path())
    }

    #[test]
    fn stored_blobs_read_back_verbatim() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        let blob = Blob::new(Bytes::from("hello world\n"));
        let oid = db.store(&blob).unwrap();

        assert!(db.exists(&oid));
        let (kind, payload) = db.load(&oid).unwrap();
        assert_eq!(kind, ObjectType::Blob);
        assert_eq!(&payload[..], &b"hello world\n"[..]);
    }

    #[test]
    fn storing_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        let blob = Blob::new(Bytes::from("same"));
        let first = db.store(&blob).unwrap();
        let second = db.store(&blob).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn missing_objects_surface_not_found() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        let oid = ObjectId::try_parse("ab".repeat(20)).unwrap();
        let err = db.load(&oid).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RepoError>(),
            Some(RepoError::NotFound(_))
        ));
    }

    #[test]
    fn tampered_objects_surface_corrupt() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        let oid = db.store(&Blob::new(Bytes::from("payload"))).unwrap();
        let object_path = db.objects_path().join(oid.to_path());

        // overwrite with a valid zlib stream of different content
        let bogus = Database::compress(b"blob 5\0other").unwrap();
        std::fs::write(&object_path, bogus).unwrap();

        let err = db.load(&oid).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepoError>(),
            Some(RepoError::Corrupt { .. })
        ));
    }

    #[test]
    fn prefix_search_narrows_to_matches() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        let oid = db.store(&Blob::new(Bytes::from("searchable"))).unwrap();
        let matches = db.find_by_prefix(&oid.as_ref()[..6]).unwrap();

        assert_eq!(matches, vec![oid]);
    }

    proptest! {
        #[test]
        fn blob_round_trip(content in "[ -~\n]{0,256}") {
            let dir = TempDir::new().unwrap();
            let db = database(&dir);

            let oid = db.store(&Blob::new(Bytes::from(content.clone().into_bytes()))).unwrap();
            let blob = db.parse_blob(&oid).unwrap().unwrap();

            prop_assert_eq!(blob.content(), content.as_bytes());
        }
    }
}
