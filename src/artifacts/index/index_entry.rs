//! Index entry encoding
//!
//! An entry is a tracked path plus the blob id of its staged content and the
//! file metadata used for fast change detection (mode, size, timestamps).
//! Entries serialize network-endian, padded to 8-byte alignment, with the
//! NUL-terminated path at the end.

use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object_id::ObjectId;
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use is_executable::IsExecutable;
use std::cmp::min;
use std::fs::Metadata;
use std::io::{BufRead, Write};
use std::os::unix::prelude::MetadataExt;
use std::path::{Path, PathBuf};

/// Maximum path length recorded in the flags field.
const MAX_PATH_SIZE: usize = 4095;

/// Alignment block for serialized entries.
pub const ENTRY_BLOCK: usize = 8;

/// Minimum serialized size of an entry in bytes.
pub const ENTRY_MIN_SIZE: usize = 64;

/// A tracked file: path, staged blob id, and stat metadata.
#[derive(Debug, Clone, Default, new)]
pub struct IndexEntry {
    /// Path relative to the repository root, `/`-separated.
    pub name: PathBuf,
    /// Blob id of the staged content.
    pub oid: ObjectId,
    /// Stat metadata for change detection.
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn basename(&self) -> anyhow::Result<&str> {
        self.name
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("invalid entry name: {}", self.name.display()))
    }

    /// Parent directories from outermost to innermost, excluding the root.
    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = Vec::new();
        let mut parent = self.name.parent();

        while let Some(dir) = parent {
            if !dir.as_os_str().is_empty() {
                dirs.push(dir);
            }
            parent = dir.parent();
        }
        dirs.reverse();

        dirs
    }

    /// Cheap comparison against fresh stat data: size and mode.
    pub fn stat_match(&self, other: &EntryMetadata) -> bool {
        (self.metadata.size == 0 || self.metadata.size == other.size)
            && self.metadata.mode == other.mode
    }

    /// Timestamp comparison; equal times let us skip re-hashing content.
    pub fn times_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.ctime == other.ctime
            && self.metadata.ctime_nsec == other.ctime_nsec
            && self.metadata.mtime == other.mtime
            && self.metadata.mtime_nsec == other.mtime_nsec
    }

    pub fn serialize(&self) -> anyhow::Result<Bytes> {
        let entry_name = self
            .name
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("invalid entry name: {}", self.name.display()))?;

        let mut bytes = Vec::new();
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ctime as u32)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ctime_nsec as u32)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mtime as u32)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mtime_nsec as u32)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.dev as u32)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ino as u32)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mode.as_u32())?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.uid)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.gid)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.size as u32)?;
        self.oid.write_binary_to(&mut bytes)?;
        bytes.write_u16::<byteorder::NetworkEndian>(self.metadata.flags as u16)?;
        bytes.write_all(entry_name.as_bytes())?;

        // at least one NUL terminator, then pad to the alignment block
        bytes.push(0);
        while bytes.len() % ENTRY_BLOCK != 0 {
            bytes.push(0);
        }

        Ok(Bytes::from(bytes))
    }

    pub fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let bytes = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;

        if bytes.len() < ENTRY_MIN_SIZE {
            anyhow::bail!("invalid index entry size: {}", bytes.len());
        }

        let ctime = byteorder::NetworkEndian::read_u32(&bytes[0..4]) as i64;
        let ctime_nsec = byteorder::NetworkEndian::read_u32(&bytes[4..8]) as i64;
        let mtime = byteorder::NetworkEndian::read_u32(&bytes[8..12]) as i64;
        let mtime_nsec = byteorder::NetworkEndian::read_u32(&bytes[12..16]) as i64;
        let dev = byteorder::NetworkEndian::read_u32(&bytes[16..20]) as u64;
        let ino = byteorder::NetworkEndian::read_u32(&bytes[20..24]) as u64;
        let mode = EntryMode::from_u32(byteorder::NetworkEndian::read_u32(&bytes[24..28]))?;
        let uid = byteorder::NetworkEndian::read_u32(&bytes[28..32]);
        let gid = byteorder::NetworkEndian::read_u32(&bytes[32..36]);
        let size = byteorder::NetworkEndian::read_u32(&bytes[36..40]) as u64;
        let mut oid_bytes = std::io::Cursor::new(&bytes[40..60]);
        let oid = ObjectId::read_binary_from(&mut oid_bytes)?;
        let flags = byteorder::NetworkEndian::read_u16(&bytes[60..62]) as u32;

        let name_end = bytes[62..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| anyhow::anyhow!("missing NUL terminator in entry name"))?;
        let name = PathBuf::from(
            std::str::from_utf8(&bytes[62..62 + name_end])
                .map_err(|_| anyhow::anyhow!("invalid UTF-8 in entry name"))?,
        );

        Ok(IndexEntry {
            name,
            oid,
            metadata: EntryMetadata {
                ctime,
                ctime_nsec,
                mtime,
                mtime_nsec,
                dev,
                ino,
                mode,
                uid,
                gid,
                size,
                flags,
            },
        })
    }
}

impl PartialEq for IndexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for IndexEntry {}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// Stat metadata recorded per entry.
///
/// Size/mode plus both timestamps with nanosecond precision allow change
/// detection without reading file content in the common case.
#[derive(Debug, Clone, Default)]
pub struct EntryMetadata {
    pub ctime: i64,
    pub ctime_nsec: i64,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub dev: u64,
    pub ino: u64,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub flags: u32,
}

impl TryFrom<(&Path, Metadata)> for EntryMetadata {
    type Error = anyhow::Error;

    fn try_from((file_path, metadata): (&Path, Metadata)) -> Result<Self, Self::Error> {
        let mode = if metadata.is_dir() {
            EntryMode::Directory
        } else if file_path.is_executable() {
            EntryMode::File(FileMode::Executable)
        } else {
            EntryMode::File(FileMode::Regular)
        };
        let path_len = file_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("invalid file path: {}", file_path.display()))?
            .len();

        Ok(Self {
            ctime: metadata.ctime(),
            ctime_nsec: metadata.ctime_nsec(),
            mtime: metadata.mtime(),
            mtime_nsec: metadata.mtime_nsec(),
            dev: metadata.dev(),
            ino: metadata.ino(),
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size(),
            flags: min(path_len, MAX_PATH_SIZE) as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object::hash_object;
    use crate::artifacts::objects::object_type::ObjectType;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use std::io::Cursor;

    #[fixture]
    fn oid() -> ObjectId {
        hash_object(ObjectType::Blob, b"test data").unwrap()
    }

    #[fixture]
    fn file_metadata() -> EntryMetadata {
        EntryMetadata {
            mode: EntryMode::File(FileMode::Regular),
            size: 9,
            mtime: 1700000000,
            ..Default::default()
        }
    }

    #[rstest]
    fn computes_parent_dirs(oid: ObjectId, file_metadata: EntryMetadata) {
        let entry = IndexEntry::new(PathBuf::from("a/b/c"), oid, file_metadata);

        assert_eq!(entry.parent_dirs(), vec![Path::new("a"), Path::new("a/b")]);
    }

    #[rstest]
    fn top_level_entry_has_no_parents(oid: ObjectId, file_metadata: EntryMetadata) {
        let entry = IndexEntry::new(PathBuf::from("a"), oid, file_metadata);

        assert_eq!(entry.parent_dirs(), Vec::<&Path>::new());
    }

    #[rstest]
    fn serialization_roundtrips(oid: ObjectId, file_metadata: EntryMetadata) {
        let entry = IndexEntry::new(PathBuf::from("dir/file.txt"), oid, file_metadata);

        let bytes = entry.serialize().unwrap();
        assert_eq!(bytes.len() % ENTRY_BLOCK, 0);

        let parsed = IndexEntry::deserialize(Cursor::new(bytes)).unwrap();
        assert_eq!(parsed.name, entry.name);
        assert_eq!(parsed.oid, entry.oid);
        assert_eq!(parsed.metadata.mode, entry.metadata.mode);
        assert_eq!(parsed.metadata.mtime, entry.metadata.mtime);
    }

    #[rstest]
    fn entries_order_by_path(oid: ObjectId, file_metadata: EntryMetadata) {
        let first = IndexEntry::new(PathBuf::from("a.txt"), oid.clone(), file_metadata.clone());
        let second = IndexEntry::new(PathBuf::from("b/a.txt"), oid, file_metadata);

        assert!(first < second);
    }
}
