//! Core object traits
//!
//! Every stored object implements:
//! - `Packable`: serialization to the on-disk byte form (header included)
//! - `Unpackable`: deserialization from a reader positioned after the header
//! - `Object`: kind, display, and content-id computation
//!
//! ## Object format
//!
//! ```text
//! <kind> <size>\0<payload>
//! ```
//! compressed with zlib inside `.pygit/objects/`.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use anyhow::Result;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Compute the content id of a typed payload.
///
/// Builds `"<kind> <len>\0" + payload` and hashes it. Pure and
/// deterministic; this is the single digest definition shared by id
/// computation and the store's integrity check.
pub fn hash_object(kind: ObjectType, payload: &[u8]) -> Result<ObjectId> {
    let mut hasher = Sha1::new();
    hasher.update(format!("{} {}\0", kind.as_str(), payload.len()).as_bytes());
    hasher.update(payload);

    ObjectId::try_parse(format!("{:x}", hasher.finalize()))
}

/// Serialize a payload with its `<kind> <size>\0` header prepended.
pub(crate) fn pack(kind: ObjectType, payload: &[u8]) -> Result<Bytes> {
    let mut bytes = Vec::with_capacity(payload.len() + 16);
    bytes.write_all(format!("{} {}\0", kind.as_str(), payload.len()).as_bytes())?;
    bytes.write_all(payload)?;

    Ok(Bytes::from(bytes))
}

/// Serialization to the on-disk byte form.
pub trait Packable {
    /// Serialize the object to bytes, header included.
    fn serialize(&self) -> Result<Bytes>;
}

/// Deserialization from the on-disk byte form.
pub trait Unpackable {
    /// Deserialize the object from a reader; the header has already been
    /// consumed.
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

/// Common operations over all stored object kinds.
pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    /// Human-readable rendering, as printed by `show`.
    fn display(&self) -> String;

    /// Compute the object id by hashing the serialized form.
    fn object_id(&self) -> Result<ObjectId> {
        let content = self.serialize()?;
        let mut hasher = Sha1::new();
        hasher.update(&content);

        ObjectId::try_parse(format!("{:x}", hasher.finalize()))
    }

    /// Fan-out path this object would occupy inside the object directory.
    fn object_path(&self) -> Result<PathBuf> {
        Ok(self.object_id()?.to_path())
    }
}

/// Type-erased object, for callers that discover the kind at parse time.
pub enum ObjectBox {
    Blob(Box<Blob>),
    Tree(Box<Tree>),
    Commit(Box<Commit>),
    Tag(Box<Tag>),
}

impl ObjectBox {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectBox::Blob(_) => ObjectType::Blob,
            ObjectBox::Tree(_) => ObjectType::Tree,
            ObjectBox::Commit(_) => ObjectType::Commit,
            ObjectBox::Tag(_) => ObjectType::Tag,
        }
    }

    pub fn display(&self) -> String {
        match self {
            ObjectBox::Blob(blob) => blob.display(),
            ObjectBox::Tree(tree) => tree.display(),
            ObjectBox::Commit(commit) => commit.display(),
            ObjectBox::Tag(tag) => tag.display(),
        }
    }
}
