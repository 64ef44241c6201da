//! Blob object
//!
//! Blobs hold raw file bytes and nothing else; names and modes live in
//! trees. Content is an opaque byte sequence: no encoding is assumed, so
//! binary files store and stage like any other.
//!
//! On disk: `blob <size>\0<content>`.

use crate::artifacts::objects::object::{Object, Packable, Unpackable, pack};
use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

/// File content, addressed by its digest.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Content split on `\n` for the diff and merge engines; non-UTF-8
    /// bytes are replaced lossily per line.
    pub fn lines(&self) -> Vec<String> {
        if self.content.is_empty() {
            return Vec::new();
        }

        let mut lines: Vec<String> = self
            .content
            .split(|&byte| byte == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();

        // a trailing newline does not start another line
        if self.content.last() == Some(&b'\n') {
            lines.pop();
        }

        lines
    }
}

impl Packable for Blob {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        pack(ObjectType::Blob, &self.content)
    }
}

impl Unpackable for Blob {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let content = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;

        Ok(Self::new(Bytes::from(content)))
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn non_utf8_content_roundtrips() {
        let payload = Bytes::from(vec![0x00, 0xff, 0xfe, b'\n', 0x80, 0x81]);
        let blob = Blob::new(payload.clone());

        let serialized = blob.serialize().unwrap();
        let header_end = serialized.iter().position(|&b| b == 0).unwrap();
        let parsed = Blob::deserialize(Cursor::new(serialized.slice(header_end + 1..))).unwrap();

        assert_eq!(parsed.content(), &payload[..]);
        assert_eq!(parsed.object_id().unwrap(), blob.object_id().unwrap());
    }

    #[test]
    fn lines_drop_the_trailing_newline() {
        let blob = Blob::new(Bytes::from("a\nb\n".to_string().into_bytes()));
        assert_eq!(blob.lines(), vec!["a".to_string(), "b".to_string()]);

        let no_trailing = Blob::new(Bytes::from("a\nb".to_string().into_bytes()));
        assert_eq!(no_trailing.lines(), vec!["a".to_string(), "b".to_string()]);

        let empty = Blob::new(Bytes::new());
        assert_eq!(empty.lines(), Vec::<String>::new());
    }
}
