//! Annotated tag object
//!
//! Header lines `object`, `type`, `tag`, `tagger`, a blank line, then the
//! message. Lightweight tags never produce an object; they are plain refs.

use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, pack};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Tag {
    target: ObjectId,
    target_type: ObjectType,
    name: String,
    tagger: Author,
    message: String,
}

impl Tag {
    /// The object this tag points at; peeling follows this until a
    /// non-tag object is reached.
    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tagger(&self) -> &Author {
        &self.tagger
    }
}

impl Packable for Tag {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let lines = vec![
            format!("object {}", self.target.as_ref()),
            format!("type {}", self.target_type.as_str()),
            format!("tag {}", self.name),
            format!("tagger {}", self.tagger.display()),
            String::new(),
            self.message.to_string(),
        ];

        pack(ObjectType::Tag, lines.join("\n").as_bytes())
    }
}

impl Unpackable for Tag {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let content = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;
        let content = String::from_utf8(content)?;
        let mut lines = content.lines();

        let target = lines
            .next()
            .and_then(|line| line.strip_prefix("object "))
            .context("invalid tag object: missing object line")?;
        let target = ObjectId::try_parse(target.to_string())?;

        let target_type = lines
            .next()
            .and_then(|line| line.strip_prefix("type "))
            .context("invalid tag object: missing type line")?;
        let target_type = ObjectType::try_from(target_type)?;

        let name = lines
            .next()
            .and_then(|line| line.strip_prefix("tag "))
            .context("invalid tag object: missing tag line")?
            .to_string();

        let tagger = lines
            .next()
            .and_then(|line| line.strip_prefix("tagger "))
            .context("invalid tag object: missing tagger line")?;
        let tagger = Author::try_from(tagger)?;

        lines.next();

        let message = lines.collect::<Vec<&str>>().join("\n");

        Ok(Tag {
            target,
            target_type,
            name,
            tagger,
            message,
        })
    }
}

impl Object for Tag {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn display(&self) -> String {
        format!(
            "object {}\ntype {}\ntag {}\ntagger {}\n\n{}",
            self.target.as_ref(),
            self.target_type.as_str(),
            self.name,
            self.tagger.display(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn roundtrips_an_annotated_tag() {
        let timestamp = chrono::DateTime::parse_from_rfc3339("2024-06-01T09:00:00+00:00").unwrap();
        let tagger =
            Author::new_with_timestamp("Tagger".into(), "tagger@example.com".into(), timestamp);
        let target = ObjectId::try_parse("d4".repeat(20)).unwrap();
        let tag = Tag::new(target, ObjectType::Commit, "v1.0".into(), tagger, "release".into());

        let serialized = tag.serialize().unwrap();
        let header_end = serialized.iter().position(|&b| b == 0).unwrap();
        let parsed = Tag::deserialize(Cursor::new(serialized.slice(header_end + 1..))).unwrap();

        assert_eq!(parsed, tag);
        assert_eq!(parsed.target_type(), ObjectType::Commit);
    }
}
