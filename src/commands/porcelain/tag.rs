use crate::areas::repository::Repository;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::revision::ref_name::RefName;
use crate::artifacts::revision::revision::Revision;
use std::io::Write;

impl Repository {
    /// List tags, or create a lightweight or annotated tag.
    pub fn tag(
        &self,
        name: Option<&str>,
        rev: Option<&str>,
        message: Option<&str>,
    ) -> anyhow::Result<()> {
        let Some(name) = name else {
            for (sym_ref, _) in self.refs().list_tags()? {
                writeln!(self.writer(), "{}", sym_ref.short_name())?;
            }
            return Ok(());
        };
        let name = RefName::try_parse(name.to_string())?;

        let target_oid = match rev {
            Some(rev) => Revision::resolve_expression(rev, self)?,
            None => self.head_oid()?,
        };

        match message {
            // annotated: a tag object in the store, the ref points at it
            Some(message) => {
                let target_type = self.database().kind_of(&target_oid)?;
                let tag = Tag::new(
                    target_oid,
                    target_type,
                    name.to_string(),
                    self.author()?,
                    message.to_string(),
                );
                let tag_oid = self.database().store(&tag)?;
                self.refs().create_tag(&name, &tag_oid)?;
            }
            // lightweight: the ref points straight at the target
            None => {
                self.refs().create_tag(&name, &target_oid)?;
            }
        }

        Ok(())
    }
}
