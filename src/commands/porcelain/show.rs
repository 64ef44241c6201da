use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::revision::revision::Revision;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// Print the object a revision names, in a form depending on its kind.
    pub fn show(&self, rev: &str) -> anyhow::Result<()> {
        let oid = Revision::resolve_expression(rev, self)?;

        match self.database().parse_object(&oid)? {
            ObjectBox::Commit(commit) => self.show_commit(&oid, &commit)?,
            ObjectBox::Tag(tag) => {
                writeln!(self.writer(), "{}", format!("tag {}", tag.name()).yellow())?;
                writeln!(self.writer(), "Tagger: {}", tag.tagger().display_name())?;
                writeln!(self.writer(), "Date:   {}", tag.tagger().readable_timestamp())?;
                writeln!(self.writer())?;
                writeln!(self.writer(), "{}", tag.message())?;
                writeln!(self.writer())?;

                // peel and show what the tag points at
                let target = self.database().peel(&oid)?;
                if let Some(commit) = self.database().parse_commit(&target)? {
                    self.show_commit(&target, &commit)?;
                }
            }
            ObjectBox::Tree(tree) => {
                writeln!(self.writer(), "{}", tree.display())?;
            }
            ObjectBox::Blob(blob) => {
                self.writer().write_all(blob.content())?;
            }
        }

        Ok(())
    }

    fn show_commit(&self, oid: &ObjectId, commit: &Commit) -> anyhow::Result<()> {
        writeln!(self.writer(), "{}", format!("commit {}", oid).yellow())?;
        writeln!(self.writer(), "Author: {}", commit.author().display_name())?;
        writeln!(self.writer(), "Date:   {}", commit.author().readable_timestamp())?;
        writeln!(self.writer())?;
        for line in commit.message().lines() {
            writeln!(self.writer(), "    {}", line)?;
        }

        Ok(())
    }
}
