use crate::areas::repository::Repository;
use crate::artifacts::revision::ref_name::RefName;
use crate::artifacts::revision::revision::Revision;
use std::io::Write;

impl Repository {
    /// List branches, create one, or delete one.
    pub fn branch(
        &self,
        name: Option<&str>,
        start: Option<&str>,
        delete: bool,
    ) -> anyhow::Result<()> {
        let Some(name) = name else {
            return self.list_branches();
        };
        let name = RefName::try_parse(name.to_string())?;

        if delete {
            let oid = self.refs().delete_branch(&name)?;
            writeln!(
                self.writer(),
                "Deleted branch {} (was {}).",
                name,
                oid.short()
            )?;
            return Ok(());
        }

        let start_oid = match start {
            Some(start) => Revision::resolve_commit_expression(start, self)?,
            None => self.head_oid()?,
        };

        self.refs().create_branch(&name, &start_oid)?;

        Ok(())
    }

    fn list_branches(&self) -> anyhow::Result<()> {
        let current = self.refs().current_ref()?;

        for (sym_ref, _) in self.refs().list_branches()? {
            let marker = if sym_ref == current { "*" } else { " " };
            writeln!(self.writer(), "{} {}", marker, sym_ref.short_name())?;
        }

        Ok(())
    }
}
