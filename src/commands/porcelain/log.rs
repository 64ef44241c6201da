use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// Walk the first-parent chain from HEAD, newest first.
    pub fn log(&self) -> anyhow::Result<()> {
        let Some(mut current) = self.refs().read_head()? else {
            writeln!(self.writer(), "No commits yet.")?;
            return Ok(());
        };

        loop {
            let commit = self
                .database()
                .parse_commit(&current)?
                .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", current))?;

            writeln!(self.writer(), "{}", format!("commit {}", current).yellow())?;
            if commit.is_merge() {
                let parents: Vec<&str> = commit
                    .parents()
                    .iter()
                    .map(|parent| parent.short())
                    .collect();
                writeln!(self.writer(), "Merge: {}", parents.join(" "))?;
            }
            writeln!(self.writer(), "Author: {}", commit.author().display_name())?;
            writeln!(self.writer(), "Date:   {}", commit.author().readable_timestamp())?;
            writeln!(self.writer())?;
            for line in commit.message().lines() {
                writeln!(self.writer(), "    {}", line)?;
            }
            writeln!(self.writer())?;

            match commit.parent() {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }

        Ok(())
    }
}
