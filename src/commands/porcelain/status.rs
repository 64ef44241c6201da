use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::StatusScan;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// Classify every path as staged, unstaged or untracked.
    pub fn status(&self, porcelain: bool) -> anyhow::Result<()> {
        let mut index = self.index_mut();
        index.load()?;

        let info = StatusScan::new(self).scan(&mut index)?;

        // persist refreshed stat data; purely an optimisation for the next
        // scan, so a held lock is not an error here
        let _ = index.write_updates();

        if porcelain {
            for (path, change) in &info.changes {
                writeln!(self.writer(), "{} {}", change.porcelain(), path.display())?;
            }
            for path in &info.untracked {
                let suffix = if self.workspace().is_dir(path) { "/" } else { "" };
                writeln!(self.writer(), "?? {}{}", path.display(), suffix)?;
            }
            return Ok(());
        }

        self.print_branch_state()?;

        let staged: Vec<_> = info.staged().collect();
        if !staged.is_empty() {
            writeln!(self.writer(), "Changes to be committed:")?;
            for (path, change) in staged {
                writeln!(self.writer(), "        {}{}", change.label(), path.display())?;
            }
            writeln!(self.writer())?;
        }

        let unstaged: Vec<_> = info.unstaged().collect();
        if !unstaged.is_empty() {
            writeln!(self.writer(), "Changes not staged for commit:")?;
            for (path, change) in unstaged {
                writeln!(self.writer(), "        {}{}", change.label(), path.display())?;
            }
            writeln!(self.writer())?;
        }

        if !info.untracked.is_empty() {
            writeln!(self.writer(), "Untracked files:")?;
            for path in &info.untracked {
                let suffix = if self.workspace().is_dir(path) { "/" } else { "" };
                writeln!(
                    self.writer(),
                    "        {}",
                    format!("{}{}", path.display(), suffix).red()
                )?;
            }
            writeln!(self.writer())?;
        }

        if info.is_clean() {
            writeln!(self.writer(), "nothing to commit, working tree clean")?;
        }

        Ok(())
    }

    fn print_branch_state(&self) -> anyhow::Result<()> {
        let current_ref = self.refs().current_ref()?;

        if current_ref.is_detached() {
            let head_oid = self.head_oid()?;
            writeln!(
                self.writer(),
                "HEAD detached at {}",
                head_oid.short()
            )?;
        } else {
            writeln!(self.writer(), "On branch {}", current_ref.short_name())?;
            if self.refs().read_head()?.is_none() {
                writeln!(self.writer())?;
                writeln!(self.writer(), "No commits yet")?;
            }
        }
        writeln!(self.writer())?;

        Ok(())
    }
}
