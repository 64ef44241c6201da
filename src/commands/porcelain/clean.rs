use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::StatusScan;
use std::io::Write;

impl Repository {
    /// List (`-n`) or remove (`-f`) untracked files; directories only with
    /// `-d`.
    pub fn clean(&self, force: bool, include_dirs: bool) -> anyhow::Result<()> {
        let mut index = self.index_mut();
        index.load()?;

        let info = StatusScan::new(self).scan(&mut index)?;

        for path in &info.untracked {
            let is_dir = self.workspace().is_dir(path);
            if is_dir && !include_dirs {
                continue;
            }

            let display = if is_dir {
                format!("{}/", path.display())
            } else {
                path.display().to_string()
            };

            if force {
                self.workspace().remove_file(path)?;
                writeln!(self.writer(), "Removing {}", display)?;
            } else {
                writeln!(self.writer(), "Would remove {}", display)?;
            }
        }

        Ok(())
    }
}
