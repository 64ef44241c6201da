use crate::areas::repository::Repository;
use crate::artifacts::diff::myers::{HUNK_CONTEXT, build_hunks, diff_lines};
use crate::artifacts::diff::tree_diff::diff_flat;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::file_change::WorkspaceChange;
use crate::artifacts::status::inspector::Inspector;
use colored::Colorize;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Unstaged diff (index vs working tree) or, with `staged`, the staged
    /// diff (HEAD tree vs index).
    pub fn diff(&self, staged: bool) -> anyhow::Result<()> {
        let mut index = self.index_mut();
        index.load()?;

        if staged {
            let changes = diff_flat(&self.head_tree()?, &index.flatten());

            for (path, change) in &changes {
                let old_lines = self.blob_lines(change.old_entry().map(|e| &e.oid))?;
                let new_lines = self.blob_lines(change.new_entry().map(|e| &e.oid))?;
                self.print_file_diff(
                    path,
                    &old_lines,
                    &new_lines,
                    change.old_entry().is_some(),
                    change.new_entry().is_some(),
                )?;
            }
            return Ok(());
        }

        let inspector = Inspector::new(self);
        let entries: Vec<_> = index.entries().cloned().collect();

        for entry in entries {
            let stat = self.workspace().stat_file(&entry.name).ok();
            let change = inspector.check_index_against_workspace(Some(&entry), stat.as_ref())?;

            match change {
                WorkspaceChange::Modified => {
                    let old_lines = self.blob_lines(Some(&entry.oid))?;
                    let new_lines = self.workspace().parse_blob(&entry.name)?.lines();
                    self.print_file_diff(&entry.name, &old_lines, &new_lines, true, true)?;
                }
                WorkspaceChange::Deleted => {
                    let old_lines = self.blob_lines(Some(&entry.oid))?;
                    self.print_file_diff(&entry.name, &old_lines, &[], true, false)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn blob_lines(&self, oid: Option<&ObjectId>) -> anyhow::Result<Vec<String>> {
        match oid {
            None => Ok(Vec::new()),
            Some(oid) => {
                let blob = self
                    .database()
                    .parse_blob(oid)?
                    .ok_or_else(|| anyhow::anyhow!("entry {} is not a blob", oid))?;
                Ok(blob.lines())
            }
        }
    }

    fn print_file_diff(
        &self,
        path: &Path,
        old_lines: &[String],
        new_lines: &[String],
        old_exists: bool,
        new_exists: bool,
    ) -> anyhow::Result<()> {
        let edits = diff_lines(old_lines, new_lines);
        let hunks = build_hunks(&edits, HUNK_CONTEXT);
        if hunks.is_empty() {
            return Ok(());
        }

        writeln!(
            self.writer(),
            "{}",
            format!("diff --git a/{} b/{}", path.display(), path.display()).bold()
        )?;
        let old_label = if old_exists {
            format!("a/{}", path.display())
        } else {
            "/dev/null".to_string()
        };
        let new_label = if new_exists {
            format!("b/{}", path.display())
        } else {
            "/dev/null".to_string()
        };
        writeln!(self.writer(), "{}", format!("--- {}", old_label).bold())?;
        writeln!(self.writer(), "{}", format!("+++ {}", new_label).bold())?;

        for hunk in hunks {
            writeln!(self.writer(), "{}", hunk.header().cyan())?;
            for edit in hunk.edits() {
                let rendered = edit.render();
                let colored = match rendered.chars().next() {
                    Some('-') => rendered.red(),
                    Some('+') => rendered.green(),
                    _ => rendered.normal(),
                };
                writeln!(self.writer(), "{}", colored)?;
            }
        }

        Ok(())
    }
}
