use crate::areas::repository::Repository;
use crate::artifacts::ignore::IgnoreRules;
use crate::artifacts::index::index_entry::IndexEntry;
use std::path::Path;

impl Repository {
    /// Stage the current content of files or directory trees.
    pub fn add(&self, paths: &[String]) -> anyhow::Result<()> {
        let mut index = self.index_mut();
        index.load()?;

        let mut ignore = IgnoreRules::new(self.workspace().path().to_path_buf());

        for path in paths {
            let path = Path::new(path);
            let explicit_file = !self.workspace().is_dir(path);

            // list_files fails when the pathspec matches nothing
            for file in self.workspace().list_files(Some(path))? {
                // expanding a directory skips ignored files; naming a file
                // stages it regardless
                if !explicit_file && ignore.is_ignored(&file, false) {
                    continue;
                }

                let blob = self.workspace().parse_blob(&file)?;
                let oid = self.database().store(&blob)?;
                let stat = self.workspace().stat_file(&file)?;

                index.add(IndexEntry::new(file, oid, stat));
            }
        }

        index.write_updates()?;

        Ok(())
    }
}
