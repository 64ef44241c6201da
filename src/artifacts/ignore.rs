//! `.gitignore` interpretation
//!
//! A `.gitignore` in any directory applies to that directory's subtree.
//! Supported patterns: literal names, `*` globs (which do not cross `/`),
//! and a trailing `/` restricting the match to directories. Patterns
//! containing `/` anchor to the file's directory; bare patterns match any
//! path component.

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const IGNORE_FILE: &str = ".gitignore";

#[derive(Debug, Clone)]
struct IgnorePattern {
    regex: Regex,
    dir_only: bool,
    anchored: bool,
}

impl IgnorePattern {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (pattern, dir_only) = match line.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (line, false),
        };
        if pattern.is_empty() {
            return None;
        }

        let anchored = pattern.contains('/');
        let regex = Regex::new(&Self::glob_to_regex(pattern)).ok()?;

        Some(IgnorePattern {
            regex,
            dir_only,
            anchored,
        })
    }

    fn glob_to_regex(pattern: &str) -> String {
        let mut out = String::from("^");
        for c in pattern.chars() {
            match c {
                '*' => out.push_str("[^/]*"),
                c => out.push_str(&regex::escape(&c.to_string())),
            }
        }
        out.push('$');
        out
    }

    /// Match against a path relative to the directory holding the ignore
    /// file.
    fn matches(&self, relative: &Path, is_dir: bool) -> bool {
        if self.anchored {
            let rel = relative.to_string_lossy();
            if !self.regex.is_match(&rel) {
                return false;
            }
            return !self.dir_only || is_dir;
        }

        let components: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect();

        for (i, component) in components.iter().enumerate() {
            if !self.regex.is_match(component) {
                continue;
            }
            let is_last = i == components.len() - 1;
            // a non-final component is a directory by construction
            if !self.dir_only || !is_last || is_dir {
                return true;
            }
        }

        false
    }
}

/// Lazily-loaded ignore rules for a working tree.
#[derive(Debug)]
pub struct IgnoreRules {
    root: PathBuf,
    cache: HashMap<PathBuf, Vec<IgnorePattern>>,
}

impl IgnoreRules {
    pub fn new(root: PathBuf) -> Self {
        IgnoreRules {
            root,
            cache: HashMap::new(),
        }
    }

    /// Whether a root-relative path is ignored by any `.gitignore` in its
    /// ancestor directories.
    pub fn is_ignored(&mut self, path: &Path, is_dir: bool) -> bool {
        // the ignore file itself is never interesting output, but it is not
        // implicitly ignored either; only patterns decide

        let mut dirs: Vec<PathBuf> = vec![PathBuf::new()];
        if let Some(parent) = path.parent() {
            let mut acc = PathBuf::new();
            for component in parent.components() {
                acc.push(component);
                dirs.push(acc.clone());
            }
        }

        for dir in dirs {
            let Ok(relative) = path.strip_prefix(&dir) else {
                continue;
            };
            let patterns = self.patterns_for(&dir);
            if patterns
                .iter()
                .any(|pattern| pattern.matches(relative, is_dir))
            {
                return true;
            }
        }

        false
    }

    fn patterns_for(&mut self, dir: &Path) -> &[IgnorePattern] {
        if !self.cache.contains_key(dir) {
            let ignore_path = self.root.join(dir).join(IGNORE_FILE);
            let patterns = std::fs::read_to_string(&ignore_path)
                .map(|content| content.lines().filter_map(IgnorePattern::parse).collect())
                .unwrap_or_default();
            self.cache.insert(dir.to_path_buf(), patterns);
        }

        &self.cache[dir]
    }
}
