use crate::artifacts::revision::INVALID_REF_NAME_REGEX;
use anyhow::Context;
use derive_new::new;

pub const HEADS_PREFIX: &str = "refs/heads/";
pub const TAGS_PREFIX: &str = "refs/tags/";

/// A symbolic ref path relative to the repository directory: `HEAD`,
/// `refs/heads/main`, `refs/tags/v1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, new)]
pub struct SymRef(String);

impl SymRef {
    pub fn head() -> Self {
        SymRef("HEAD".to_string())
    }

    pub fn for_branch(name: &RefName) -> Self {
        SymRef(format!("{}{}", HEADS_PREFIX, name.as_ref()))
    }

    pub fn for_tag(name: &RefName) -> Self {
        SymRef(format!("{}{}", TAGS_PREFIX, name.as_ref()))
    }

    /// HEAD itself, i.e. no branch is checked out.
    pub fn is_detached(&self) -> bool {
        self.0 == "HEAD"
    }

    pub fn as_path(&self) -> &str {
        &self.0
    }

    /// The bare branch name, when this ref lives under `refs/heads/`.
    pub fn branch_name(&self) -> Option<&str> {
        self.0.strip_prefix(HEADS_PREFIX)
    }

    /// Short display form: strips the well-known prefixes.
    pub fn short_name(&self) -> &str {
        self.0
            .strip_prefix(HEADS_PREFIX)
            .or_else(|| self.0.strip_prefix(TAGS_PREFIX))
            .unwrap_or(&self.0)
    }
}

impl std::fmt::Display for SymRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated branch or tag name.
///
/// Rejects empty names, leading dots, `..`, leading/trailing slashes,
/// `.lock` suffixes, `@{`, spaces, control bytes, and the glob/refspec
/// metacharacters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    pub fn try_parse(name: String) -> anyhow::Result<Self> {
        if name.is_empty() {
            anyhow::bail!("ref name cannot be empty");
        }

        let re = regex::Regex::new(INVALID_REF_NAME_REGEX)
            .with_context(|| format!("invalid ref name regex: {INVALID_REF_NAME_REGEX}"))?;

        if re.is_match(&name) {
            anyhow::bail!("invalid ref name: '{}'", name);
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
