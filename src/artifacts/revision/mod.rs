//! Ref names and revision resolution
//!
//! - `ref_name`: validated branch/tag names and symbolic ref paths
//! - `revision`: the grammar users type (`main`, `HEAD~2`, `abc123^`, …) and
//!   its resolution to an object id
//!
//! ## Revision syntax
//!
//! - Branch and tag names: `main`, `feature/login`, `v1.0`
//! - Aliases: `@` → `HEAD`
//! - First parent: `<rev>^`; Nth parent of a merge: `<rev>^N`
//! - Nth first-parent ancestor: `<rev>~N`
//! - Object ids: full 40-hex or a unique prefix of at least 4 characters

pub mod ref_name;
pub mod revision;

/// Characters and shapes a ref name must not contain.
pub const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// `<rev>^N` — the Nth parent of a merge commit.
pub const NTH_PARENT_REGEX: &str = r"^(.+)\^(\d+)$";

/// `<rev>^` — the first parent.
pub const PARENT_REGEX: &str = r"^(.+)\^$";

/// `<rev>~N` — the Nth first-parent ancestor.
pub const ANCESTOR_REGEX: &str = r"^(.+)\~(\d+)$";

/// Revision aliases and their expansions.
pub const REV_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};
