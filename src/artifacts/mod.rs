//! Data structures and algorithms
//!
//! - `checkout`: tree materialisation planning
//! - `core`: error taxonomy and lock files
//! - `database`: tree entry types
//! - `diff`: Myers line diff and tree diff
//! - `ignore`: `.gitignore` interpretation
//! - `index`: index entry encoding
//! - `merge`: merge base, three-way file and tree merge
//! - `objects`: blob, tree, commit and tag objects
//! - `revision`: ref names and revision resolution
//! - `stash`: the stash log
//! - `status`: working-tree classification

pub mod checkout;
pub mod core;
pub mod database;
pub mod diff;
pub mod ignore;
pub mod index;
pub mod merge;
pub mod objects;
pub mod revision;
pub mod stash;
pub mod status;
