//! Tree materialisation
//!
//! Planning and applying the migration from the current snapshot to a
//! target tree: conflicts are detected before any write, deletions run
//! before additions, and the index is updated last.

pub mod migration;
