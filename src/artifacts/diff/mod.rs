//! Diff algorithms
//!
//! - `myers`: shortest-edit-script line diff and unified-diff hunk grouping
//! - `tree_diff`: file-level comparison of two directory snapshots
//!
//! The line diff also feeds the merge engine, which aligns two edit scripts
//! against a common base.

pub mod myers;
pub mod tree_diff;
