//! Working-tree status
//!
//! Three-way classification of every path by comparing HEAD's tree, the
//! index, and the working tree:
//!
//! - `file_change`: the change categories and their rendering
//! - `inspector`: stat-then-content change detection
//! - `status_info`: the full scan that feeds `status`, `checkout` and
//!   `clean`

pub mod file_change;
pub mod inspector;
pub mod status_info;
