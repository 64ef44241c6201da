//! Command implementations
//!
//! User-facing commands, one file per command, implemented as
//! `impl Repository` blocks so each orchestrates the areas and artifacts it
//! needs without owning any state of its own.

pub mod porcelain;
