//! The stateful areas of a repository
//!
//! - `database`: object store for blobs, trees, commits and tags
//! - `index`: staging area between working tree and next commit
//! - `refs`: branches, tags, HEAD, MERGE_HEAD
//! - `workspace`: working-tree file operations
//! - `config`: repository configuration and author identity
//! - `repository`: discovery and coordination of all of the above

pub mod config;
pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
pub mod workspace;
