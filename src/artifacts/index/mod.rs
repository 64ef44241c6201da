//! Index file format
//!
//! The staging area is persisted as a binary file:
//!
//! ```text
//! Header (12 bytes): signature "DIRC", version 2, entry count
//! Entries: sorted by path, each padded to 8-byte alignment
//! Checksum (20 bytes): SHA-1 of all preceding bytes
//! ```

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

/// Size of the trailing SHA-1 checksum in bytes.
pub const CHECKSUM_SIZE: usize = 20;

/// Size of the index header in bytes (marker + version + entry count).
pub const HEADER_SIZE: usize = 12;

/// Magic signature identifying index files.
pub const SIGNATURE: &str = "DIRC";

/// Index file format version.
pub const VERSION: u32 = 2;
