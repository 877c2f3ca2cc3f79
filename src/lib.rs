//! GenericFS is a small Unix-like file system together with the offline
//! tooling that creates, inspects, and checks it.
//!
//! GenericFS's linear layout on a partition:
//! - Superblock
//! - Inode Freemap
//! - Block Freemap
//! - Inode Table
//! - Data Blocks
//!
//! One inode per block by construction, so both freemaps are the same size.
//!
//! The crate's layers, from bottom to top:
//! 1. Block Device: one-block reads and writes against a partition.   | User implemented (host file, raw device)
//! 2. Endian Boundary: host form vs. little-endian disk form.         | Fs implemented
//! 3. Superblock/Freemap/Inode Table: the three metadata structures.  | Fs implemented
//! 4. Directory: entry chains over materialized directory files.      | Fs implemented
//! 5. GenericFs: format, create, inspect, verify.                     | Fs implemented
//!
//! Single-threaded and synchronous throughout; callers serialize access to
//! a partition themselves.

mod block_dev;
mod config;
mod directory;
mod endian;
mod error;
mod format;
pub mod freemap;
mod fs;
mod inode;
mod structs;
mod superblock;
mod verify;

pub use block_dev::BlockDevice;
pub use config::*;
pub use directory::{dir_entries, dir_lookup, read_dir};
pub use endian::{dtoh32, htod32};
pub use error::FsError as Error;
pub use error::{FsError, Result};
pub use format::format;
pub use freemap::FreemapRange;
pub use fs::GenericFs;
pub use inode::{alloc_inode, bmap, materialize_file, read_inode, write_inode};
pub use structs::*;
pub use superblock::{read_superblock, write_superblock};
pub use verify::{verify, Finding};
