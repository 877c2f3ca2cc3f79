use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gfs-disktool", version)]
#[command(about = "Create, inspect and check GenericFS partitions")]
pub struct Cli {
    /// Partition device or image file
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize the partition with a fresh file system
    Init {
        /// Create or resize the image to this many blocks first
        #[arg(long)]
        blocks: Option<u32>,
    },
    /// Display the superblock
    ShowSuper,
    /// Display the inode freemap
    ShowInodeFreemap,
    /// Display the block freemap
    ShowBlockFreemap,
    /// Display one inode
    ShowInode { inode: u32 },
    /// Hex dump one block
    ShowBlock { block: u32 },
    /// List the root directory's entry chain
    ShowRootDir,
    /// Create a pattern-filled file in the root directory
    CreateFile { name: String, size: u32 },
    /// Create a subdirectory of the root
    CreateDir { name: String },
    /// Check the file system for internal consistency
    Verify,
}
