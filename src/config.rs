pub const MAGIC: u32 = 0xDEADBEEF;

pub const BLOCK_SIZE: usize = 4096;
pub const BLOCK_SIZE_BITS: usize = 12;
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8; // Allocation bits per freemap block

pub const SUPERBLOCK_ID: u32 = 0; // Block ID of the superblock
pub const ROOT_INODE_ID: u32 = 0; // Inode ID of the root directory

pub const INODE_SIZE: usize = 64;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

pub const NUM_DIRECT_PTRS: usize = 4; // Direct pointers in an inode
pub const PTRS_PER_BLOCK: usize = BLOCK_SIZE / 4; // 32-bit pointers per indirect block

/// Highest addressable file-relative block index, exclusive.
pub const MAX_FILE_BLOCKS: usize =
    NUM_DIRECT_PTRS + PTRS_PER_BLOCK + PTRS_PER_BLOCK * PTRS_PER_BLOCK;

/// Newly initialized regions are filled with this byte so changes stand out
/// in raw disk dumps.
pub const UNUSED_SPACE: u8 = 0x55;

/// Fixed per-record overhead of a directory entry: next offset, inode number,
/// name length.
pub const DIR_ENTRY_HEADER: usize = 4 + 4 + 1;
pub const MAX_FILE_NAME_LEN: usize = 255; // Name length is stored in one byte
pub const DOT_NAME: &[u8; 1] = b".";
pub const DOTDOT_NAME: &[u8; 2] = b"..";

// Unix-style mode bits, stored verbatim in the inode.
pub const S_IFMT: u32 = 0o170000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;
pub const DEFAULT_PERMS: u32 = 0o755; // rwxr-xr-x, stamped on everything the tool creates
