use crate::config::*;
use crate::endian::{get_u32, put_u32};
use crate::error::FsError;
use crate::Result;

/// The superblock as stored in block 0. All fields are little-endian on
/// disk; the rest of the block is sentinel fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub magic: u32,
    pub block_size: u32,
    pub total_blocks: u32,
    pub inodefreemap_blocks: u32,
    pub blockfreemap_blocks: u32,
    pub inodetable_blocks: u32,
}

impl SuperBlock {
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Self {
        SuperBlock {
            magic: get_u32(buf, 0),
            block_size: get_u32(buf, 4),
            total_blocks: get_u32(buf, 8),
            inodefreemap_blocks: get_u32(buf, 12),
            blockfreemap_blocks: get_u32(buf, 16),
            inodetable_blocks: get_u32(buf, 20),
        }
    }

    /// Overlays the header fields on `buf`. The caller decides what the rest
    /// of the block holds.
    pub fn encode(&self, buf: &mut [u8; BLOCK_SIZE]) {
        put_u32(buf, 0, self.magic);
        put_u32(buf, 4, self.block_size);
        put_u32(buf, 8, self.total_blocks);
        put_u32(buf, 12, self.inodefreemap_blocks);
        put_u32(buf, 16, self.blockfreemap_blocks);
        put_u32(buf, 20, self.inodetable_blocks);
    }

    // Layout accessors. The partition is block-indexed in this order:
    // superblock, inode freemap, block freemap, inode table, data.

    pub fn inode_freemap_start(&self) -> u32 {
        1
    }

    pub fn block_freemap_start(&self) -> u32 {
        1 + self.inodefreemap_blocks
    }

    pub fn inode_table_start(&self) -> u32 {
        1 + self.inodefreemap_blocks + self.blockfreemap_blocks
    }

    /// First data block; the initializer hands it to the root directory.
    pub fn first_data_block(&self) -> u32 {
        self.inode_table_start() + self.inodetable_blocks
    }

    /// Blocks holding file system metadata (superblock, both freemaps,
    /// inode table). The root directory's data block is not part of this.
    pub fn preallocated_metadata_blocks(&self) -> u32 {
        1 + 2 * self.inodefreemap_blocks + self.inodetable_blocks
    }

    /// Everything the initializer marks allocated in the block freemap,
    /// including the root directory's data block.
    pub fn preallocated_blocks(&self) -> u32 {
        self.preallocated_metadata_blocks() + 1
    }
}

/// A 64-byte inode record, by field order on disk: nlinks, owner, group,
/// mode, size, three timestamps, four direct pointers, two indirection
/// pointers, two unused slots. A zero pointer means "no block".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub nlinks: u32,
    pub owner_id: u32,
    pub group_id: u32,
    pub mode: u32,
    pub file_size: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
    pub blocks: [u32; NUM_DIRECT_PTRS],
    pub first_indirect: u32,
    pub second_indirect: u32,
    pub unused: [u32; 2],
}

impl Inode {
    pub const ZERO: Self = Self {
        nlinks: 0,
        owner_id: 0,
        group_id: 0,
        mode: 0,
        file_size: 0,
        atime: 0,
        mtime: 0,
        ctime: 0,
        blocks: [0; NUM_DIRECT_PTRS],
        first_indirect: 0,
        second_indirect: 0,
        unused: [0; 2],
    };

    /// A fresh regular-file inode with one link.
    pub fn new_file(file_size: u32, now: u32) -> Self {
        Self {
            nlinks: 1,
            mode: S_IFREG | DEFAULT_PERMS,
            file_size,
            atime: now,
            mtime: now,
            ctime: now,
            ..Self::ZERO
        }
    }

    /// A fresh directory inode. Link count starts at 2 for `.` and the
    /// parent's entry.
    pub fn new_dir(first_block: u32, now: u32) -> Self {
        Self {
            nlinks: 2,
            mode: S_IFDIR | DEFAULT_PERMS,
            file_size: BLOCK_SIZE as u32,
            atime: now,
            mtime: now,
            ctime: now,
            blocks: [first_block, 0, 0, 0],
            ..Self::ZERO
        }
    }

    pub fn is_directory(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_regular_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    /// Number of data blocks the file spans.
    pub fn block_count(&self) -> u32 {
        (self.file_size + BLOCK_SIZE as u32 - 1) / BLOCK_SIZE as u32
    }

    pub fn decode(buf: &[u8], offset: usize) -> Self {
        let mut blocks = [0u32; NUM_DIRECT_PTRS];
        for (i, slot) in blocks.iter_mut().enumerate() {
            *slot = get_u32(buf, offset + 32 + 4 * i);
        }
        Inode {
            nlinks: get_u32(buf, offset),
            owner_id: get_u32(buf, offset + 4),
            group_id: get_u32(buf, offset + 8),
            mode: get_u32(buf, offset + 12),
            file_size: get_u32(buf, offset + 16),
            atime: get_u32(buf, offset + 20),
            mtime: get_u32(buf, offset + 24),
            ctime: get_u32(buf, offset + 28),
            blocks,
            first_indirect: get_u32(buf, offset + 48),
            second_indirect: get_u32(buf, offset + 52),
            unused: [get_u32(buf, offset + 56), get_u32(buf, offset + 60)],
        }
    }

    pub fn encode(&self, buf: &mut [u8], offset: usize) {
        put_u32(buf, offset, self.nlinks);
        put_u32(buf, offset + 4, self.owner_id);
        put_u32(buf, offset + 8, self.group_id);
        put_u32(buf, offset + 12, self.mode);
        put_u32(buf, offset + 16, self.file_size);
        put_u32(buf, offset + 20, self.atime);
        put_u32(buf, offset + 24, self.mtime);
        put_u32(buf, offset + 28, self.ctime);
        for (i, slot) in self.blocks.iter().enumerate() {
            put_u32(buf, offset + 32 + 4 * i, *slot);
        }
        put_u32(buf, offset + 48, self.first_indirect);
        put_u32(buf, offset + 52, self.second_indirect);
        put_u32(buf, offset + 56, self.unused[0]);
        put_u32(buf, offset + 60, self.unused[1]);
    }
}

/// One record of a directory file: the byte offset of the next record (0
/// terminates the chain), the inode the name binds to, and the name itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub next: u32,
    pub inode_id: u32,
    pub name: Vec<u8>,
}

impl DirEntry {
    pub fn new(inode_id: u32, name: &[u8]) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_FILE_NAME_LEN {
            return Err(FsError::InvalidFileName);
        }
        Ok(Self {
            next: 0,
            inode_id,
            name: name.to_vec(),
        })
    }

    /// Bytes the record occupies on disk.
    pub fn encoded_len(&self) -> usize {
        DIR_ENTRY_HEADER + self.name.len()
    }

    pub fn encode(&self, buf: &mut [u8], offset: usize) {
        put_u32(buf, offset, self.next);
        put_u32(buf, offset + 4, self.inode_id);
        buf[offset + 8] = self.name.len() as u8;
        buf[offset + 9..offset + 9 + self.name.len()].copy_from_slice(&self.name);
    }
}
