use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::*;
use crate::directory::{dir_append, dir_lookup, init_dir_block, read_dir};
use crate::endian::put_u32;
use crate::error::FsError;
use crate::format::format;
use crate::freemap;
use crate::inode::{alloc_inode, read_inode, write_inode};
use crate::superblock::read_superblock;
use crate::verify::{verify, Finding};
use crate::{BlockDevice, DirEntry, Inode, Result, SuperBlock};

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as u32)
        .unwrap_or(0)
}

/// A GenericFS partition plus its validated superblock. Operations are
/// serialized by the caller; this type performs no locking of its own.
#[derive(Debug)]
pub struct GenericFs<D: BlockDevice> {
    device: Arc<D>,
    superblock: SuperBlock,
}

impl<D: BlockDevice> GenericFs<D> {
    /// Initializes the partition with a fresh GenericFS layout and returns
    /// the mounted result.
    pub fn format(device: Arc<D>) -> Result<Self> {
        let superblock = format(&*device, unix_now())?;
        Ok(Self { device, superblock })
    }

    /// Reads and validates the superblock of an already formatted partition.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        let superblock = read_superblock(&*device)?;
        Ok(Self { device, superblock })
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }

    pub fn root_inode_id(&self) -> u32 {
        ROOT_INODE_ID
    }

    pub fn read_inode(&self, inode_id: u32) -> Result<Inode> {
        read_inode(&*self.device, &self.superblock, inode_id)
    }

    /// Raw contents of one block, for inspection.
    pub fn read_block_raw(&self, block_id: u32) -> Result<Box<[u8; BLOCK_SIZE]>> {
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        self.device.read_block(block_id, buf.as_mut())?;
        Ok(buf)
    }

    /// The root directory's entry chain, with each record's byte offset.
    pub fn read_root_dir(&self) -> Result<Vec<(u32, DirEntry)>> {
        let root = self.read_inode(ROOT_INODE_ID)?;
        read_dir(&*self.device, &root)
    }

    /// Creates a file in the root directory, filled with a repeating A..Z
    /// pattern. Blocks are allocated through direct, first-indirect and
    /// second-indirect pointers as the size requires.
    pub fn create_file(&mut self, name: &str, file_size: u32) -> Result<u32> {
        let device = &*self.device;
        let root = read_inode(device, &self.superblock, ROOT_INODE_ID)?;
        if dir_lookup(device, &root, name.as_bytes()).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let entry_template = DirEntry::new(0, name.as_bytes())?;
        let inode_id = alloc_inode(device, &self.superblock)?;

        let mut inode = Inode::new_file(file_size, unix_now());
        let data_blocks = self.allocate_file_blocks(&mut inode)?;

        dir_append(
            device,
            &root,
            &DirEntry {
                inode_id,
                ..entry_template
            },
        )?;
        write_inode(device, &self.superblock, inode_id, &inode)?;
        self.write_pattern(&data_blocks, file_size)?;

        log::info!(
            "created file '{}': inode {}, {} data blocks",
            name,
            inode_id,
            data_blocks.len()
        );
        Ok(inode_id)
    }

    /// Creates a subdirectory of the root. The child starts with `.` and
    /// `..`; the parent gains a link for the child's `..`.
    pub fn create_dir(&mut self, name: &str) -> Result<u32> {
        let device = &*self.device;
        let mut parent = read_inode(device, &self.superblock, ROOT_INODE_ID)?;
        if dir_lookup(device, &parent, name.as_bytes()).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let entry_template = DirEntry::new(0, name.as_bytes())?;
        let inode_id = alloc_inode(device, &self.superblock)?;
        let block_id = freemap::allocate(device, self.superblock.block_freemap())?;

        parent.nlinks += 1;
        write_inode(device, &self.superblock, ROOT_INODE_ID, &parent)?;
        dir_append(
            device,
            &parent,
            &DirEntry {
                inode_id,
                ..entry_template
            },
        )?;

        write_inode(
            device,
            &self.superblock,
            inode_id,
            &Inode::new_dir(block_id, unix_now()),
        )?;

        let mut buf = Box::new([UNUSED_SPACE; BLOCK_SIZE]);
        init_dir_block(buf.as_mut(), inode_id, ROOT_INODE_ID);
        device.write_block(block_id, buf.as_ref())?;

        log::info!("created directory '{}': inode {}, block {}", name, inode_id, block_id);
        Ok(inode_id)
    }

    /// Checks the partition for internal consistency. Empty means clean.
    pub fn verify(&self) -> Result<Vec<Finding>> {
        verify(&*self.device, &self.superblock)
    }

    /// Allocates every data block the inode's size calls for and wires the
    /// direct and indirect pointers. Returns the data blocks in file order.
    fn allocate_file_blocks(&self, inode: &mut Inode) -> Result<Vec<u32>> {
        let device = &*self.device;
        let block_freemap = self.superblock.block_freemap();
        let num_blocks = inode.block_count();
        if num_blocks as usize > MAX_FILE_BLOCKS {
            return Err(FsError::FileTooLarge(num_blocks));
        }

        let mut data_blocks = Vec::with_capacity(num_blocks as usize);
        for _ in 0..num_blocks {
            data_blocks.push(freemap::allocate(device, block_freemap)?);
        }

        for (slot, block_id) in inode
            .blocks
            .iter_mut()
            .zip(data_blocks.iter().take(NUM_DIRECT_PTRS))
        {
            *slot = *block_id;
        }

        let indirect = &data_blocks[NUM_DIRECT_PTRS.min(data_blocks.len())..];
        if indirect.is_empty() {
            return Ok(data_blocks);
        }

        let first_level = &indirect[..indirect.len().min(PTRS_PER_BLOCK)];
        inode.first_indirect = freemap::allocate(device, block_freemap)?;
        self.write_pointer_block(inode.first_indirect, first_level)?;

        let doubly = &indirect[first_level.len()..];
        if doubly.is_empty() {
            return Ok(data_blocks);
        }

        inode.second_indirect = freemap::allocate(device, block_freemap)?;
        let mut second_buf = Box::new([0u8; BLOCK_SIZE]);
        for (slot, chunk) in doubly.chunks(PTRS_PER_BLOCK).enumerate() {
            let first_indirect = freemap::allocate(device, block_freemap)?;
            put_u32(second_buf.as_mut(), 4 * slot, first_indirect);
            self.write_pointer_block(first_indirect, chunk)?;
        }
        device.write_block(inode.second_indirect, second_buf.as_ref())?;

        Ok(data_blocks)
    }

    /// Writes one indirect block: the given pointers, zero-terminated by the
    /// untouched remainder of the block.
    fn write_pointer_block(&self, block_id: u32, pointers: &[u32]) -> Result<()> {
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        for (i, pointer) in pointers.iter().enumerate() {
            put_u32(buf.as_mut(), 4 * i, *pointer);
        }
        self.device.write_block(block_id, buf.as_ref())
    }

    /// Fills the data blocks with the repeating A..Z pattern, zero padding
    /// the tail of the last block.
    fn write_pattern(&self, data_blocks: &[u32], file_size: u32) -> Result<()> {
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        let mut remaining = file_size as usize;
        for (i, block_id) in data_blocks.iter().enumerate() {
            buf.fill(0);
            let in_block = remaining.min(BLOCK_SIZE);
            for j in 0..in_block {
                buf[j] = b'A' + ((i * BLOCK_SIZE + j) % 26) as u8;
            }
            self.device.write_block(*block_id, buf.as_ref())?;
            remaining -= in_block;
        }
        Ok(())
    }
}
