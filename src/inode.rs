//! Reading, writing and allocating inodes in the inode table, plus the
//! file-relative block address resolver.

use crate::config::*;
use crate::endian::get_u32;
use crate::error::FsError;
use crate::freemap;
use crate::{BlockDevice, Inode, Result, SuperBlock};

/// Locates inode `inode_id` inside the inode table.
fn inode_location(superblock: &SuperBlock, inode_id: u32) -> (u32, usize) {
    let block_id = superblock.inode_table_start() + inode_id / INODES_PER_BLOCK as u32;
    let offset = INODE_SIZE * (inode_id as usize % INODES_PER_BLOCK);
    (block_id, offset)
}

/// Query an inode by its ID.
pub fn read_inode<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    inode_id: u32,
) -> Result<Inode> {
    if inode_id >= superblock.total_blocks {
        return Err(FsError::OutOfBounds(inode_id));
    }
    let (block_id, offset) = inode_location(superblock, inode_id);
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    device.read_block(block_id, buf.as_mut())?;
    Ok(Inode::decode(buf.as_ref(), offset))
}

/// Writes an inode record back to the table. The read-modify-write keeps the
/// other 63 records in the block intact.
pub fn write_inode<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    inode_id: u32,
    inode: &Inode,
) -> Result<()> {
    if inode_id >= superblock.total_blocks {
        return Err(FsError::OutOfBounds(inode_id));
    }
    let (block_id, offset) = inode_location(superblock, inode_id);
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    device.read_block(block_id, buf.as_mut())?;
    inode.encode(buf.as_mut(), offset);
    device.write_block(block_id, buf.as_ref())?;
    Ok(())
}

/// Allocates a fresh inode: marks the first free bit in the inode freemap
/// and zero-initializes the record at the computed offset. Returns the new
/// inode number.
pub fn alloc_inode<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<u32> {
    let inode_id = freemap::allocate(device, superblock.inode_freemap())?;
    write_inode(device, superblock, inode_id, &Inode::ZERO)?;
    Ok(inode_id)
}

/// Block map. Converts a file-relative block index into a partition-relative
/// block number, walking the indirection blocks as needed.
///
/// Indirect arrays are zero-terminated; requesting an index past the first
/// zero is `NotAllocated`, and an index past the doubly-indirect capacity is
/// `FileTooLarge`. File size plays no part here.
pub fn bmap<D: BlockDevice>(device: &D, inode: &Inode, block_index: u32) -> Result<u32> {
    let index = block_index as usize;

    if index < NUM_DIRECT_PTRS {
        let block_id = inode.blocks[index];
        if block_id == 0 {
            return Err(FsError::NotAllocated(block_index));
        }
        return Ok(block_id);
    }

    if index < NUM_DIRECT_PTRS + PTRS_PER_BLOCK {
        if inode.first_indirect == 0 {
            return Err(FsError::NotAllocated(block_index));
        }
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        device.read_block(inode.first_indirect, buf.as_mut())?;
        let block_id = get_u32(buf.as_ref(), 4 * (index - NUM_DIRECT_PTRS));
        if block_id == 0 {
            return Err(FsError::NotAllocated(block_index));
        }
        return Ok(block_id);
    }

    if index < MAX_FILE_BLOCKS {
        if inode.second_indirect == 0 {
            return Err(FsError::NotAllocated(block_index));
        }
        let slot = index - NUM_DIRECT_PTRS - PTRS_PER_BLOCK;
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        device.read_block(inode.second_indirect, buf.as_mut())?;
        let first_indirect = get_u32(buf.as_ref(), 4 * (slot / PTRS_PER_BLOCK));
        if first_indirect == 0 {
            return Err(FsError::NotAllocated(block_index));
        }
        device.read_block(first_indirect, buf.as_mut())?;
        let block_id = get_u32(buf.as_ref(), 4 * (slot % PTRS_PER_BLOCK));
        if block_id == 0 {
            return Err(FsError::NotAllocated(block_index));
        }
        return Ok(block_id);
    }

    Err(FsError::FileTooLarge(block_index))
}

/// Reads every block of a file, in order, into one buffer sized to whole
/// blocks. The directory engine walks entry chains over this.
pub fn materialize_file<D: BlockDevice>(device: &D, inode: &Inode) -> Result<Vec<u8>> {
    let num_blocks = inode.block_count();
    let mut raw = Vec::with_capacity(num_blocks as usize * BLOCK_SIZE);
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    for i in 0..num_blocks {
        let block_id = bmap(device, inode, i)?;
        device.read_block(block_id, buf.as_mut())?;
        raw.extend_from_slice(buf.as_ref());
    }
    Ok(raw)
}
