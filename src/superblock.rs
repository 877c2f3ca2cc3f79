use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, Result, SuperBlock};

/// Reads and validates the superblock at block 0.
///
/// The magic number must match after endian conversion, and the recorded
/// geometry must agree with what the device itself reports.
pub fn read_superblock<D: BlockDevice>(device: &D) -> Result<SuperBlock> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    device.read_block(SUPERBLOCK_ID, buf.as_mut())?;
    let superblock = SuperBlock::decode(&buf);

    if superblock.magic != MAGIC {
        return Err(FsError::NotGenericFs(superblock.magic));
    }
    if superblock.block_size != BLOCK_SIZE as u32 {
        return Err(FsError::InconsistentGeometry("block size is not 4096"));
    }
    if superblock.total_blocks != device.num_blocks() as u32 {
        return Err(FsError::InconsistentGeometry(
            "total blocks does not match the partition size",
        ));
    }

    log::debug!(
        "superblock: {} blocks, freemaps {} blocks each, inode table {} blocks",
        superblock.total_blocks,
        superblock.inodefreemap_blocks,
        superblock.inodetable_blocks
    );
    Ok(superblock)
}

/// Writes the superblock to block 0. Everything outside the header fields is
/// sentinel fill.
pub fn write_superblock<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<()> {
    let mut buf = Box::new([UNUSED_SPACE; BLOCK_SIZE]);
    superblock.encode(buf.as_mut());
    device.write_block(SUPERBLOCK_ID, buf.as_ref())?;
    device.flush()?;
    Ok(())
}

impl SuperBlock {
    /// Computes the layout for a partition of `total_blocks` blocks.
    ///
    /// One inode per block, so both freemaps are the same size. Disk inodes
    /// are 64 bytes.
    pub fn new(total_blocks: u32) -> Result<Self> {
        let mut freemap_bytesize = total_blocks / 8;
        if total_blocks % 8 != 0 {
            freemap_bytesize += 1;
        }
        let mut freemap_blocksize = freemap_bytesize / BLOCK_SIZE as u32;
        if freemap_bytesize % BLOCK_SIZE as u32 != 0 {
            freemap_blocksize += 1;
        }

        let inodetable_bytesize = total_blocks as u64 * INODE_SIZE as u64;
        let mut inodetable_blocksize = (inodetable_bytesize / BLOCK_SIZE as u64) as u32;
        if inodetable_bytesize % BLOCK_SIZE as u64 != 0 {
            inodetable_blocksize += 1;
        }

        let superblock = SuperBlock {
            magic: MAGIC,
            block_size: BLOCK_SIZE as u32,
            total_blocks,
            inodefreemap_blocks: freemap_blocksize,
            blockfreemap_blocks: freemap_blocksize,
            inodetable_blocks: inodetable_blocksize,
        };

        // The initializer marks all preallocated bits within the first
        // freemap block; a layout needing more than that is rejected.
        if superblock.preallocated_blocks() as usize > BLOCK_BITS {
            return Err(FsError::PartitionTooSmall);
        }
        if superblock.preallocated_blocks() >= total_blocks {
            return Err(FsError::PartitionTooSmall);
        }

        Ok(superblock)
    }
}
