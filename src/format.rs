//! Writing a freshly formatted GenericFS layout onto a raw partition.

use crate::config::*;
use crate::directory::init_dir_block;
use crate::superblock::write_superblock;
use crate::{BlockDevice, Inode, Result, SuperBlock};

/// Overwrites every block with the sentinel byte. Left-over data from
/// earlier runs is thrown away, and untouched regions stand out in raw
/// dumps afterwards.
fn clear_partition<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<()> {
    log::info!("clearing partition ({} blocks)", superblock.total_blocks);
    let buf = Box::new([UNUSED_SPACE; BLOCK_SIZE]);
    for block_id in 0..superblock.total_blocks {
        device.write_block(block_id, buf.as_ref())?;
    }
    Ok(())
}

/// Writes both freemaps. Inode 0 (the root directory) is the only allocated
/// inode; the block freemap starts with one set bit per preallocated block:
/// superblock, both freemaps, the inode table, and the root directory's
/// data block.
fn write_freemaps<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<()> {
    log::info!("writing free maps");
    let mut buf = Box::new([0u8; BLOCK_SIZE]);

    // Inode freemap: bit 0 of byte 0 accounts for the root.
    buf[0] |= 0x01;
    device.write_block(superblock.inode_freemap_start(), buf.as_ref())?;
    buf[0] = 0;
    for i in 1..superblock.inodefreemap_blocks {
        device.write_block(superblock.inode_freemap_start() + i, buf.as_ref())?;
    }

    // Block freemap. SuperBlock::new already guaranteed the preallocated
    // bits fit in this one block.
    let total_preallocated = superblock.preallocated_blocks() as usize;
    for byte in buf[..total_preallocated / 8].iter_mut() {
        *byte = 0xFF;
    }
    let mut leftovers = total_preallocated % 8;
    let mut mask = 0x01u8;
    while leftovers > 0 {
        buf[total_preallocated / 8] |= mask;
        mask <<= 1;
        leftovers -= 1;
    }
    device.write_block(superblock.block_freemap_start(), buf.as_ref())?;
    buf.fill(0);
    for i in 1..superblock.blockfreemap_blocks {
        device.write_block(superblock.block_freemap_start() + i, buf.as_ref())?;
    }
    Ok(())
}

/// Writes inode 0 and the root directory's data block. The root is its own
/// parent, so both `.` and `..` point back at inode 0.
fn create_root<D: BlockDevice>(device: &D, superblock: &SuperBlock, now: u32) -> Result<()> {
    log::info!("creating root directory");

    let root = Inode::new_dir(superblock.first_data_block(), now);
    // The other 63 records in this block belong to unallocated inodes, so
    // sentinel fill is fine there.
    let mut buf = Box::new([UNUSED_SPACE; BLOCK_SIZE]);
    root.encode(buf.as_mut(), 0);
    device.write_block(superblock.inode_table_start(), buf.as_ref())?;

    buf.fill(UNUSED_SPACE);
    init_dir_block(buf.as_mut(), ROOT_INODE_ID, ROOT_INODE_ID);
    device.write_block(superblock.first_data_block(), buf.as_ref())?;
    Ok(())
}

/// Initializes a partition with GenericFS.
///
/// The superblock goes out last; until then the partition carries no valid
/// magic number. `now` becomes the root directory's three timestamps.
pub fn format<D: BlockDevice>(device: &D, now: u32) -> Result<SuperBlock> {
    let superblock = SuperBlock::new(device.num_blocks() as u32)?;

    clear_partition(device, &superblock)?;
    write_freemaps(device, &superblock)?;
    create_root(device, &superblock, now)?;

    log::info!("writing super block");
    write_superblock(device, &superblock)?;
    Ok(superblock)
}
