//! File system consistency check.
//!
//! The freemaps are a cache of what the inode table and directory graph
//! already encode; the verifier reconstructs ground truth from the latter
//! and reports every disagreement. It never modifies the partition.

use core::fmt;

use crate::config::*;
use crate::endian::get_u32;
use crate::freemap::FreemapRange;
use crate::inode::read_inode;
use crate::{directory, BlockDevice, Result, SuperBlock};

/// One inconsistency discovered by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finding {
    /// A block is referenced more than once across metadata and inodes.
    MultipleUse { block: u32, count: u32 },
    /// The block freemap says allocated, but nothing references the block.
    AllocatedButUnused { block: u32 },
    /// The block freemap says free, but something references the block.
    UnallocatedInUse { block: u32 },
    /// An inode's nlinks disagrees with the directory entries naming it.
    LinkCountWrong {
        inode: u32,
        nlinks: u32,
        references: u32,
    },
    /// Directory entries name an inode the inode freemap says is free.
    DanglingReference { inode: u32, references: u32 },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::MultipleUse { block, count } => {
                write!(f, "block used multiple times: block={block}, count={count}")
            }
            Finding::AllocatedButUnused { block } => {
                write!(f, "block allocated but not used: block={block}")
            }
            Finding::UnallocatedInUse { block } => {
                write!(f, "unallocated block in use: block={block}")
            }
            Finding::LinkCountWrong {
                inode,
                nlinks,
                references,
            } => write!(
                f,
                "wrong link count: inode={inode}, nlinks={nlinks}, directory references={references}"
            ),
            Finding::DanglingReference { inode, references } => write!(
                f,
                "unallocated inode referenced by directories: inode={inode}, references={references}"
            ),
        }
    }
}

fn report(findings: &mut Vec<Finding>, finding: Finding) {
    log::warn!("{finding}");
    findings.push(finding);
}

/// Calls `visit(object, allocated)` for every bit of a freemap, in object
/// order, stopping at the number of tracked objects.
fn for_each_bit<D, F>(device: &D, range: FreemapRange, mut visit: F) -> Result<()>
where
    D: BlockDevice,
    F: FnMut(u32, bool) -> Result<()>,
{
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    let mut object = 0u32;
    for block_id in range.start_block..range.end_block {
        device.read_block(block_id, buf.as_mut())?;
        for byte in buf.iter() {
            for bit in 0..8 {
                visit(object, byte & (1 << bit) != 0)?;
                object += 1;
                if object == range.total_items {
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

/// Counts a block reference, ignoring pointers that fall outside the
/// partition (possible on a corrupted image).
fn bump(counters: &mut [u32], block_id: u32) {
    match counters.get_mut(block_id as usize) {
        Some(counter) => *counter += 1,
        None => log::warn!("ignoring out-of-range block pointer {block_id}"),
    }
}

/// Counts the first-indirect block itself, then every data block it lists.
/// The first zero entry ends the useful data; file size is never consulted.
fn find_first_indirection_blocks<D: BlockDevice>(
    device: &D,
    first_indirect: u32,
    counters: &mut [u32],
) -> Result<()> {
    bump(counters, first_indirect);
    if counters.get(first_indirect as usize).is_none() {
        return Ok(());
    }

    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    device.read_block(first_indirect, buf.as_mut())?;
    for i in 0..PTRS_PER_BLOCK {
        let block_id = get_u32(buf.as_ref(), 4 * i);
        if block_id == 0 {
            break;
        }
        bump(counters, block_id);
    }
    Ok(())
}

/// Counts the second-indirect block, then recurses into each first-indirect
/// block it lists.
fn find_second_indirection_blocks<D: BlockDevice>(
    device: &D,
    second_indirect: u32,
    counters: &mut [u32],
) -> Result<()> {
    bump(counters, second_indirect);
    if counters.get(second_indirect as usize).is_none() {
        return Ok(());
    }

    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    device.read_block(second_indirect, buf.as_mut())?;
    for i in 0..PTRS_PER_BLOCK {
        let block_id = get_u32(buf.as_ref(), 4 * i);
        if block_id == 0 {
            break;
        }
        find_first_indirection_blocks(device, block_id, counters)?;
    }
    Ok(())
}

/// Counts every block attached to one inode: direct slots, then both
/// indirection chains.
fn find_inode_blocks<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    inode_number: u32,
    counters: &mut [u32],
) -> Result<()> {
    let inode = read_inode(device, superblock, inode_number)?;

    for block_id in inode.blocks {
        if block_id != 0 {
            bump(counters, block_id);
        }
    }
    if inode.first_indirect != 0 {
        find_first_indirection_blocks(device, inode.first_indirect, counters)?;
    }
    if inode.second_indirect != 0 {
        find_second_indirection_blocks(device, inode.second_indirect, counters)?;
    }
    Ok(())
}

/// Block side: rebuild per-block usage counts from the inode table, then
/// compare them against the block freemap.
fn check_blocks<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    findings: &mut Vec<Finding>,
) -> Result<()> {
    let mut counters = vec![0u32; superblock.total_blocks as usize];

    // The preallocated metadata blocks are in use by definition.
    for counter in counters
        .iter_mut()
        .take(superblock.preallocated_metadata_blocks() as usize)
    {
        *counter = 1;
    }

    // Every allocated inode contributes its reachable blocks.
    let mut allocated_inodes = Vec::new();
    for_each_bit(device, superblock.inode_freemap(), |inode_number, set| {
        if set {
            allocated_inodes.push(inode_number);
        }
        Ok(())
    })?;
    for inode_number in allocated_inodes {
        find_inode_blocks(device, superblock, inode_number, &mut counters)?;
    }

    for (block_id, count) in counters.iter().enumerate() {
        if *count > 1 {
            report(
                findings,
                Finding::MultipleUse {
                    block: block_id as u32,
                    count: *count,
                },
            );
        }
    }

    for_each_bit(device, superblock.block_freemap(), |block_id, set| {
        let count = counters[block_id as usize];
        if set && count != 1 {
            report(findings, Finding::AllocatedButUnused { block: block_id });
        }
        if !set && count != 0 {
            report(findings, Finding::UnallocatedInUse { block: block_id });
        }
        Ok(())
    })
}

/// Directory side: count how many directory entries name each inode, then
/// compare against nlinks and the inode freemap.
///
/// Counters start at zero for everyone, the root included: the walk itself
/// visits `.` and `..` of the root and reaches its baseline of 2.
fn check_inodes<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    findings: &mut Vec<Finding>,
) -> Result<()> {
    let total = superblock.total_blocks as usize;
    let mut counters = vec![0u32; total];
    let mut visited = vec![false; total];

    let mut pending = vec![ROOT_INODE_ID];
    visited[ROOT_INODE_ID as usize] = true;
    while let Some(dir_inode_number) = pending.pop() {
        let dir_inode = read_inode(device, superblock, dir_inode_number)?;
        for (_, entry) in directory::read_dir(device, &dir_inode)? {
            if entry.inode_id as usize >= total {
                log::warn!("ignoring out-of-range inode reference {}", entry.inode_id);
                continue;
            }
            counters[entry.inode_id as usize] += 1;
            if entry.name == DOT_NAME || entry.name == DOTDOT_NAME {
                continue;
            }
            if visited[entry.inode_id as usize] {
                continue;
            }
            let child = read_inode(device, superblock, entry.inode_id)?;
            if child.is_directory() {
                visited[entry.inode_id as usize] = true;
                pending.push(entry.inode_id);
            }
        }
    }

    let mut allocated = vec![false; total];
    for_each_bit(device, superblock.inode_freemap(), |inode_number, set| {
        allocated[inode_number as usize] = set;
        Ok(())
    })?;

    for inode_number in 0..total as u32 {
        let references = counters[inode_number as usize];
        if allocated[inode_number as usize] {
            let inode = read_inode(device, superblock, inode_number)?;
            if references != inode.nlinks {
                report(
                    findings,
                    Finding::LinkCountWrong {
                        inode: inode_number,
                        nlinks: inode.nlinks,
                        references,
                    },
                );
            }
        } else if references != 0 {
            report(
                findings,
                Finding::DanglingReference {
                    inode: inode_number,
                    references,
                },
            );
        }
    }
    Ok(())
}

/// Checks the file system for internal consistency.
///
/// All findings are collected and returned together so the caller sees the
/// full picture; an empty list means the partition is consistent.
pub fn verify<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    check_blocks(device, superblock, &mut findings)?;
    check_inodes(device, superblock, &mut findings)?;
    Ok(findings)
}
