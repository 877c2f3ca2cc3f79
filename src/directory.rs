//! Directory files as chains of variable-length records.
//!
//! A directory is an ordinary file whose bytes hold records of the form
//! `(next_offset, inode_number, name_length, name)`. The first record sits
//! at offset 0 and `next_offset == 0` ends the chain. Walking operates on
//! the whole materialized file so multi-block directories read correctly;
//! appending stays within the first block, which is where the tool puts
//! every entry it creates.

use crate::config::*;
use crate::endian::{get_u32, put_u32};
use crate::error::FsError;
use crate::inode::{bmap, materialize_file};
use crate::{BlockDevice, DirEntry, Inode, Result};

/// Parses the record chain out of a materialized directory file.
///
/// Returns each record together with its byte offset. Offsets must strictly
/// increase and every record must fit inside its containing block; a chain
/// violating either is reported as corrupt rather than followed.
pub fn dir_entries(raw: &[u8]) -> Result<Vec<(u32, DirEntry)>> {
    let mut entries = Vec::new();
    let mut position = 0usize;

    loop {
        if position + DIR_ENTRY_HEADER > raw.len() {
            return Err(FsError::CorruptDirectory(position as u32));
        }
        let next = get_u32(raw, position);
        let inode_id = get_u32(raw, position + 4);
        let name_length = raw[position + 8] as usize;

        // A record never spans blocks.
        if position % BLOCK_SIZE + DIR_ENTRY_HEADER + name_length > BLOCK_SIZE
            || position + DIR_ENTRY_HEADER + name_length > raw.len()
        {
            return Err(FsError::CorruptDirectory(position as u32));
        }
        let name = raw[position + 9..position + 9 + name_length].to_vec();
        entries.push((
            position as u32,
            DirEntry {
                next,
                inode_id,
                name,
            },
        ));

        if next == 0 {
            break;
        }
        if next as usize <= position {
            return Err(FsError::CorruptDirectory(next));
        }
        position = next as usize;
    }

    Ok(entries)
}

/// Materializes `dir_inode`'s file and walks its chain.
pub fn read_dir<D: BlockDevice>(device: &D, dir_inode: &Inode) -> Result<Vec<(u32, DirEntry)>> {
    let raw = materialize_file(device, dir_inode)?;
    dir_entries(&raw)
}

/// Search for a name in a directory. Returns the inode number it binds to.
pub fn dir_lookup<D: BlockDevice>(device: &D, dir_inode: &Inode, name: &[u8]) -> Result<u32> {
    for (_, entry) in read_dir(device, dir_inode)? {
        if entry.name == name {
            return Ok(entry.inode_id);
        }
    }
    Err(FsError::NotFound)
}

/// Appends a record to a directory by linking it after the current tail.
///
/// The new record lands at `tail + header + tail_name_length`, which must
/// still be inside the directory's first block.
pub fn dir_append<D: BlockDevice>(device: &D, dir_inode: &Inode, entry: &DirEntry) -> Result<()> {
    if dir_lookup(device, dir_inode, &entry.name).is_ok() {
        return Err(FsError::AlreadyExists);
    }

    let block_id = bmap(device, dir_inode, 0)?;
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    device.read_block(block_id, buf.as_mut())?;

    // Walk to the tail record.
    let mut position = 0usize;
    loop {
        let next = get_u32(buf.as_ref(), position);
        if next == 0 {
            break;
        }
        if next as usize <= position || next as usize + DIR_ENTRY_HEADER > BLOCK_SIZE {
            return Err(FsError::CorruptDirectory(next));
        }
        position = next as usize;
    }

    let tail_name_length = buf[position + 8] as usize;
    let new_offset = position + DIR_ENTRY_HEADER + tail_name_length;
    if new_offset + entry.encoded_len() > BLOCK_SIZE {
        return Err(FsError::DirectoryFull);
    }

    entry.encode(buf.as_mut(), new_offset);
    put_u32(buf.as_mut(), new_offset, 0);
    put_u32(buf.as_mut(), position, new_offset as u32);
    device.write_block(block_id, buf.as_ref())?;
    Ok(())
}

/// Lays out a directory's first block: `.` then `..`. The root is its own
/// parent, so the initializer passes the same inode for both.
pub fn init_dir_block(buf: &mut [u8; BLOCK_SIZE], self_inode: u32, parent_inode: u32) {
    let dot = DirEntry {
        next: (DIR_ENTRY_HEADER + DOT_NAME.len()) as u32,
        inode_id: self_inode,
        name: DOT_NAME.to_vec(),
    };
    let dotdot = DirEntry {
        next: 0,
        inode_id: parent_inode,
        name: DOTDOT_NAME.to_vec(),
    };
    dot.encode(buf, 0);
    dotdot.encode(buf, dot.next as usize);
}
