#![allow(unused)]

mod common;

use std::sync::Arc;

use common::RamDisk;
use genericfs::bmap;
use genericfs::materialize_file;
use genericfs::BlockDevice;
use genericfs::Error;
use genericfs::GenericFs;
use genericfs::Inode;
use genericfs::BLOCK_SIZE;
use genericfs::MAX_FILE_BLOCKS;
use genericfs::NUM_DIRECT_PTRS;
use genericfs::PTRS_PER_BLOCK;

/// First byte of file-relative block `i` under the repeating A..Z fill.
fn pattern_at_block(i: usize) -> u8 {
    b'A' + ((i * BLOCK_SIZE) % 26) as u8
}

#[test]
fn test_four_blocks_stay_direct() {
    let rd = Arc::new(RamDisk::new(256));
    let mut fs = GenericFs::format(Arc::clone(&rd)).unwrap();

    let inode_id = fs.create_file("four", 4 * BLOCK_SIZE as u32).unwrap();
    let inode = fs.read_inode(inode_id).unwrap();
    assert!(inode.blocks.iter().all(|b| *b != 0));
    assert_eq!(inode.first_indirect, 0);
    assert_eq!(inode.second_indirect, 0);

    assert_eq!(bmap(&*rd, &inode, 3).unwrap(), inode.blocks[3]);
    assert!(matches!(bmap(&*rd, &inode, 4), Err(Error::NotAllocated(4))));
    assert!(fs.verify().unwrap().is_empty());
}

#[test]
fn test_fifth_block_allocates_first_indirect() {
    let rd = Arc::new(RamDisk::new(256));
    let mut fs = GenericFs::format(Arc::clone(&rd)).unwrap();

    // One byte past four blocks forces the first indirection block.
    let inode_id = fs.create_file("big", 4 * BLOCK_SIZE as u32 + 1).unwrap();
    let inode = fs.read_inode(inode_id).unwrap();
    assert!(inode.blocks.iter().all(|b| *b != 0));
    assert_ne!(inode.first_indirect, 0);
    assert_eq!(inode.second_indirect, 0);

    let fifth = bmap(&*rd, &inode, 4).unwrap();
    assert_ne!(fifth, 0);
    let data = {
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        rd.read_block(fifth, buf.as_mut()).unwrap();
        buf
    };
    assert_eq!(data[0], pattern_at_block(4));
    assert_eq!(data[1], 0); // size ends one byte into this block

    assert!(matches!(bmap(&*rd, &inode, 5), Err(Error::NotAllocated(5))));
    assert!(fs.verify().unwrap().is_empty());
}

#[test]
fn test_first_indirect_filled_exactly() {
    let blocks = (NUM_DIRECT_PTRS + PTRS_PER_BLOCK) as u32; // 1028
    let rd = Arc::new(RamDisk::new(2048));
    let mut fs = GenericFs::format(Arc::clone(&rd)).unwrap();

    let inode_id = fs.create_file("edge", blocks * BLOCK_SIZE as u32).unwrap();
    let inode = fs.read_inode(inode_id).unwrap();
    assert_ne!(inode.first_indirect, 0);
    assert_eq!(inode.second_indirect, 0);

    assert_ne!(bmap(&*rd, &inode, blocks - 1).unwrap(), 0);
    assert!(matches!(
        bmap(&*rd, &inode, blocks),
        Err(Error::NotAllocated(_))
    ));
    assert!(fs.verify().unwrap().is_empty());
}

#[test]
fn test_one_more_block_allocates_second_indirect() {
    let blocks = (NUM_DIRECT_PTRS + PTRS_PER_BLOCK) as u32 + 1; // 1029
    let rd = Arc::new(RamDisk::new(2048));
    let mut fs = GenericFs::format(Arc::clone(&rd)).unwrap();

    let inode_id = fs.create_file("huge", blocks * BLOCK_SIZE as u32).unwrap();
    let inode = fs.read_inode(inode_id).unwrap();
    assert_ne!(inode.first_indirect, 0);
    assert_ne!(inode.second_indirect, 0);

    let last = bmap(&*rd, &inode, blocks - 1).unwrap();
    assert_ne!(last, 0);
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    rd.read_block(last, buf.as_mut()).unwrap();
    assert_eq!(buf[0], pattern_at_block(blocks as usize - 1));

    assert!(fs.verify().unwrap().is_empty());
}

#[test]
fn test_resolver_caps_at_doubly_indirect() {
    let rd = RamDisk::new(64);
    let inode = Inode::ZERO;
    let result = bmap(&rd, &inode, MAX_FILE_BLOCKS as u32);
    assert!(matches!(result, Err(Error::FileTooLarge(_))));
}

#[test]
fn test_materialize_file() {
    let rd = Arc::new(RamDisk::new(64));
    let mut fs = GenericFs::format(Arc::clone(&rd)).unwrap();

    let inode_id = fs.create_file("three", 10_000).unwrap();
    let inode = fs.read_inode(inode_id).unwrap();
    let raw = materialize_file(&*rd, &inode).unwrap();
    // Sized to whole blocks.
    assert_eq!(raw.len(), 3 * BLOCK_SIZE);
    assert_eq!(raw[0], b'A');
    assert_eq!(raw[BLOCK_SIZE], pattern_at_block(1));
    assert_eq!(raw[9_999], b'A' + (9_999 % 26) as u8);
    // Pattern stops at the file size; the tail is zero fill.
    assert_eq!(raw[10_000], 0);
}
