#![allow(unused)]

mod common;

use std::sync::Arc;

use common::{poke_byte, RamDisk};
use genericfs::freemap;
use genericfs::read_inode;
use genericfs::write_inode;
use genericfs::BlockDevice;
use genericfs::DirEntry;
use genericfs::Error;
use genericfs::GenericFs;
use genericfs::Inode;
use genericfs::SuperBlock;
use genericfs::BLOCK_SIZE;
use genericfs::MAGIC;

#[test]
fn test_superblock_round_trip() {
    let rd = RamDisk::new(256);
    let superblock = SuperBlock::new(256).unwrap();
    genericfs::write_superblock(&rd, &superblock).unwrap();
    let read_back = genericfs::read_superblock(&rd).unwrap();
    assert_eq!(read_back, superblock);
    assert_eq!(read_back.magic, MAGIC);
}

#[test]
fn test_geometry_for_256_blocks() {
    let superblock = SuperBlock::new(256).unwrap();
    assert_eq!(superblock.total_blocks, 256);
    assert_eq!(superblock.block_size, BLOCK_SIZE as u32);
    assert_eq!(superblock.inodefreemap_blocks, 1);
    assert_eq!(superblock.blockfreemap_blocks, 1);
    assert_eq!(superblock.inodetable_blocks, 4);
    assert_eq!(superblock.inode_table_start(), 3);
    assert_eq!(superblock.first_data_block(), 7);
    assert_eq!(superblock.preallocated_blocks(), 8);
}

#[test]
fn test_partition_too_small() {
    // The preallocated block count has to fit in one freemap block.
    let result = SuperBlock::new(3_000_000);
    assert!(matches!(result, Err(Error::PartitionTooSmall)));

    // Nothing left for data either way.
    let result = SuperBlock::new(5);
    assert!(matches!(result, Err(Error::PartitionTooSmall)));
}

#[test]
fn test_superblock_geometry_mismatch() {
    // A superblock recorded for 256 blocks on a 300-block partition.
    let rd = RamDisk::new(300);
    let superblock = SuperBlock::new(256).unwrap();
    genericfs::write_superblock(&rd, &superblock).unwrap();
    let result = genericfs::read_superblock(&rd);
    assert!(matches!(result, Err(Error::InconsistentGeometry(_))));
}

#[test]
fn test_bad_magic_rejected() {
    let rd = Arc::new(RamDisk::new(64));
    GenericFs::format(Arc::clone(&rd)).unwrap();
    poke_byte(&*rd, 0, 0, 0x00);
    let result = GenericFs::mount(rd);
    assert!(matches!(result, Err(Error::NotGenericFs(_))));
}

#[test]
fn test_inode_round_trip() {
    let rd = Arc::new(RamDisk::new(64));
    let fs = GenericFs::format(Arc::clone(&rd)).unwrap();
    let superblock = *fs.superblock();

    let mut inode = Inode::new_file(12345, 1_700_000_000);
    inode.owner_id = 1000;
    inode.group_id = 100;
    inode.blocks = [9, 10, 11, 12];
    inode.first_indirect = 13;
    write_inode(&*rd, &superblock, 5, &inode).unwrap();

    let read_back = read_inode(&*rd, &superblock, 5).unwrap();
    assert_eq!(read_back, inode);
    // Neighbors in the same table block are untouched.
    let neighbor = read_inode(&*rd, &superblock, 0).unwrap();
    assert!(neighbor.is_directory());
}

#[test]
fn test_format_and_verify() {
    let rd = Arc::new(RamDisk::new(256));
    let fs = GenericFs::format(rd).unwrap();
    let findings = fs.verify().unwrap();
    assert!(findings.is_empty(), "fresh partition reported {findings:?}");
}

#[test]
fn test_root_dir_after_format() {
    let rd = Arc::new(RamDisk::new(256));
    let fs = GenericFs::format(rd).unwrap();

    let root = fs.read_inode(fs.root_inode_id()).unwrap();
    assert!(root.is_directory());
    assert_eq!(root.nlinks, 2);
    assert_eq!(root.file_size, BLOCK_SIZE as u32);
    assert_eq!(root.blocks[0], fs.superblock().first_data_block());
    assert_eq!(root.first_indirect, 0);
    assert_eq!(root.second_indirect, 0);

    let entries = fs.read_root_dir().unwrap();
    assert_eq!(entries.len(), 2);
    let (offset, dot) = &entries[0];
    assert_eq!((*offset, dot.next, dot.inode_id, dot.name.as_slice()), (0, 10, 0, b".".as_slice()));
    let (offset, dotdot) = &entries[1];
    assert_eq!(
        (*offset, dotdot.next, dotdot.inode_id, dotdot.name.as_slice()),
        (10, 0, 0, b"..".as_slice())
    );
    // `..` resolves to the root itself.
    let parent = fs.read_inode(dotdot.inode_id).unwrap();
    assert!(parent.is_directory());
}

#[test]
fn test_create_file_hello() {
    let rd = Arc::new(RamDisk::new(256));
    let mut fs = GenericFs::format(Arc::clone(&rd)).unwrap();
    let superblock = *fs.superblock();

    let inode_id = fs.create_file("hello", 10).unwrap();
    assert_eq!(inode_id, 1);

    // Inode 1 allocated, one data block right after the preallocated run.
    assert!(freemap::is_set(&*rd, superblock.inode_freemap(), 1).unwrap());
    assert!(freemap::is_set(&*rd, superblock.block_freemap(), 8).unwrap());
    assert!(!freemap::is_set(&*rd, superblock.block_freemap(), 9).unwrap());

    let inode = fs.read_inode(inode_id).unwrap();
    assert!(inode.is_regular_file());
    assert_eq!(inode.nlinks, 1);
    assert_eq!(inode.file_size, 10);
    assert_eq!(inode.blocks[0], 8);
    assert_eq!(inode.blocks[1], 0);
    assert_eq!(inode.first_indirect, 0);

    // Chain: "." -> ".." -> "hello", each record right behind its
    // predecessor.
    let entries = fs.read_root_dir().unwrap();
    for (offset, entry) in &entries {
        log!(
            "offset {} next {} inode {} name {}",
            offset,
            entry.next,
            entry.inode_id,
            String::from_utf8_lossy(&entry.name)
        );
    }
    let chain: Vec<(u32, u32, u32, &[u8])> = entries
        .iter()
        .map(|(offset, e)| (*offset, e.next, e.inode_id, e.name.as_slice()))
        .collect();
    assert_eq!(
        chain,
        vec![
            (0, 10, 0, b".".as_slice()),
            (10, 21, 0, b"..".as_slice()),
            (21, 0, 1, b"hello".as_slice()),
        ]
    );

    // File content is the repeating pattern, zero padded.
    let data = fs.read_block_raw(inode.blocks[0]).unwrap();
    assert_eq!(&data[..10], b"ABCDEFGHIJ");
    assert_eq!(data[10], 0);

    assert!(fs.verify().unwrap().is_empty());
}

#[test]
fn test_create_empty_file() {
    let rd = Arc::new(RamDisk::new(64));
    let mut fs = GenericFs::format(rd).unwrap();
    let inode_id = fs.create_file("empty", 0).unwrap();
    let inode = fs.read_inode(inode_id).unwrap();
    assert_eq!(inode.file_size, 0);
    assert_eq!(inode.blocks, [0; 4]);
    assert_eq!(inode.first_indirect, 0);
    assert!(fs.verify().unwrap().is_empty());
}

#[test]
fn test_repeated_create() {
    let rd = Arc::new(RamDisk::new(64));
    let mut fs = GenericFs::format(rd).unwrap();
    fs.create_file("twice", 10).unwrap();
    let result = fs.create_file("twice", 10);
    assert!(matches!(result, Err(Error::AlreadyExists)));
}

#[test]
fn test_create_dir() {
    let rd = Arc::new(RamDisk::new(256));
    let mut fs = GenericFs::format(Arc::clone(&rd)).unwrap();

    let inode_id = fs.create_dir("mydir").unwrap();
    assert_eq!(inode_id, 1);

    // The child's `..` gives the root a third link.
    let root = fs.read_inode(fs.root_inode_id()).unwrap();
    assert_eq!(root.nlinks, 3);

    let child = fs.read_inode(inode_id).unwrap();
    assert!(child.is_directory());
    assert_eq!(child.nlinks, 2);
    assert_eq!(child.file_size, BLOCK_SIZE as u32);
    assert_ne!(child.blocks[0], 0);

    let raw = genericfs::materialize_file(&*rd, &child).unwrap();
    let entries = genericfs::dir_entries(&raw).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].1.name, b".");
    assert_eq!(entries[0].1.inode_id, inode_id);
    assert_eq!(entries[1].1.name, b"..");
    assert_eq!(entries[1].1.inode_id, fs.root_inode_id());

    assert!(fs.verify().unwrap().is_empty());
}

#[test]
fn test_lookup() {
    let rd = Arc::new(RamDisk::new(64));
    let mut fs = GenericFs::format(Arc::clone(&rd)).unwrap();
    fs.create_file("wanted", 100).unwrap();

    let root = fs.read_inode(fs.root_inode_id()).unwrap();
    let inode_id = genericfs::dir_lookup(&*rd, &root, b"wanted").unwrap();
    assert_eq!(inode_id, 1);
    let missing = genericfs::dir_lookup(&*rd, &root, b"missing");
    assert!(matches!(missing, Err(Error::NotFound)));
}

#[test]
fn test_allocate_picks_lowest_cleared_bit() {
    let rd = Arc::new(RamDisk::new(64));
    let fs = GenericFs::format(Arc::clone(&rd)).unwrap();
    let range = fs.superblock().block_freemap();

    // Preallocated run is blocks 0..=4; fill a few more.
    assert_eq!(freemap::allocate(&*rd, range).unwrap(), 5);
    assert_eq!(freemap::allocate(&*rd, range).unwrap(), 6);
    assert_eq!(freemap::allocate(&*rd, range).unwrap(), 7);

    // Free two bits out of order; the scanner hands back the lower one
    // first even though it probes each byte from the high side.
    freemap::clear(&*rd, range, 7).unwrap();
    freemap::clear(&*rd, range, 5).unwrap();
    assert_eq!(freemap::allocate(&*rd, range).unwrap(), 5);
    assert_eq!(freemap::allocate(&*rd, range).unwrap(), 7);
    assert_eq!(freemap::allocate(&*rd, range).unwrap(), 8);
}

#[test]
fn test_no_space() {
    // 16 blocks: 5 preallocated, 11 usable for data.
    let rd = Arc::new(RamDisk::new(16));
    let mut fs = GenericFs::format(rd).unwrap();
    let result = fs.create_file("big", 12 * BLOCK_SIZE as u32);
    assert!(matches!(result, Err(Error::NoSpace)));
}

#[test]
fn test_invalid_file_name() {
    let rd = Arc::new(RamDisk::new(64));
    let mut fs = GenericFs::format(rd).unwrap();
    let long_name = "x".repeat(300);
    assert!(matches!(
        fs.create_file(&long_name, 0),
        Err(Error::InvalidFileName)
    ));
    assert!(matches!(fs.create_file("", 0), Err(Error::InvalidFileName)));
}

#[test]
fn test_directory_full() {
    let rd = Arc::new(RamDisk::new(256));
    let mut fs = GenericFs::format(rd).unwrap();

    // Entries are 9 + name bytes; long names exhaust the root's first
    // block after a couple dozen files.
    let mut full = None;
    for i in 0..30 {
        let name = format!("{i:0>200}");
        match fs.create_file(&name, 0) {
            Ok(_) => continue,
            Err(e) => {
                full = Some(e);
                break;
            }
        }
    }
    assert!(matches!(full, Some(Error::DirectoryFull)));
}
