mod cli;

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use genericfs::{
    bmap, BlockDevice, FsError, GenericFs, Result, BLOCK_SIZE, MAGIC, S_IFDIR, S_IFMT, S_IFREG,
};

use cli::{Cli, Command};

/// A partition backed by an ordinary host file (or a device node exposed as
/// one). The block count is probed from the file length.
struct FileDisk {
    inner: Mutex<std::fs::File>,
    num_blocks: usize,
}

impl FileDisk {
    fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(FileDisk {
            num_blocks: (len / BLOCK_SIZE as u64) as usize,
            inner: Mutex::new(file),
        })
    }
}

impl BlockDevice for FileDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(FsError::InvalidBlockId(block_id));
        }
        let mut file = self.inner.lock().unwrap();
        file.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        file.read_exact(buf.as_mut_slice())?;
        Ok(())
    }

    fn write_block(&self, block_id: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(FsError::InvalidBlockId(block_id));
        }
        let mut file = self.inner.lock().unwrap();
        file.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        file.write_all(buf.as_slice())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut file = self.inner.lock().unwrap();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

fn show_super(fs: &GenericFs<FileDisk>) {
    let sb = fs.superblock();
    println!("Magic Number:       {:#010X}", sb.magic);
    println!("Total Blocks:       {}", sb.total_blocks);
    println!("Block Size:         {} bytes", sb.block_size);
    println!("Inode Freemap Size: {} blocks", sb.inodefreemap_blocks);
    println!("Block Freemap Size: {} blocks", sb.blockfreemap_blocks);
    println!("Inode Table Size:   {} blocks", sb.inodetable_blocks);
}

/// Renders a freemap as rows of X (allocated) and - (free), 32 objects per
/// row.
fn show_freemap(fs: &GenericFs<FileDisk>, start_block: u32, map_blocks: u32) -> Result<()> {
    let total = fs.superblock().total_blocks as usize;
    let mut bits = Vec::with_capacity(total);

    'done: for block_index in 0..map_blocks {
        let buf = fs.read_block_raw(start_block + block_index)?;
        for byte in buf.iter() {
            for bit in 0..8 {
                bits.push(byte & (1 << bit) != 0);
                if bits.len() == total {
                    break 'done;
                }
            }
        }
    }

    for (i, chunk) in bits.chunks(32).enumerate() {
        let mut row = format!("  {:09}: ", i * 32);
        for (j, set) in chunk.iter().enumerate() {
            if j > 0 && j % 8 == 0 {
                row.push_str("  ");
            }
            row.push(if *set { 'X' } else { '-' });
        }
        println!("{row}");
    }
    Ok(())
}

fn mode_description(mode: u32) -> &'static str {
    match mode & S_IFMT {
        S_IFDIR => "directory",
        S_IFREG => "regular",
        _ => "unknown",
    }
}

fn show_inode(fs: &GenericFs<FileDisk>, inode_id: u32) -> Result<()> {
    let inode = fs.read_inode(inode_id)?;
    println!("nlinks        : {}", inode.nlinks);
    println!("Owner Id      : {}", inode.owner_id);
    println!("Group Id      : {}", inode.group_id);
    println!("Mode          : {:o} ({})", inode.mode, mode_description(inode.mode));
    println!("File Size     : {}", inode.file_size);
    println!("Access Time   : {}", inode.atime);
    println!("Modified Time : {}", inode.mtime);
    println!("Meta Mod Time : {}", inode.ctime);
    println!(
        "First Blocks  : {}, {}, {}, {}",
        inode.blocks[0], inode.blocks[1], inode.blocks[2], inode.blocks[3]
    );
    println!("First Indirection Pointer : {}", inode.first_indirect);
    println!("Second Indirection Pointer: {}", inode.second_indirect);

    // Resolve the first block as a convenience when the file has one.
    if inode.file_size > 0 {
        match bmap(&*fs.device(), &inode, 0) {
            Ok(block_id) => println!("Block 0 resolves to       : {block_id}"),
            Err(e) => println!("Block 0 resolves to       : ({e})"),
        }
    }
    Ok(())
}

fn show_block(fs: &GenericFs<FileDisk>, block_id: u32) -> Result<()> {
    let buf = fs.read_block_raw(block_id)?;
    for (i, row) in buf.chunks(16).enumerate() {
        print!("{:08x}: ", i * 16);
        for byte in row {
            print!("{byte:02x} ");
        }
        print!(" ");
        for byte in row {
            let c = *byte as char;
            print!("{}", if c.is_ascii_graphic() { c } else { '.' });
        }
        println!();
    }
    Ok(())
}

fn show_root_dir(fs: &GenericFs<FileDisk>) -> Result<()> {
    println!(
        "{:>10} {:>10} {:>10} {:>10}",
        "Offset", "Next", "Inode", "Filename"
    );
    println!("========== ========== ========== ==========");
    for (offset, entry) in fs.read_root_dir()? {
        println!(
            "{:>10} {:>10} {:>10} {}",
            offset,
            entry.next,
            entry.inode_id,
            String::from_utf8_lossy(&entry.name)
        );
    }
    Ok(())
}

fn run(cli: Cli) -> Result<bool> {
    if let Command::Init { blocks } = &cli.command {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&cli.image)?;
        if let Some(blocks) = blocks {
            file.set_len(*blocks as u64 * BLOCK_SIZE as u64)?;
        }
        drop(file);
        let disk = Arc::new(FileDisk::open(&cli.image)?);
        let fs = GenericFs::format(disk)?;
        println!(
            "initialized {} blocks ({} usable for data)",
            fs.superblock().total_blocks,
            fs.superblock().total_blocks - fs.superblock().preallocated_blocks()
        );
        return Ok(true);
    }

    let disk = Arc::new(FileDisk::open(&cli.image)?);
    let mut fs = match GenericFs::mount(Arc::clone(&disk)) {
        Err(FsError::NotGenericFs(magic)) => {
            eprintln!(
                "{} has magic {:#010x}, expected {:#010x}; not a GenericFS partition",
                cli.image.display(),
                magic,
                MAGIC
            );
            return Ok(false);
        }
        other => other?,
    };

    match cli.command {
        Command::Init { .. } => unreachable!(),
        Command::ShowSuper => show_super(&fs),
        Command::ShowInodeFreemap => {
            let sb = *fs.superblock();
            show_freemap(&fs, sb.inode_freemap_start(), sb.inodefreemap_blocks)?;
        }
        Command::ShowBlockFreemap => {
            let sb = *fs.superblock();
            show_freemap(&fs, sb.block_freemap_start(), sb.blockfreemap_blocks)?;
        }
        Command::ShowInode { inode } => show_inode(&fs, inode)?,
        Command::ShowBlock { block } => show_block(&fs, block)?,
        Command::ShowRootDir => show_root_dir(&fs)?,
        Command::CreateFile { name, size } => {
            let inode_id = fs.create_file(&name, size)?;
            println!("created file '{name}' in the root directory (inode {inode_id})");
        }
        Command::CreateDir { name } => {
            let inode_id = fs.create_dir(&name)?;
            println!("created directory '{name}' in the root directory (inode {inode_id})");
        }
        Command::Verify => {
            let findings = fs.verify()?;
            if findings.is_empty() {
                println!("file system is consistent");
            } else {
                for finding in &findings {
                    println!("{finding}");
                }
                println!("{} finding(s)", findings.len());
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
