use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("block i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("block {0} is out of range for this device")]
    InvalidBlockId(u32),
    #[error("inode {0} is out of range for this partition")]
    OutOfBounds(u32),
    #[error("bad magic number {0:#010x}, not a GenericFS partition")]
    NotGenericFs(u32),
    #[error("superblock disagrees with the partition: {0}")]
    InconsistentGeometry(&'static str),
    #[error("preallocated metadata does not fit in one freemap block")]
    PartitionTooSmall,
    #[error("freemap has no free bit left")]
    NoSpace,
    #[error("block index {0} exceeds doubly-indirect capacity")]
    FileTooLarge(u32),
    #[error("block index {0} walks into an unallocated pointer")]
    NotAllocated(u32),
    #[error("malformed directory record at offset {0}")]
    CorruptDirectory(u32),
    #[error("no room left in the directory's first block")]
    DirectoryFull,
    #[error("invalid file name")]
    InvalidFileName,
    #[error("name already exists in the directory")]
    AlreadyExists,
    #[error("no such name in the directory")]
    NotFound,
}

pub type Result<T> = core::result::Result<T, FsError>;
