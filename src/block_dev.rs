use crate::config::BLOCK_SIZE;
use crate::error::FsError;

/// Abstraction over the partition holding the file system. The disktool backs
/// it with a host file; a driver would back it with a raw device.
pub trait BlockDevice: Send + Sync {
    /// Returns the number of blocks in the partition. This is the geometry
    /// probe: everything else about the layout is derived from it.
    fn num_blocks(&self) -> usize;

    /// Reads exactly one block into `buf`.
    fn read_block(&self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), FsError>;

    /// Writes exactly one block from `buf`.
    fn write_block(&self, block_id: u32, buf: &[u8; BLOCK_SIZE]) -> Result<(), FsError>;

    /// Pushes any buffered writes down to the underlying storage.
    fn flush(&self) -> Result<(), FsError>;
}
