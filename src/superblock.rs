//! Superblock manager: load/store the volume header.

use crate::device::BlockDevice;
use crate::layout::SUPERBLOCK_OFFSET;
use std::io;

/// The six meaningful fields of the on-disk superblock.
///
/// This is a plain value threaded explicitly through every operation; there
/// is no process-wide superblock record. `load` reads it, callers mutate the
/// copy, and `store` writes it back exactly once per operation that changed
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub total_block_count: u32,
    pub total_inode_count: u32,
    pub free_inode_count: u32,
    pub free_block_count: u32,
    pub block_size: u32,
    pub data_start_offset: u32,
}

/// The byte size of the on-disk superblock record.
pub const SUPERBLOCK_SIZE: usize = 6 * 4;

impl Superblock {
    /// Reads the superblock from offset 0.
    pub fn load(dev: &mut impl BlockDevice) -> io::Result<Self> {
        let mut buf = [0u8; SUPERBLOCK_SIZE];
        dev.read_at(SUPERBLOCK_OFFSET, &mut buf)?;
        Ok(Self {
            total_block_count: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            total_inode_count: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            free_inode_count: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            free_block_count: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            block_size: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
            data_start_offset: u32::from_le_bytes(buf[20..24].try_into().unwrap()),
        })
    }

    /// Writes the superblock back to offset 0.
    pub fn store(&self, dev: &mut impl BlockDevice) -> io::Result<()> {
        let mut buf = [0u8; SUPERBLOCK_SIZE];
        buf[0..4].copy_from_slice(&self.total_block_count.to_le_bytes());
        buf[4..8].copy_from_slice(&self.total_inode_count.to_le_bytes());
        buf[8..12].copy_from_slice(&self.free_inode_count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.free_block_count.to_le_bytes());
        buf[16..20].copy_from_slice(&self.block_size.to_le_bytes());
        buf[20..24].copy_from_slice(&self.data_start_offset.to_le_bytes());
        dev.write_at(SUPERBLOCK_OFFSET, &buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::MemDevice;

    #[test]
    fn round_trips_through_device() {
        let mut dev = MemDevice::with_len(4096);
        let sb = Superblock {
            total_block_count: 1024,
            total_inode_count: 128,
            free_inode_count: 127,
            free_block_count: 1011,
            block_size: 1024,
            data_start_offset: 12288,
        };
        sb.store(&mut dev).unwrap();
        let loaded = Superblock::load(&mut dev).unwrap();
        assert_eq!(loaded, sb);
    }
}
