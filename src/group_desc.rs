//! The group descriptor record: a static snapshot written once at format
//! time. The engine never reads it back to drive a decision — free counts
//! always come from the superblock — but it is part of the on-disk contract
//! so `mkfs` must lay it out correctly.

use crate::device::BlockDevice;
use crate::layout::GROUP_DESC_OFFSET;
use std::io;

/// Byte size of the on-disk group descriptor record.
pub const GROUP_DESC_SIZE: usize = 3 * 4 + 3 * 2;

/// The single block group's static descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupDescriptor {
    pub block_bitmap_block: u32,
    pub inode_bitmap_block: u32,
    pub inode_table_block: u32,
    pub free_blocks_count: u16,
    pub free_inodes_count: u16,
    pub used_dirs_count: u16,
}

impl GroupDescriptor {
    /// Writes the descriptor at its fixed offset. Only ever called by the
    /// formatter.
    pub fn store(&self, dev: &mut impl BlockDevice) -> io::Result<()> {
        let mut buf = [0u8; GROUP_DESC_SIZE];
        buf[0..4].copy_from_slice(&self.block_bitmap_block.to_le_bytes());
        buf[4..8].copy_from_slice(&self.inode_bitmap_block.to_le_bytes());
        buf[8..12].copy_from_slice(&self.inode_table_block.to_le_bytes());
        buf[12..14].copy_from_slice(&self.free_blocks_count.to_le_bytes());
        buf[14..16].copy_from_slice(&self.free_inodes_count.to_le_bytes());
        buf[16..18].copy_from_slice(&self.used_dirs_count.to_le_bytes());
        dev.write_at(GROUP_DESC_OFFSET, &buf)
    }

    /// Reads the descriptor back. Exposed for completeness and tests; the
    /// engine's runtime operations never call it.
    pub fn load(dev: &mut impl BlockDevice) -> io::Result<Self> {
        let mut buf = [0u8; GROUP_DESC_SIZE];
        dev.read_at(GROUP_DESC_OFFSET, &mut buf)?;
        Ok(Self {
            block_bitmap_block: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            inode_bitmap_block: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            inode_table_block: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            free_blocks_count: u16::from_le_bytes(buf[12..14].try_into().unwrap()),
            free_inodes_count: u16::from_le_bytes(buf[14..16].try_into().unwrap()),
            used_dirs_count: u16::from_le_bytes(buf[16..18].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::MemDevice;

    #[test]
    fn round_trips_through_device() {
        let mut dev = MemDevice::with_len(4096);
        let gd = GroupDescriptor {
            block_bitmap_block: 2,
            inode_bitmap_block: 3,
            inode_table_block: 4,
            free_blocks_count: 1011,
            free_inodes_count: 127,
            used_dirs_count: 1,
        };
        gd.store(&mut dev).unwrap();
        assert_eq!(GroupDescriptor::load(&mut dev).unwrap(), gd);
    }
}
