//! Inode table: typed read/write of fixed-size inode records.

use crate::device::BlockDevice;
use crate::layout::DIRECT_BLOCKS;
use crate::layout::INODE_SIZE;
use crate::layout::INODE_TABLE_OFFSET;
use std::io;

/// Byte size of the on-disk inode record (6 meaningful fields, the rest
/// zero-padding up to [`crate::layout::INODE_SIZE`]).
pub const INODE_RECORD_SIZE: usize = INODE_SIZE as usize;

/// An in-memory view of a 64-byte on-disk inode record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub size: u32,
    pub direct_pointers: [u32; DIRECT_BLOCKS],
    pub link_count: u32,
    pub is_directory: bool,
}

impl Inode {
    /// A zeroed, unlinked inode — never written as-is, only as a starting
    /// point before the caller fills in real fields.
    pub fn empty() -> Self {
        Self {
            size: 0,
            direct_pointers: [0; DIRECT_BLOCKS],
            link_count: 0,
            is_directory: false,
        }
    }

    /// The number of direct blocks currently occupied, per the invariant
    /// that a file's blocks are contiguous starting at index 0.
    pub fn block_count(&self) -> u32 {
        crate::layout::ceil_blocks(self.size as u64)
    }

    fn decode(buf: &[u8; INODE_RECORD_SIZE]) -> Self {
        let size = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let mut direct_pointers = [0u32; DIRECT_BLOCKS];
        for (i, ptr) in direct_pointers.iter_mut().enumerate() {
            let off = 4 + i * 4;
            *ptr = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        }
        let link_off = 4 + DIRECT_BLOCKS * 4;
        let link_count = u32::from_le_bytes(buf[link_off..link_off + 4].try_into().unwrap());
        let dir_off = link_off + 4;
        let is_directory =
            u32::from_le_bytes(buf[dir_off..dir_off + 4].try_into().unwrap()) != 0;
        Self {
            size,
            direct_pointers,
            link_count,
            is_directory,
        }
    }

    fn encode(&self) -> [u8; INODE_RECORD_SIZE] {
        let mut buf = [0u8; INODE_RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.size.to_le_bytes());
        for (i, ptr) in self.direct_pointers.iter().enumerate() {
            let off = 4 + i * 4;
            buf[off..off + 4].copy_from_slice(&ptr.to_le_bytes());
        }
        let link_off = 4 + DIRECT_BLOCKS * 4;
        buf[link_off..link_off + 4].copy_from_slice(&self.link_count.to_le_bytes());
        let dir_off = link_off + 4;
        let flag: u32 = if self.is_directory { 1 } else { 0 };
        buf[dir_off..dir_off + 4].copy_from_slice(&flag.to_le_bytes());
        buf
    }
}

/// Computes the on-disk byte offset of inode `index`.
fn offset_of(index: u32) -> u64 {
    INODE_TABLE_OFFSET + index as u64 * INODE_SIZE as u64
}

/// Reads inode `index` from the table. `index` must be `< total_inode_count`;
/// out-of-range indices are a caller error, never produced by the resolver
/// or allocator.
pub fn read(dev: &mut impl BlockDevice, index: u32) -> io::Result<Inode> {
    let mut buf = [0u8; INODE_RECORD_SIZE];
    dev.read_at(offset_of(index), &mut buf)?;
    Ok(Inode::decode(&buf))
}

/// Writes inode `index` back to the table.
pub fn write(dev: &mut impl BlockDevice, index: u32, inode: &Inode) -> io::Result<()> {
    dev.write_at(offset_of(index), &inode.encode())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::MemDevice;
    use crate::layout::DATA_BLOCKS_OFFSET;

    #[test]
    fn round_trips_through_table() {
        let mut dev = MemDevice::with_len(DATA_BLOCKS_OFFSET as usize + 1024);
        let mut ino = Inode::empty();
        ino.size = 2500;
        ino.direct_pointers[0] = 12;
        ino.direct_pointers[1] = 13;
        ino.direct_pointers[2] = 14;
        ino.link_count = 1;
        ino.is_directory = false;
        write(&mut dev, 5, &ino).unwrap();
        let back = read(&mut dev, 5).unwrap();
        assert_eq!(back, ino);
        assert_eq!(back.block_count(), 3);
    }

    #[test]
    fn distinct_indices_do_not_alias() {
        let mut dev = MemDevice::with_len(DATA_BLOCKS_OFFSET as usize + 1024);
        let mut a = Inode::empty();
        a.is_directory = true;
        a.link_count = 1;
        write(&mut dev, 0, &a).unwrap();
        let mut b = Inode::empty();
        b.size = 42;
        write(&mut dev, 1, &b).unwrap();
        assert_eq!(read(&mut dev, 0).unwrap(), a);
        assert_eq!(read(&mut dev, 1).unwrap(), b);
    }
}
