//! Directory table: lookup, insertion, and removal of named entries inside
//! a single directory block.
//!
//! A directory always occupies exactly one data block, so it holds at most
//! [`crate::layout::DIRS_PER_BLOCK`] entries, `.` and `..` included.

use crate::device::BlockDevice;
use crate::inode::Inode;
use crate::layout::BLOCK_SIZE;
use crate::layout::DIRENT_SIZE;
use crate::layout::DIRS_PER_BLOCK;
use crate::layout::MAX_FILENAME;
use std::io;

/// One 256-byte directory entry: a NUL-padded name and an inode index. An
/// entry is free iff `inode_index == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode_index: u32,
}

impl DirEntry {
    fn is_free(&self) -> bool {
        self.inode_index == 0
    }

    fn decode(buf: &[u8]) -> Self {
        let name_bytes = &buf[0..MAX_FILENAME];
        let nul = name_bytes.iter().position(|&b| b == 0).unwrap_or(MAX_FILENAME);
        let name = String::from_utf8_lossy(&name_bytes[..nul]).into_owned();
        let inode_index = u32::from_le_bytes(buf[MAX_FILENAME..MAX_FILENAME + 4].try_into().unwrap());
        Self { name, inode_index }
    }

    fn encode(&self) -> [u8; DIRENT_SIZE as usize] {
        let mut buf = [0u8; DIRENT_SIZE as usize];
        let name_bytes = self.name.as_bytes();
        let copy_len = name_bytes.len().min(MAX_FILENAME - 1);
        buf[0..copy_len].copy_from_slice(&name_bytes[..copy_len]);
        buf[MAX_FILENAME..MAX_FILENAME + 4].copy_from_slice(&self.inode_index.to_le_bytes());
        buf
    }
}

/// Reads the full set of [`DIRS_PER_BLOCK`] slots out of a raw directory
/// block.
pub fn read_slots(block: &[u8; BLOCK_SIZE as usize]) -> Vec<DirEntry> {
    (0..DIRS_PER_BLOCK as usize)
        .map(|i| {
            let off = i * DIRENT_SIZE as usize;
            DirEntry::decode(&block[off..off + DIRENT_SIZE as usize])
        })
        .collect()
}

fn write_slot(block: &mut [u8; BLOCK_SIZE as usize], slot: usize, entry: &DirEntry) {
    let off = slot * DIRENT_SIZE as usize;
    block[off..off + DIRENT_SIZE as usize].copy_from_slice(&entry.encode());
}

/// Finds a live entry named `name` in `block`. Returns its slot index
/// alongside the entry; first match wins, matching on inode index being
/// nonzero and the name comparing equal.
pub fn find(block: &[u8; BLOCK_SIZE as usize], name: &str) -> Option<(usize, DirEntry)> {
    read_slots(block)
        .into_iter()
        .enumerate()
        .find(|(_, e)| !e.is_free() && e.name == name)
}

/// Inserts `(name, child_inode_index)` into the parent directory's block,
/// growing the parent's size by [`DIRENT_SIZE`] bytes.
///
/// Returns `Err` when the block has no free slot. Callers are expected to
/// have already checked [`has_free_slot`] before allocating anything, so
/// this is only ever reached once capacity is already known to be
/// available.
pub fn insert(
    dev: &mut impl BlockDevice,
    parent_inode: &mut Inode,
    parent_index: u32,
    name: &str,
    child_inode_index: u32,
) -> io::Result<Result<(), ()>> {
    let data_block = parent_inode.direct_pointers[0];
    let mut block = dev.read_block(data_block)?;
    let slots = read_slots(&block);
    let Some(free_slot) = slots.iter().position(|e| e.is_free()) else {
        return Ok(Err(()));
    };
    let entry = DirEntry {
        name: name.to_string(),
        inode_index: child_inode_index,
    };
    write_slot(&mut block, free_slot, &entry);
    dev.write_block(data_block, &block)?;

    parent_inode.size += DIRENT_SIZE;
    crate::inode::write(dev, parent_index, parent_inode)?;
    Ok(Ok(()))
}

/// Clears the slot matching `(child_inode_index, name)`, shrinking the
/// parent's size by [`DIRENT_SIZE`] bytes. A no-op (besides the inode
/// rewrite) if no matching slot is found.
pub fn remove(
    dev: &mut impl BlockDevice,
    parent_inode: &mut Inode,
    parent_index: u32,
    name: &str,
    child_inode_index: u32,
) -> io::Result<()> {
    let data_block = parent_inode.direct_pointers[0];
    let mut block = dev.read_block(data_block)?;
    let slots = read_slots(&block);
    if let Some(slot) = slots
        .iter()
        .position(|e| e.inode_index == child_inode_index && e.name == name)
    {
        write_slot(
            &mut block,
            slot,
            &DirEntry {
                name: String::new(),
                inode_index: 0,
            },
        );
        dev.write_block(data_block, &block)?;
        parent_inode.size = parent_inode.size.saturating_sub(DIRENT_SIZE);
        crate::inode::write(dev, parent_index, parent_inode)?;
    }
    Ok(())
}

/// Whether the directory's block has at least one free slot.
pub fn has_free_slot(block: &[u8; BLOCK_SIZE as usize]) -> bool {
    read_slots(block).iter().any(|e| e.is_free())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::MemDevice;
    use crate::layout::DATA_BLOCKS_OFFSET;

    fn setup() -> MemDevice {
        MemDevice::with_len(DATA_BLOCKS_OFFSET as usize + 4096)
    }

    #[test]
    fn insert_then_find() {
        let mut dev = setup();
        let mut parent = Inode::empty();
        parent.is_directory = true;
        parent.link_count = 1;
        parent.direct_pointers[0] = 12;
        crate::inode::write(&mut dev, 0, &parent).unwrap();

        insert(&mut dev, &mut parent, 0, "a", 1).unwrap().unwrap();
        let block = dev.read_block(12).unwrap();
        let (_slot, entry) = find(&block, "a").unwrap();
        assert_eq!(entry.inode_index, 1);
        assert_eq!(parent.size, 256);
    }

    #[test]
    fn insert_fails_when_full() {
        let mut dev = setup();
        let mut parent = Inode::empty();
        parent.is_directory = true;
        parent.link_count = 1;
        parent.direct_pointers[0] = 12;
        crate::inode::write(&mut dev, 0, &parent).unwrap();

        for i in 0..4u32 {
            insert(&mut dev, &mut parent, 0, &format!("f{i}"), i + 1)
                .unwrap()
                .unwrap();
        }
        let result = insert(&mut dev, &mut parent, 0, "one-too-many", 99).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn remove_clears_slot_and_shrinks_size() {
        let mut dev = setup();
        let mut parent = Inode::empty();
        parent.is_directory = true;
        parent.link_count = 1;
        parent.direct_pointers[0] = 12;
        crate::inode::write(&mut dev, 0, &parent).unwrap();

        insert(&mut dev, &mut parent, 0, "a", 1).unwrap().unwrap();
        remove(&mut dev, &mut parent, 0, "a", 1).unwrap();
        let block = dev.read_block(12).unwrap();
        assert!(find(&block, "a").is_none());
        assert_eq!(parent.size, 0);
    }

    #[test]
    fn long_name_is_truncated() {
        let long = "x".repeat(300);
        let entry = DirEntry {
            name: long.clone(),
            inode_index: 1,
        };
        let encoded = entry.encode();
        let decoded = DirEntry::decode(&encoded);
        assert_eq!(decoded.name.len(), MAX_FILENAME - 1);
        assert_eq!(decoded.name, long[..MAX_FILENAME - 1]);
    }
}
