//! Formatter: initialises a zeroed image into a valid empty filesystem with
//! root `/`.

use crate::bitmap;
use crate::device::BlockDevice;
use crate::error::FsError;
use crate::error::FsResult;
use crate::group_desc::GroupDescriptor;
use crate::inode::Inode;
use crate::layout::BLOCK_SIZE;
use crate::layout::DATA_BLOCKS_OFFSET;
use crate::layout::INODE_BITMAP_OFFSET;
use crate::layout::INODE_COUNT;
use crate::layout::INODE_TABLE_OFFSET;
use crate::layout::ROOT_DATA_BLOCK;
use crate::layout::ROOT_INODE;
use crate::layout::BLOCK_BITMAP_OFFSET;
use crate::layout::RESERVED_BLOCKS;
use crate::superblock::Superblock;

/// Formats `dev` as an empty filesystem sized `requested_bytes`, rounded
/// down to a block boundary.
///
/// Fails with [`FsError::ImageTooSmall`] when the rounded size can't hold
/// the fixed metadata plus at least one data block.
pub fn mkfs(dev: &mut impl BlockDevice, requested_bytes: u64) -> FsResult<Superblock> {
    let rounded = (requested_bytes / BLOCK_SIZE as u64) * BLOCK_SIZE as u64;
    if rounded < DATA_BLOCKS_OFFSET + BLOCK_SIZE as u64 {
        return Err(FsError::ImageTooSmall);
    }

    let total_block_count = (rounded / BLOCK_SIZE as u64) as u32;
    let free_block_count = total_block_count - RESERVED_BLOCKS - 1;

    // Zero-fill the image up front so every reserved region starts clean.
    let zero_block = [0u8; BLOCK_SIZE as usize];
    for i in 0..total_block_count {
        dev.write_block(i, &zero_block)?;
    }

    let superblock = Superblock {
        total_block_count,
        total_inode_count: INODE_COUNT,
        free_inode_count: INODE_COUNT - 1,
        free_block_count,
        block_size: BLOCK_SIZE,
        data_start_offset: DATA_BLOCKS_OFFSET as u32,
    };
    superblock.store(dev)?;

    GroupDescriptor {
        block_bitmap_block: (BLOCK_BITMAP_OFFSET / BLOCK_SIZE as u64) as u32,
        inode_bitmap_block: (INODE_BITMAP_OFFSET / BLOCK_SIZE as u64) as u32,
        inode_table_block: (INODE_TABLE_OFFSET / BLOCK_SIZE as u64) as u32,
        free_blocks_count: free_block_count as u16,
        free_inodes_count: (INODE_COUNT - 1) as u16,
        used_dirs_count: 1,
    }
    .store(dev)?;

    for i in 0..=RESERVED_BLOCKS {
        let slot = bitmap::allocate(dev, BLOCK_BITMAP_OFFSET, total_block_count)?;
        debug_assert_eq!(slot, Some(i));
    }

    let root_inode_slot = bitmap::allocate(dev, INODE_BITMAP_OFFSET, INODE_COUNT)?;
    debug_assert_eq!(root_inode_slot, Some(0));

    let mut root = Inode::empty();
    root.is_directory = true;
    root.link_count = 1;
    root.direct_pointers[0] = ROOT_DATA_BLOCK;
    crate::inode::write(dev, ROOT_INODE, &root)?;

    // The root's data block is left all-zero: no `.`/`..`, unlike freshly
    // made subdirectories. Already zeroed by the initial fill above.

    dev.flush()?;
    Ok(superblock)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::MemDevice;

    #[test]
    fn empty_one_megabyte_image_has_expected_counts() {
        let mut dev = MemDevice::new();
        let sb = mkfs(&mut dev, 1024 * 1024).unwrap();
        assert_eq!(sb.total_block_count, 1024);
        assert_eq!(sb.total_inode_count, 128);
        assert_eq!(sb.free_inode_count, 127);
        assert_eq!(sb.free_block_count, 1011);
    }

    #[test]
    fn rejects_images_too_small() {
        let mut dev = MemDevice::new();
        let err = mkfs(&mut dev, DATA_BLOCKS_OFFSET).unwrap_err();
        assert!(matches!(err, FsError::ImageTooSmall));
    }

    #[test]
    fn root_is_a_live_directory() {
        let mut dev = MemDevice::new();
        mkfs(&mut dev, 1024 * 1024).unwrap();
        let root = crate::inode::read(&mut dev, ROOT_INODE).unwrap();
        assert!(root.is_directory);
        assert_eq!(root.link_count, 1);
        assert_eq!(root.direct_pointers[0], ROOT_DATA_BLOCK);
    }

    #[test]
    fn reserved_bits_are_set_in_block_bitmap() {
        let mut dev = MemDevice::new();
        mkfs(&mut dev, 1024 * 1024).unwrap();
        for i in 0..=RESERVED_BLOCKS {
            assert!(bitmap::is_set(&mut dev, BLOCK_BITMAP_OFFSET, i).unwrap());
        }
        assert!(!bitmap::is_set(&mut dev, BLOCK_BITMAP_OFFSET, RESERVED_BLOCKS + 1).unwrap());
    }
}
