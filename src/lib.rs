//! A single-file disk-image filesystem engine: a fixed-layout superblock,
//! group descriptor, two bitmaps, inode table and directory blocks, all
//! packed into one host file addressed through [`device::BlockDevice`].

pub mod bitmap;
pub mod device;
pub mod dirent;
pub mod error;
pub mod format;
pub mod group_desc;
pub mod inode;
pub mod layout;
pub mod ops;
pub mod resolver;
pub mod superblock;
