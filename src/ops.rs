//! The filesystem operations: mkdir, rmdir, ls, df, lsdf, crhl, rm, ext, red,
//! du, ecpt, ecpf.
//!
//! Every operation follows the same shape: `load` the superblock, resolve
//! whatever paths it needs, check every precondition and resource limit
//! *before* mutating anything, so a rejected operation leaves bitmaps and
//! free counts untouched, then mutate and `store` the superblock exactly
//! once.
//!
//! `ecpt`/`ecpf` take/return raw bytes rather than touching a host path
//! themselves — reading or writing the host-side file is the CLI's job,
//! keeping this module's only I/O surface the image device.

use crate::bitmap;
use crate::device::BlockDevice;
use crate::dirent;
use crate::error::FsError;
use crate::error::FsResult;
use crate::inode;
use crate::inode::Inode;
use crate::layout::ceil_blocks;
use crate::layout::BLOCK_BITMAP_OFFSET;
use crate::layout::BLOCK_SIZE;
use crate::layout::DIRECT_BLOCKS;
use crate::layout::DIRENT_SIZE;
use crate::layout::INODE_BITMAP_OFFSET;
use crate::layout::MAX_FILENAME;
use crate::layout::ROOT_INODE;
use crate::resolver::resolve;
use crate::resolver::Resolution;
use crate::superblock::Superblock;

/// Maximum file size this format can represent: twelve direct blocks.
pub const MAX_FILE_SIZE: u64 = DIRECT_BLOCKS as u64 * BLOCK_SIZE as u64;

fn alloc_block(dev: &mut impl BlockDevice, sb: &Superblock) -> FsResult<u32> {
    bitmap::allocate(dev, BLOCK_BITMAP_OFFSET, sb.total_block_count)?
        .ok_or(FsError::NoFreeBlocks)
}

fn alloc_inode(dev: &mut impl BlockDevice, sb: &Superblock) -> FsResult<u32> {
    bitmap::allocate(dev, INODE_BITMAP_OFFSET, sb.total_inode_count)?
        .ok_or(FsError::NoFreeInodes)
}

fn release_block(dev: &mut impl BlockDevice, index: u32) -> FsResult<()> {
    bitmap::release(dev, BLOCK_BITMAP_OFFSET, index)?;
    Ok(())
}

fn release_inode(dev: &mut impl BlockDevice, index: u32) -> FsResult<()> {
    bitmap::release(dev, INODE_BITMAP_OFFSET, index)?;
    Ok(())
}

/// Frees every live data block of `ino` and releases its inode slot. Shared
/// between `rm` and the full-truncation path of `red`, since both end up
/// meaning "this inode is no longer reachable".
fn free_inode_storage(
    dev: &mut impl BlockDevice,
    sb: &mut Superblock,
    inode_index: u32,
    ino: &Inode,
) -> FsResult<()> {
    for &block in ino.direct_pointers.iter().take(ino.block_count() as usize) {
        release_block(dev, block)?;
        sb.free_block_count += 1;
    }
    release_inode(dev, inode_index)?;
    sb.free_inode_count += 1;
    Ok(())
}

/// Resolves `path` and requires it to exist. Maps `Absent` to
/// [`FsError::NotFound`] and `BadPath` to [`FsError::BadPath`].
fn resolve_existing(dev: &mut impl BlockDevice, path: &str) -> FsResult<(u32, String, u32)> {
    match resolve(dev, path)? {
        Resolution::Found { parent, leaf, inode } => Ok((parent, leaf, inode)),
        Resolution::Absent { .. } => Err(FsError::NotFound),
        Resolution::BadPath => Err(FsError::BadPath),
    }
}

/// Resolves `path` and requires it to be absent. Maps `Found` to
/// [`FsError::AlreadyExists`] and `BadPath` to [`FsError::BadPath`].
fn resolve_absent(dev: &mut impl BlockDevice, path: &str) -> FsResult<(u32, String)> {
    match resolve(dev, path)? {
        Resolution::Absent { parent, leaf } => Ok((parent, leaf)),
        Resolution::Found { .. } => Err(FsError::AlreadyExists),
        Resolution::BadPath => Err(FsError::BadPath),
    }
}

/// `mkdir <path>`: creates an empty subdirectory.
pub fn mkdir(dev: &mut impl BlockDevice, path: &str) -> FsResult<()> {
    let (parent_idx, leaf) = resolve_absent(dev, path)?;
    let mut parent = inode::read(dev, parent_idx)?;
    if !parent.is_directory {
        return Err(FsError::NotADirectory);
    }

    let parent_block = dev.read_block(parent.direct_pointers[0])?;
    if dirent::find(&parent_block, &leaf).is_some() {
        return Err(FsError::AlreadyExists);
    }
    if !dirent::has_free_slot(&parent_block) {
        return Err(FsError::DirectoryFull);
    }

    let mut sb = Superblock::load(dev)?;
    if sb.free_inode_count == 0 {
        return Err(FsError::NoFreeInodes);
    }
    if sb.free_block_count == 0 {
        return Err(FsError::NoFreeBlocks);
    }

    let new_inode_idx = alloc_inode(dev, &sb)?;
    let new_block_idx = match alloc_block(dev, &sb) {
        Ok(idx) => idx,
        Err(e) => {
            release_inode(dev, new_inode_idx)?;
            return Err(e);
        }
    };
    sb.free_inode_count -= 1;
    sb.free_block_count -= 1;
    sb.store(dev)?;

    let mut child = Inode::empty();
    child.is_directory = true;
    child.link_count = 1;
    child.direct_pointers[0] = new_block_idx;
    inode::write(dev, new_inode_idx, &child)?;

    let mut dir_block = [0u8; BLOCK_SIZE as usize];
    write_dot_entries(&mut dir_block, new_inode_idx, parent_idx);
    dev.write_block(new_block_idx, &dir_block)?;

    dirent::insert(dev, &mut parent, parent_idx, &leaf, new_inode_idx)?
        .expect("capacity was pre-checked above");

    Ok(())
}

fn write_dot_entries(block: &mut [u8; BLOCK_SIZE as usize], self_idx: u32, parent_idx: u32) {
    let mut write_entry = |slot: usize, name: &str, idx: u32| {
        let off = slot * DIRENT_SIZE as usize;
        block[off..off + MAX_FILENAME].fill(0);
        block[off..off + name.len()].copy_from_slice(name.as_bytes());
        block[off + MAX_FILENAME..off + MAX_FILENAME + 4].copy_from_slice(&idx.to_le_bytes());
    };
    write_entry(0, ".", self_idx);
    write_entry(1, "..", parent_idx);
}

/// `rmdir <path>`: removes an empty subdirectory.
pub fn rmdir(dev: &mut impl BlockDevice, path: &str) -> FsResult<()> {
    let (parent_idx, leaf, target_idx) = resolve_existing(dev, path)?;
    if target_idx == ROOT_INODE {
        // Root resolves to itself and is never a legal rmdir target.
        return Err(FsError::NotFound);
    }

    let target = inode::read(dev, target_idx)?;
    if !target.is_directory {
        return Err(FsError::NotADirectory);
    }
    let block = dev.read_block(target.direct_pointers[0])?;
    let non_empty = dirent::read_slots(&block)
        .iter()
        .enumerate()
        .any(|(slot, e)| e.inode_index != 0 && slot != 0 && slot != 1);
    if non_empty {
        return Err(FsError::DirectoryNotEmpty);
    }

    let mut parent = inode::read(dev, parent_idx)?;
    dirent::remove(dev, &mut parent, parent_idx, &leaf, target_idx)?;

    let mut sb = Superblock::load(dev)?;
    release_block(dev, target.direct_pointers[0])?;
    sb.free_block_count += 1;
    release_inode(dev, target_idx)?;
    sb.free_inode_count += 1;
    Ok(sb.store(dev)?)
}

/// One entry reported by [`ls`] for a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub size: u32,
    pub is_directory: bool,
}

/// The result of an `ls <path>` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LsResult {
    File { size: u32 },
    Directory { entries: Vec<ListEntry> },
}

/// `ls <path>`.
pub fn ls(dev: &mut impl BlockDevice, path: &str) -> FsResult<LsResult> {
    let (_, _, target_idx) = resolve_existing(dev, path)?;
    let target = inode::read(dev, target_idx)?;
    if !target.is_directory {
        return Ok(LsResult::File { size: target.size });
    }
    let block = dev.read_block(target.direct_pointers[0])?;
    let mut entries = Vec::new();
    for entry in dirent::read_slots(&block) {
        if entry.inode_index == 0 {
            continue;
        }
        let child = inode::read(dev, entry.inode_index)?;
        entries.push(ListEntry {
            name: entry.name,
            size: child.size,
            is_directory: child.is_directory,
        });
    }
    Ok(LsResult::Directory { entries })
}

/// Disk usage summary reported by [`df`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfReport {
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub used_blocks: u32,
    pub total_inodes: u32,
    pub free_inodes: u32,
    pub used_inodes: u32,
}

/// `df`.
pub fn df(dev: &mut impl BlockDevice) -> FsResult<DfReport> {
    let sb = Superblock::load(dev)?;
    Ok(DfReport {
        total_blocks: sb.total_block_count,
        free_blocks: sb.free_block_count,
        used_blocks: sb.total_block_count - sb.free_block_count,
        total_inodes: sb.total_inode_count,
        free_inodes: sb.free_inode_count,
        used_inodes: sb.total_inode_count - sb.free_inode_count,
    })
}

/// `lsdf <path>`: total recursive usage in bytes.
pub fn lsdf(dev: &mut impl BlockDevice, path: &str) -> FsResult<u64> {
    let (_, _, target_idx) = resolve_existing(dev, path)?;
    let target = inode::read(dev, target_idx)?;
    du_bytes(dev, &target)
}

fn du_bytes(dev: &mut impl BlockDevice, ino: &Inode) -> FsResult<u64> {
    if !ino.is_directory {
        return Ok(ceil_blocks(ino.size as u64) as u64 * BLOCK_SIZE as u64);
    }
    let block = dev.read_block(ino.direct_pointers[0])?;
    let mut total = BLOCK_SIZE as u64;
    for (slot, entry) in dirent::read_slots(&block).iter().enumerate() {
        if entry.inode_index == 0 || slot == 0 || slot == 1 {
            continue;
        }
        let child = inode::read(dev, entry.inode_index)?;
        total += du_bytes(dev, &child)?;
    }
    Ok(total)
}

/// `du <path>`: pre-order `(path, cumulative bytes)` for the target and
/// every descendant, `.`/`..` excluded.
pub fn du(dev: &mut impl BlockDevice, path: &str) -> FsResult<Vec<(String, u64)>> {
    let (_, _, target_idx) = resolve_existing(dev, path)?;
    let target = inode::read(dev, target_idx)?;
    let mut out = Vec::new();
    du_walk(dev, &target, path, &mut out)?;
    Ok(out)
}

fn du_walk(
    dev: &mut impl BlockDevice,
    ino: &Inode,
    path: &str,
    out: &mut Vec<(String, u64)>,
) -> FsResult<()> {
    let bytes = du_bytes(dev, ino)?;
    out.push((path.to_string(), bytes));
    if !ino.is_directory {
        return Ok(());
    }
    let block = dev.read_block(ino.direct_pointers[0])?;
    for (slot, entry) in dirent::read_slots(&block).iter().enumerate() {
        if entry.inode_index == 0 || slot == 0 || slot == 1 {
            continue;
        }
        let child = inode::read(dev, entry.inode_index)?;
        let child_path = if path == "/" {
            format!("/{}", entry.name)
        } else {
            format!("{path}/{}", entry.name)
        };
        du_walk(dev, &child, &child_path, out)?;
    }
    Ok(())
}

/// `crhl <src> <dst>`: creates a hard link. Rejects directory sources
/// outright rather than permitting cycles a naive `du`/`ls` traversal can't
/// survive.
pub fn crhl(dev: &mut impl BlockDevice, src: &str, dst: &str) -> FsResult<()> {
    let (_, _, src_idx) = resolve_existing(dev, src)?;
    let mut src_inode = inode::read(dev, src_idx)?;
    if src_inode.is_directory {
        return Err(FsError::IsADirectory);
    }

    let (dst_parent_idx, dst_leaf) = resolve_absent(dev, dst)?;
    let mut dst_parent = inode::read(dev, dst_parent_idx)?;
    if !dst_parent.is_directory {
        return Err(FsError::NotADirectory);
    }
    let parent_block = dev.read_block(dst_parent.direct_pointers[0])?;
    if !dirent::has_free_slot(&parent_block) {
        return Err(FsError::DirectoryFull);
    }

    dirent::insert(dev, &mut dst_parent, dst_parent_idx, &dst_leaf, src_idx)?
        .expect("capacity was pre-checked above");

    src_inode.link_count += 1;
    inode::write(dev, src_idx, &src_inode).map_err(FsError::from)
}

/// `rm <path>`: unlinks a file, freeing its storage once the link count
/// reaches zero.
pub fn rm(dev: &mut impl BlockDevice, path: &str) -> FsResult<()> {
    let (parent_idx, leaf, target_idx) = resolve_existing(dev, path)?;
    let mut target = inode::read(dev, target_idx)?;
    if target.is_directory {
        return Err(FsError::IsADirectory);
    }

    let mut parent = inode::read(dev, parent_idx)?;
    dirent::remove(dev, &mut parent, parent_idx, &leaf, target_idx)?;

    target.link_count = target.link_count.saturating_sub(1);
    let mut sb = Superblock::load(dev)?;
    if target.link_count == 0 {
        free_inode_storage(dev, &mut sb, target_idx, &target)?;
    } else {
        inode::write(dev, target_idx, &target)?;
    }
    Ok(sb.store(dev)?)
}

/// `ext <path> <n>`: grows a file by `n` bytes, zero-filling the new tail.
pub fn ext(dev: &mut impl BlockDevice, path: &str, n: u64) -> FsResult<()> {
    if n == 0 {
        return Ok(());
    }
    let (_, _, target_idx) = resolve_existing(dev, path)?;
    let mut target = inode::read(dev, target_idx)?;
    if target.is_directory {
        return Err(FsError::IsADirectory);
    }

    let new_size = target.size as u64 + n;
    if new_size > MAX_FILE_SIZE {
        return Err(FsError::FileTooLarge);
    }
    let old_block_count = target.block_count();
    let new_block_count = ceil_blocks(new_size);
    let needed = new_block_count - old_block_count;

    let mut sb = Superblock::load(dev)?;
    if needed > sb.free_block_count {
        return Err(FsError::NoFreeBlocks);
    }

    let zero_block = [0u8; BLOCK_SIZE as usize];
    for i in old_block_count..new_block_count {
        let block_idx = alloc_block(dev, &sb)?;
        dev.write_block(block_idx, &zero_block)?;
        target.direct_pointers[i as usize] = block_idx;
        sb.free_block_count -= 1;
    }

    target.size = new_size as u32;
    inode::write(dev, target_idx, &target)?;
    Ok(sb.store(dev)?)
}

/// `red <path> <n>`: shrinks a file by `n` bytes. Shrinking to or past zero
/// frees the file entirely, the same way a last-link `rm` would.
pub fn red(dev: &mut impl BlockDevice, path: &str, n: u64) -> FsResult<()> {
    let (parent_idx, leaf, target_idx) = resolve_existing(dev, path)?;
    let mut target = inode::read(dev, target_idx)?;
    if target.is_directory {
        return Err(FsError::IsADirectory);
    }

    if n >= target.size as u64 {
        let mut parent = inode::read(dev, parent_idx)?;
        dirent::remove(dev, &mut parent, parent_idx, &leaf, target_idx)?;
        let mut sb = Superblock::load(dev)?;
        free_inode_storage(dev, &mut sb, target_idx, &target)?;
        return Ok(sb.store(dev)?);
    }

    let new_size = target.size as u64 - n;
    let old_block_count = target.block_count();
    let new_block_count = ceil_blocks(new_size);

    let mut sb = Superblock::load(dev)?;
    for i in new_block_count..old_block_count {
        release_block(dev, target.direct_pointers[i as usize])?;
        sb.free_block_count += 1;
        target.direct_pointers[i as usize] = 0;
    }

    target.size = new_size as u32;
    inode::write(dev, target_idx, &target)?;
    Ok(sb.store(dev)?)
}

/// `ecpt <host_bytes> <vfs_path>`: creates a new regular file from
/// already-read host bytes.
pub fn ecpt(dev: &mut impl BlockDevice, host_bytes: &[u8], vfs_path: &str) -> FsResult<()> {
    if host_bytes.len() as u64 > MAX_FILE_SIZE {
        return Err(FsError::FileTooLarge);
    }
    let (parent_idx, leaf) = resolve_absent(dev, vfs_path)?;
    let mut parent = inode::read(dev, parent_idx)?;
    if !parent.is_directory {
        return Err(FsError::NotADirectory);
    }
    let parent_block = dev.read_block(parent.direct_pointers[0])?;
    if !dirent::has_free_slot(&parent_block) {
        return Err(FsError::DirectoryFull);
    }

    let needed_blocks = ceil_blocks(host_bytes.len() as u64);
    let mut sb = Superblock::load(dev)?;
    if sb.free_inode_count == 0 {
        return Err(FsError::NoFreeInodes);
    }
    if needed_blocks > sb.free_block_count {
        return Err(FsError::NoFreeBlocks);
    }

    let new_inode_idx = alloc_inode(dev, &sb)?;
    sb.free_inode_count -= 1;

    let mut file = Inode::empty();
    file.link_count = 1;
    file.size = host_bytes.len() as u32;
    for i in 0..needed_blocks {
        let block_idx = match alloc_block(dev, &sb) {
            Ok(idx) => idx,
            Err(e) => {
                for &b in file.direct_pointers.iter().take(i as usize) {
                    release_block(dev, b)?;
                }
                release_inode(dev, new_inode_idx)?;
                return Err(e);
            }
        };
        sb.free_block_count -= 1;
        let start = i as usize * BLOCK_SIZE as usize;
        let end = (start + BLOCK_SIZE as usize).min(host_bytes.len());
        let mut buf = [0u8; BLOCK_SIZE as usize];
        buf[..end - start].copy_from_slice(&host_bytes[start..end]);
        dev.write_block(block_idx, &buf)?;
        file.direct_pointers[i as usize] = block_idx;
    }

    inode::write(dev, new_inode_idx, &file)?;
    dirent::insert(dev, &mut parent, parent_idx, &leaf, new_inode_idx)?
        .expect("capacity was pre-checked above");
    Ok(sb.store(dev)?)
}

/// `ecpf <vfs_path>`: reads a regular file's full contents back out.
pub fn ecpf(dev: &mut impl BlockDevice, vfs_path: &str) -> FsResult<Vec<u8>> {
    let (_, _, target_idx) = resolve_existing(dev, vfs_path)?;
    let target = inode::read(dev, target_idx)?;
    if target.is_directory {
        return Err(FsError::IsADirectory);
    }
    let mut out = Vec::with_capacity(target.size as usize);
    for &block_idx in target.direct_pointers.iter().take(target.block_count() as usize) {
        out.extend_from_slice(&dev.read_block(block_idx)?);
    }
    out.truncate(target.size as usize);
    Ok(out)
}
