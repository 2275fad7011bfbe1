//! Error type returned by every engine operation.

use std::fmt;
use std::io;

/// An error produced by the filesystem engine.
///
/// All variants are fatal to the operation that produced them: there is no
/// rollback protocol, the caller is expected to print [`FsError`]'s
/// [`Display`] impl and abort.
#[derive(Debug)]
pub enum FsError {
    /// A read or write against the underlying [`crate::device::BlockDevice`] failed.
    Io(io::Error),
    /// The path was empty, did not start with `/`, or walked through a
    /// missing or non-directory intermediate component.
    BadPath,
    /// The operation required an existing target but the path resolved to
    /// nothing.
    NotFound,
    /// The operation required an absent destination but something already
    /// exists there.
    AlreadyExists,
    /// A file was required but the target is a directory.
    IsADirectory,
    /// A directory was required but the target is a regular file.
    NotADirectory,
    /// `rmdir` was called on a directory that still has live entries.
    DirectoryNotEmpty,
    /// The parent directory's single data block has no free slot.
    DirectoryFull,
    /// The inode bitmap is full.
    NoFreeInodes,
    /// The block bitmap is full, or does not have enough free blocks left
    /// for the requested allocation.
    NoFreeBlocks,
    /// A file would need to exceed [`crate::layout::DIRECT_BLOCKS`] direct
    /// blocks to hold the requested content.
    FileTooLarge,
    /// The requested image size is too small to hold the fixed metadata
    /// plus at least one data block.
    ImageTooSmall,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::BadPath => write!(f, "invalid path"),
            Self::NotFound => write!(f, "no such file or directory"),
            Self::AlreadyExists => write!(f, "file exists"),
            Self::IsADirectory => write!(f, "is a directory"),
            Self::NotADirectory => write!(f, "not a directory"),
            Self::DirectoryNotEmpty => write!(f, "directory not empty"),
            Self::DirectoryFull => write!(f, "directory is full"),
            Self::NoFreeInodes => write!(f, "no free inodes"),
            Self::NoFreeBlocks => write!(f, "no free blocks"),
            Self::FileTooLarge => write!(f, "file too large"),
            Self::ImageTooSmall => write!(f, "image too small"),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Convenience alias used throughout the engine.
pub type FsResult<T> = Result<T, FsError>;
