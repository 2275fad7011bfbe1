//! Path resolver: translates an absolute path into a tagged [`Resolution`]
//! rather than folding "not found" and "found" into one index the way a
//! "target index equals parent index" sentinel would, which would make the
//! root directory indistinguishable from "missing" since both are index 0.

use crate::device::BlockDevice;
use crate::dirent;
use crate::inode;
use crate::layout::MAX_FILENAME;
use crate::layout::ROOT_INODE;
use std::io;

/// The outcome of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The full path exists; `inode` is its target.
    Found {
        parent: u32,
        leaf: String,
        inode: u32,
    },
    /// Every component up to the leaf exists and is a directory, but the
    /// leaf itself is not present in `parent`.
    Absent { parent: u32, leaf: String },
    /// The path was empty, not absolute, or walked through a missing or
    /// non-directory intermediate component.
    BadPath,
}

/// Resolves `path` against the image rooted at `dev`.
pub fn resolve(dev: &mut impl BlockDevice, path: &str) -> io::Result<Resolution> {
    if path.is_empty() || !path.starts_with('/') {
        return Ok(Resolution::BadPath);
    }
    if path == "/" {
        return Ok(Resolution::Found {
            parent: ROOT_INODE,
            leaf: "/".to_string(),
            inode: ROOT_INODE,
        });
    }

    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if components.is_empty() {
        return Ok(Resolution::BadPath);
    }

    let mut current_idx = ROOT_INODE;
    let mut current = inode::read(dev, current_idx)?;

    for (i, component) in components.iter().enumerate() {
        let last = i == components.len() - 1;
        let block = dev.read_block(current.direct_pointers[0])?;
        let found = dirent::find(&block, component);

        if !last {
            let Some((_, entry)) = found else {
                return Ok(Resolution::BadPath);
            };
            let next = inode::read(dev, entry.inode_index)?;
            if !next.is_directory {
                return Ok(Resolution::BadPath);
            }
            current_idx = entry.inode_index;
            current = next;
        } else {
            let leaf = truncate_leaf(component);
            return Ok(match found {
                Some((_, entry)) => Resolution::Found {
                    parent: current_idx,
                    leaf,
                    inode: entry.inode_index,
                },
                None => Resolution::Absent {
                    parent: current_idx,
                    leaf,
                },
            });
        }
    }

    unreachable!("loop always returns on the last component")
}

fn truncate_leaf(component: &str) -> String {
    if component.len() >= MAX_FILENAME {
        component[..MAX_FILENAME - 1].to_string()
    } else {
        component.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::MemDevice;
    use crate::format;
    use crate::layout::DATA_BLOCKS_OFFSET;

    fn fresh() -> MemDevice {
        let mut dev = MemDevice::with_len(0);
        format::mkfs(&mut dev, DATA_BLOCKS_OFFSET + 1024 * 64).unwrap();
        dev
    }

    #[test]
    fn root_resolves_to_root_inode() {
        let mut dev = fresh();
        assert_eq!(
            resolve(&mut dev, "/").unwrap(),
            Resolution::Found {
                parent: 0,
                leaf: "/".to_string(),
                inode: 0,
            }
        );
    }

    #[test]
    fn missing_top_level_entry_is_absent() {
        let mut dev = fresh();
        assert_eq!(
            resolve(&mut dev, "/a").unwrap(),
            Resolution::Absent {
                parent: 0,
                leaf: "a".to_string(),
            }
        );
    }

    #[test]
    fn missing_intermediate_component_is_bad_path() {
        let mut dev = fresh();
        assert_eq!(resolve(&mut dev, "/a/b").unwrap(), Resolution::BadPath);
    }

    #[test]
    fn relative_path_is_bad_path() {
        let mut dev = fresh();
        assert_eq!(resolve(&mut dev, "a").unwrap(), Resolution::BadPath);
        assert_eq!(resolve(&mut dev, "").unwrap(), Resolution::BadPath);
    }

    #[test]
    fn found_child_through_mkdir() {
        let mut dev = fresh();
        crate::ops::mkdir(&mut dev, "/a").unwrap();
        match resolve(&mut dev, "/a").unwrap() {
            Resolution::Found { parent, leaf, .. } => {
                assert_eq!(parent, 0);
                assert_eq!(leaf, "a");
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn non_directory_intermediate_is_bad_path() {
        let mut dev = fresh();
        crate::ops::ecpt(&mut dev, b"hi", "/f").unwrap();
        assert_eq!(resolve(&mut dev, "/f/x").unwrap(), Resolution::BadPath);
    }
}
