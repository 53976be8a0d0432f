//! Inode-layer contract (spec §4.E, §6.4) and its ambient concrete
//! implementation (spec §4.F): a single-block-group, in-memory-resident
//! inode table plus free bitmaps, mirroring the teacher's `RFS` fields
//! (`bitmap_inode`, `bitmap_data`, `group_desc_table`) and bitmap
//! search/set helpers.
use crate::ext2::desc::{Ext2INode, EXT2_ROOT_INO};
use crate::ext2::error::DirError;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// What the engine (4.C) and namespace ops (4.D) require of the inode
/// collaborator (spec §6.4's "Inode service").
pub trait InodeStore {
    fn new_inode(&self, parent: u32, mode: u32) -> Result<u32, DirError>;
    fn iget(&self, ino: u32) -> Result<Ext2INode, DirError>;
    fn iput(&self, ino: u32, inode: &Ext2INode) -> Result<(), DirError>;
    fn inc_link(&self, ino: u32) -> Result<(), DirError>;
    fn dec_link(&self, ino: u32) -> Result<(), DirError>;
    fn mark_dirty(&self, ino: u32) -> Result<(), DirError>;
    /// Releases an inode whose link count has just reached zero. A no-op
    /// if it hasn't (mirrors Linux's `iput`/`drop_nlink` split).
    fn drop_nlink(&self, ino: u32) -> Result<(), DirError>;

    /// In-memory-only directory version counter (spec §3.1, §5). Not
    /// persisted: ext2 itself keeps this on the VFS inode, not on disk.
    fn version(&self, ino: u32) -> u64;
    fn bump_version(&self, ino: u32);

    /// Directory lookup hint (spec §3.1), persisted on the inode.
    fn lookup_hint(&self, ino: u32) -> u32;
    fn set_lookup_hint(&self, ino: u32, page: u32);
}

/// What the engine/namespace-ops layer requires of the superblock
/// collaborator (spec §6.2).
pub trait SuperblockView {
    fn inodes_count(&self) -> u32;
    fn filetype_enabled(&self) -> bool;
    fn block_size(&self) -> u32;
}

/// Quota collaborator (spec §6.4): `initialize` called once per mutation
/// on the parent. Out of scope to implement for real; this is the
/// no-op stand-in the contract requires.
pub trait QuotaService {
    fn initialize(&self, ino: u32) -> Result<(), DirError>;
}

/// Name cache collaborator (spec §6.4): a dentry -> inode map standing in
/// for a real VFS dcache.
pub trait NameCache {
    fn splice_alias(&self, ino: u32, parent: u32, name: &str);
    fn instantiate(&self, ino: u32, parent: u32, name: &str);
    fn tmpfile(&self, ino: u32);
    fn lookup(&self, parent: u32, name: &str) -> Option<u32>;
    fn invalidate(&self, parent: u32, name: &str);
}

struct InodeSlot {
    inode: Ext2INode,
    version: u64,
}

/// Concrete, single-block-group, in-memory inode table and bitmaps. Real
/// block allocation, multi-group layout, and quota accounting are out of
/// scope (spec Non-goals / §1 "external collaborators named, not
/// specified") — this exists only to make `InodeStore` concrete enough to
/// run the engine and namespace ops end to end.
pub struct MemInodeStore {
    inodes: Mutex<HashMap<u32, InodeSlot>>,
    bitmap_inode: Mutex<Vec<u8>>,
    inodes_count: u32,
    block_size: u32,
    filetype_enabled: bool,
}

impl MemInodeStore {
    pub fn new(inodes_count: u32, block_size: u32, filetype_enabled: bool) -> Self {
        let store = Self {
            inodes: Mutex::new(HashMap::new()),
            bitmap_inode: Mutex::new(vec![0u8; (inodes_count as usize + 7) / 8]),
            inodes_count,
            block_size,
            filetype_enabled,
        };
        // Inode 0 means "no inode" on disk (the tombstone sentinel in a
        // directory record); never hand it out.
        bitmap_set(&mut store.bitmap_inode.lock().unwrap(), 0);
        bitmap_set(&mut store.bitmap_inode.lock().unwrap(), EXT2_ROOT_INO as usize);
        store.inodes.lock().unwrap().insert(
            EXT2_ROOT_INO as u32,
            InodeSlot {
                inode: Ext2INode::default(),
                version: 0,
            },
        );
        store
    }

    fn alloc_ino(&self) -> Result<u32, DirError> {
        let mut bitmap = self.bitmap_inode.lock().unwrap();
        let ino = bitmap_search(&bitmap)
            .map_err(|_| DirError::NoSpace)? as u32;
        if ino >= self.inodes_count {
            return Err(DirError::NoSpace);
        }
        bitmap_set(&mut bitmap, ino as usize);
        Ok(ino)
    }
}

impl InodeStore for MemInodeStore {
    fn new_inode(&self, _parent: u32, mode: u32) -> Result<u32, DirError> {
        let ino = self.alloc_ino()?;
        let mut inode = Ext2INode::default();
        inode.i_mode = mode as u16;
        inode.i_links_count = 0;
        self.inodes.lock().unwrap().insert(
            ino,
            InodeSlot {
                inode,
                version: 0,
            },
        );
        Ok(ino)
    }

    fn iget(&self, ino: u32) -> Result<Ext2INode, DirError> {
        let inodes = self.inodes.lock().unwrap();
        inodes
            .get(&ino)
            .map(|slot| clone_inode(&slot.inode))
            .ok_or(DirError::NotFound)
    }

    fn iput(&self, ino: u32, inode: &Ext2INode) -> Result<(), DirError> {
        let mut inodes = self.inodes.lock().unwrap();
        let slot = inodes.get_mut(&ino).ok_or(DirError::NotFound)?;
        slot.inode = clone_inode(inode);
        Ok(())
    }

    fn inc_link(&self, ino: u32) -> Result<(), DirError> {
        let mut inodes = self.inodes.lock().unwrap();
        let slot = inodes.get_mut(&ino).ok_or(DirError::NotFound)?;
        slot.inode.i_links_count += 1;
        Ok(())
    }

    fn dec_link(&self, ino: u32) -> Result<(), DirError> {
        let mut inodes = self.inodes.lock().unwrap();
        let slot = inodes.get_mut(&ino).ok_or(DirError::NotFound)?;
        slot.inode.i_links_count = slot.inode.i_links_count.saturating_sub(1);
        Ok(())
    }

    fn mark_dirty(&self, _ino: u32) -> Result<(), DirError> {
        Ok(())
    }

    fn drop_nlink(&self, ino: u32) -> Result<(), DirError> {
        let mut inodes = self.inodes.lock().unwrap();
        if let Some(slot) = inodes.get(&ino) {
            if slot.inode.i_links_count == 0 {
                inodes.remove(&ino);
                let mut bitmap = self.bitmap_inode.lock().unwrap();
                bitmap_clear(&mut bitmap, ino as usize);
            }
        }
        Ok(())
    }

    fn version(&self, ino: u32) -> u64 {
        self.inodes
            .lock()
            .unwrap()
            .get(&ino)
            .map(|s| s.version)
            .unwrap_or(0)
    }

    fn bump_version(&self, ino: u32) {
        if let Some(slot) = self.inodes.lock().unwrap().get_mut(&ino) {
            slot.version += 1;
        }
    }

    fn lookup_hint(&self, ino: u32) -> u32 {
        self.inodes
            .lock()
            .unwrap()
            .get(&ino)
            .map(|s| s.inode.i_dir_start_lookup)
            .unwrap_or(0)
    }

    fn set_lookup_hint(&self, ino: u32, page: u32) {
        if let Some(slot) = self.inodes.lock().unwrap().get_mut(&ino) {
            slot.inode.i_dir_start_lookup = page;
        }
    }
}

impl SuperblockView for MemInodeStore {
    fn inodes_count(&self) -> u32 {
        self.inodes_count
    }
    fn filetype_enabled(&self) -> bool {
        self.filetype_enabled
    }
    fn block_size(&self) -> u32 {
        self.block_size
    }
}

impl QuotaService for MemInodeStore {
    fn initialize(&self, _ino: u32) -> Result<(), DirError> {
        Ok(())
    }
}

/// In-memory dentry cache standing in for a real VFS dcache.
pub struct MemNameCache {
    entries: Mutex<HashMap<(u32, String), u32>>,
}

impl MemNameCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemNameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NameCache for MemNameCache {
    fn splice_alias(&self, ino: u32, parent: u32, name: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert((parent, name.to_string()), ino);
    }

    fn instantiate(&self, ino: u32, parent: u32, name: &str) {
        self.splice_alias(ino, parent, name);
    }

    fn tmpfile(&self, _ino: u32) {}

    fn lookup(&self, parent: u32, name: &str) -> Option<u32> {
        self.entries
            .lock()
            .unwrap()
            .get(&(parent, name.to_string()))
            .copied()
    }

    fn invalidate(&self, parent: u32, name: &str) {
        self.entries.lock().unwrap().remove(&(parent, name.to_string()));
    }
}

fn clone_inode(inode: &Ext2INode) -> Ext2INode {
    // `Ext2INode` has no derive(Clone) (its `#[repr(C, align(2))]` byte
    // layout is read straight off disk); a field-by-field copy instead.
    Ext2INode {
        i_mode: inode.i_mode,
        i_uid: inode.i_uid,
        i_size: inode.i_size,
        i_atime: inode.i_atime,
        i_ctime: inode.i_ctime,
        i_mtime: inode.i_mtime,
        i_dtime: inode.i_dtime,
        i_gid: inode.i_gid,
        i_links_count: inode.i_links_count,
        i_blocks: inode.i_blocks,
        i_flags: inode.i_flags,
        i_version: inode.i_version,
        i_block: inode.i_block,
        i_generation: inode.i_generation,
        i_file_acl: inode.i_file_acl,
        i_size_high: inode.i_size_high,
        i_faddr: inode.i_faddr,
        i_blocks_hi: inode.i_blocks_hi,
        i_file_acl_high: inode.i_file_acl_high,
        i_uid_high: inode.i_uid_high,
        i_gid_high: inode.i_gid_high,
        i_checksum_lo: inode.i_checksum_lo,
        i_reserved: inode.i_reserved,
        i_dir_start_lookup: inode.i_dir_start_lookup,
    }
}

pub fn bitmap_search(bitmap: &[u8]) -> Result<usize> {
    for (i, byte) in bitmap.iter().enumerate() {
        for j in 0..8 {
            if (byte >> j) & 0x1 == 0 {
                return Ok(i * 8 + j);
            }
        }
    }
    Err(anyhow!("bitmap full"))
}

pub fn bitmap_set(bitmap: &mut [u8], index: usize) {
    bitmap[index / 8] |= 1 << (index % 8);
}

pub fn bitmap_clear(bitmap: &mut [u8], index: usize) {
    bitmap[index / 8] &= !(1 << (index % 8));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_inode_allocates_distinct_numbers() {
        let store = MemInodeStore::new(256, 4096, true);
        let a = store.new_inode(EXT2_ROOT_INO as u32, 0o100644).unwrap();
        let b = store.new_inode(EXT2_ROOT_INO as u32, 0o040755).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn drop_nlink_frees_bitmap_slot_only_at_zero() {
        let store = MemInodeStore::new(256, 4096, true);
        let ino = store.new_inode(EXT2_ROOT_INO as u32, 0o100644).unwrap();
        store.inc_link(ino).unwrap();
        store.drop_nlink(ino).unwrap();
        assert!(store.iget(ino).is_ok());
        store.dec_link(ino).unwrap();
        store.drop_nlink(ino).unwrap();
        assert!(store.iget(ino).is_err());
    }

    #[test]
    fn version_counter_bumps_independently_per_inode() {
        let store = MemInodeStore::new(256, 4096, true);
        let a = store.new_inode(EXT2_ROOT_INO as u32, 0o040755).unwrap();
        store.bump_version(a);
        store.bump_version(a);
        assert_eq!(store.version(a), 2);
        assert_eq!(store.version(EXT2_ROOT_INO as u32), 0);
    }
}
