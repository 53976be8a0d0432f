//! Directory subsystem for a second-extended-style filesystem: chunk
//! codec, page accessor, directory engine, inode-layer contract, and
//! namespace operations, wired together here for the FUSE adapter
//! (`fuse.rs`) and the mount binary (`main.rs`).
pub use disk_driver;

pub mod codec;
pub mod desc;
pub mod engine;
pub mod error;
pub mod fuse;
pub mod inode;
pub mod mem;
pub mod namei;
pub mod page;
pub mod types;
pub mod utils;
pub mod xattr;

use desc::{Ext2SuperBlock, EXT2_ROOT_INO};
use disk_driver::DiskDriver;
use engine::DirEngine;
use inode::{MemInodeStore, MemNameCache};
use mem::Ext2SuperBlockMem;
use namei::Namei;
use std::time::Duration;

/// Attribute cache TTL handed to the FUSE adapter.
pub const TTL: Duration = Duration::from_secs(1);

/// The concrete filesystem: a directory engine and namespace-operations
/// layer wired to the in-memory inode store and name cache (spec §4.F's
/// ambient, single-block-group stand-in for a real multi-group ext2
/// volume). Generic only over the disk driver, so `fuse.rs` and
/// `main.rs` can swap `FileDiskDriver` for `MemoryDiskDriver` in tests.
pub struct Ext2Fs<D: DiskDriver> {
    pub namei: Namei<D, MemInodeStore, MemInodeStore, MemNameCache>,
    pub super_block: Ext2SuperBlockMem,
}

impl<D: DiskDriver> Ext2Fs<D> {
    /// Builds a fresh filesystem: formats the root directory as an empty
    /// directory whose parent is itself, mirroring `mkfs`'s own root setup.
    pub fn format(driver: D, sb: &Ext2SuperBlock, page_size: u32) -> Self {
        let super_block = Ext2SuperBlockMem::from_disk(sb);
        let block_size = super_block.block_size();
        let store = MemInodeStore::new(
            super_block.s_inodes_count,
            block_size,
            super_block.filetype_enabled,
        );
        let quota = MemInodeStore::new(0, block_size, super_block.filetype_enabled);
        let engine = DirEngine::new(page::PageCache::new(driver, page_size, block_size));

        let root = EXT2_ROOT_INO as u32;
        engine
            .make_empty(&store, root, root)
            .expect("formatting the root directory cannot fail on a fresh device");

        Self {
            namei: Namei::new(engine, store, quota, MemNameCache::new()),
            super_block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disk_driver::memory::MemoryDiskDriver;

    #[test]
    fn format_produces_an_empty_root_directory() {
        let sb = Ext2SuperBlock {
            s_inodes_count: 256,
            s_log_block_size: 2, // 4 KiB blocks (1 << 2) * 1024
            ..Default::default()
        };
        let fs = Ext2Fs::format(MemoryDiskDriver::new(), &sb, 4096);
        let root = EXT2_ROOT_INO as u32;
        assert!(fs.namei.engine.empty_dir(&fs.namei.store, root).unwrap());
    }
}
