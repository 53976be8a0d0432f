//! Directory engine (spec §4.C): iteration, find, insert, delete, update,
//! empty-test, and make-empty over a directory inode's pages. Grounded
//! directly on original `dir.c` (`ext21_readdir`, `ext21_find_entry`,
//! `ext21_add_link`, `ext21_delete_entry`, `ext21_set_link`,
//! `ext21_make_empty`, `ext21_empty_dir`, `ext21_dotdot`,
//! `ext21_inode_by_name`), reworked into `Result` returns and RAII page
//! guards in place of the original's `goto`/`unlock_page` pairs.
//!
//! This implementation wires the page cache with page size equal to chunk
//! (block) size everywhere — the permitted degenerate case of spec §3.4
//! ("a page contains one or more whole chunks"). `codec`/`page::check_page`
//! still handle the general multi-chunk-per-page case; only the concrete
//! disk layout here happens to use one chunk per page.
use crate::ext2::codec::{
    dtype_from_filetype, encode_rec_len, filetype_from_mode, min_rec_len, DType,
};
use crate::ext2::error::{CorruptReason, DirError};
use crate::ext2::inode::{InodeStore, SuperblockView};
use crate::ext2::page::{validate_inode_bounds, PageCache, PageGuard};
use disk_driver::DiskDriver;

/// One decoded directory record, with its chunk-relative byte offset.
#[derive(Debug, Clone)]
pub struct Record {
    pub offset: u32,
    pub inode: u32,
    pub rec_len: u32,
    pub name_len: u8,
    pub file_type: u8,
    pub name: Vec<u8>,
}

fn read_record(data: &[u8], offset: u32, page_size: u32) -> Result<Record, DirError> {
    let o = offset as usize;
    if o + 8 > data.len() {
        return Err(DirError::corrupt(CorruptReason::SpansChunk));
    }
    let inode = u32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);
    let raw_rec_len = u16::from_le_bytes([data[o + 4], data[o + 5]]);
    let rec_len = crate::ext2::codec::decode_rec_len(raw_rec_len, page_size);
    if rec_len == 0 {
        return Err(DirError::corrupt(CorruptReason::ZeroRecLen));
    }
    let name_len = data[o + 6];
    let file_type = data[o + 7];
    let name_end = o + 8 + name_len as usize;
    let name = if name_end <= data.len() {
        data[o + 8..name_end].to_vec()
    } else {
        Vec::new()
    };
    Ok(Record {
        offset,
        inode,
        rec_len,
        name_len,
        file_type,
        name,
    })
}

fn write_record_header(
    data: &mut [u8],
    offset: u32,
    inode: u32,
    rec_len: u32,
    name_len: u8,
    file_type: u8,
    page_size: u32,
) {
    let o = offset as usize;
    data[o..o + 4].copy_from_slice(&inode.to_le_bytes());
    data[o + 4..o + 6].copy_from_slice(&encode_rec_len(rec_len, page_size).to_le_bytes());
    data[o + 6] = name_len;
    data[o + 7] = file_type;
}

fn write_name(data: &mut [u8], offset: u32, name: &[u8]) {
    let o = offset as usize + 8;
    data[o..o + name.len()].copy_from_slice(name);
}

/// The directory engine, generic over a disk-backed page cache.
pub struct DirEngine<D: DiskDriver> {
    pages: PageCache<D>,
}

impl<D: DiskDriver> DirEngine<D> {
    pub fn new(pages: PageCache<D>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &PageCache<D> {
        &self.pages
    }

    fn chunk_size<S: SuperblockView>(&self, sb: &S) -> u32 {
        sb.block_size()
    }

    fn get_page<S: InodeStore>(
        &self,
        store: &S,
        dir_ino: u32,
        page_index: u32,
        quiet: bool,
    ) -> Result<PageGuard<'_>, DirError> {
        let inode = store.iget(dir_ino)?;
        self.pages
            .get_page(dir_ino, page_index, quiet, inode.i_size as u64, inode.i_blocks)
    }

    /// 4.C.1 Iteration / readdir. `pos` is a byte offset into the
    /// directory; `sink` returns `true` to accept the entry and continue,
    /// `false` to stop (the next call resumes at the returned `pos`).
    pub fn readdir<S: InodeStore + SuperblockView>(
        &self,
        store: &S,
        dir_ino: u32,
        mut pos: u64,
        observed_version: u64,
        mut sink: impl FnMut(&str, u32, DType, u64) -> bool,
    ) -> Result<u64, DirError> {
        let inode = store.iget(dir_ino)?;
        let page_size = self.pages.page_size() as u64;
        let chunk_size = self.chunk_size(store) as u64;

        loop {
            if pos > inode.i_size as u64 - min_rec_len(1) as u64 {
                return Ok(pos);
            }
            let page_index = (pos / page_size) as u32;
            let mut offset = (pos % page_size) as u32;

            let page = self.get_page(store, dir_ino, page_index, false)?;

            if store.version(dir_ino) != observed_version {
                let chunk_start = offset - (offset % chunk_size as u32);
                let target = offset;
                offset = chunk_start;
                while offset < target {
                    let rec = read_record(page.data(), offset, page.page_size())?;
                    offset += rec.rec_len;
                }
                pos = page_index as u64 * page_size + offset as u64;
            }

            let limit = page.data().len() as u32;
            while offset < limit {
                let rec = read_record(page.data(), offset, page.page_size())?;
                if rec.inode != 0 {
                    let name = String::from_utf8_lossy(&rec.name).into_owned();
                    let dtype = if store.filetype_enabled() {
                        dtype_from_filetype(rec.file_type)
                    } else {
                        DType::Unknown
                    };
                    let next = page_index as u64 * page_size + (offset + rec.rec_len) as u64;
                    if !sink(&name, rec.inode, dtype, next) {
                        return Ok(next);
                    }
                }
                offset += rec.rec_len;
                pos += rec.rec_len as u64;
            }
            if pos >= inode.i_size as u64 {
                return Ok(pos);
            }
        }
    }

    /// 4.C.2 find_entry: linear scan from the lookup hint, wrapping at page 0.
    pub fn find_entry<S: InodeStore + SuperblockView>(
        &self,
        store: &S,
        dir_ino: u32,
        name: &str,
    ) -> Result<(PageGuard<'_>, u32), DirError> {
        let inode = store.iget(dir_ino)?;
        let page_size = self.pages.page_size();
        let npages = (inode.i_size + page_size - 1) / page_size;
        if npages == 0 {
            return Err(DirError::NotFound);
        }
        let hint = store.lookup_hint(dir_ino).min(npages.saturating_sub(1));

        let sanity_bound = (inode.i_blocks as u64 * 512) / page_size as u64 + 1;

        let mut page_index = hint;
        let mut visited = 0u32;
        loop {
            if page_index as u64 > sanity_bound {
                return Err(DirError::corrupt(CorruptReason::InodeOutOfBounds));
            }
            let page = self.get_page(store, dir_ino, page_index, false)?;
            let limit = ((inode.i_size as u64)
                .saturating_sub(page_index as u64 * page_size as u64))
            .min(page_size as u64) as u32;

            let mut offset = 0u32;
            while offset < limit {
                let rec = read_record(page.data(), offset, page.page_size())?;
                if rec.inode != 0 && rec.name_len as usize == name.len() && rec.name == name.as_bytes()
                {
                    store.set_lookup_hint(dir_ino, page_index);
                    return Ok((page, offset));
                }
                offset += rec.rec_len;
            }
            drop(page);

            visited += 1;
            page_index = (page_index + 1) % npages;
            if page_index == hint || visited >= npages {
                return Err(DirError::NotFound);
            }
        }
    }

    /// 4.C.9 inode_by_name: thin wrapper releasing the page on return.
    pub fn inode_by_name<S: InodeStore + SuperblockView>(
        &self,
        store: &S,
        dir_ino: u32,
        name: &str,
    ) -> Result<u32, DirError> {
        match self.find_entry(store, dir_ino, name) {
            Ok((page, offset)) => {
                let rec = read_record(page.data(), offset, page.page_size())?;
                Ok(rec.inode)
            }
            Err(DirError::NotFound) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// 4.C.3 insert (add_link).
    pub fn insert<S: InodeStore + SuperblockView>(
        &self,
        store: &S,
        dir_ino: u32,
        name: &str,
        target_ino: u32,
        target_mode: u32,
    ) -> Result<(), DirError> {
        if name.len() > 255 {
            return Err(DirError::NameTooLong);
        }
        let required = min_rec_len(name.len());
        let page_size = self.pages.page_size();

        let mut inode = store.iget(dir_ino)?;
        let npages = inode.i_size / page_size;

        for page_index in 0..=npages {
            let extending = page_index == npages;
            let mut page = self.get_page(store, dir_ino, page_index, extending)?;

            let page_start_byte = page_index as u64 * page_size as u64;
            let used_in_page = if extending {
                0
            } else {
                page_size.min((inode.i_size as u64 - page_start_byte) as u32)
            };

            let mut offset = 0u32;
            let mut candidate: Option<(u32, u32, bool)> = None; // (offset, rec_len, is_reuse)

            while offset < page_size {
                if offset >= used_in_page && candidate.is_none() {
                    // Fresh space past i_size within this page: synthesize
                    // an empty tombstone spanning to the page end.
                    let span = page_size - offset;
                    candidate = Some((offset, span, true));
                    break;
                }
                let rec = read_record(page.data(), offset, page.page_size())?;

                if rec.inode != 0 && rec.name_len as usize == name.len() && rec.name == name.as_bytes() {
                    return Err(DirError::AlreadyExists);
                }

                if rec.inode == 0 && rec.rec_len >= required && candidate.is_none() {
                    candidate = Some((offset, rec.rec_len, true));
                } else if rec.inode != 0 {
                    let used = min_rec_len(rec.name_len as usize);
                    let free = rec.rec_len.saturating_sub(used);
                    if free >= required && candidate.is_none() {
                        candidate = Some((offset, rec.rec_len, false));
                    }
                }
                offset += rec.rec_len;
            }

            let Some((cand_offset, cand_len, is_reuse)) = candidate else {
                continue;
            };

            let file_type = if store.filetype_enabled() {
                filetype_from_mode(target_mode)
            } else {
                0
            };

            let new_offset = if is_reuse {
                cand_offset
            } else {
                let rec = read_record(page.data(), cand_offset, page.page_size())?;
                let existing_used = min_rec_len(rec.name_len as usize);
                write_record_header(
                    page.data_mut(),
                    cand_offset,
                    rec.inode,
                    existing_used,
                    rec.name_len,
                    rec.file_type,
                    page_size,
                );
                cand_offset + existing_used
            };
            let new_len = if is_reuse {
                cand_len
            } else {
                cand_len - min_rec_len(read_record(page.data(), cand_offset, page.page_size())?.name_len as usize)
            };

            write_record_header(
                page.data_mut(),
                new_offset,
                target_ino,
                new_len,
                name.len() as u8,
                file_type,
                page_size,
            );
            write_name(page.data_mut(), new_offset, name.as_bytes());

            if extending {
                inode.i_size += page_size;
                inode.i_blocks += page_size / 512;
                store.iput(dir_ino, &inode)?;
            }
            inode.i_flags &= !(crate::ext2::desc::EXT2_BTREE_FL as u32);
            store.iput(dir_ino, &inode)?;
            store.bump_version(dir_ino);
            store.mark_dirty(dir_ino)?;

            if inode.i_flags & crate::ext2::desc::EXT2_DIRSYNC_FL as u32 != 0 {
                page.commit_sync()?;
            } else {
                page.commit()?;
            }
            return Ok(());
        }

        Err(DirError::NoSpace)
    }

    /// 4.C.4 delete_entry: coalesce with the left neighbour inside the
    /// entry's chunk, or tombstone it if it has none.
    pub fn delete_entry<S: InodeStore>(
        &self,
        store: &S,
        dir_ino: u32,
        page: &mut PageGuard<'_>,
        offset: u32,
    ) -> Result<(), DirError> {
        let page_size = page.page_size();
        let chunk_size = page_size; // one chunk per page, see module docs
        let entry = read_record(page.data(), offset, page_size)?;
        let from = offset - (offset % chunk_size);
        let to = offset + entry.rec_len;

        let mut walk = from;
        let mut prev: Option<u32> = None;
        while walk < offset {
            let rec = read_record(page.data(), walk, page_size)?;
            if rec.rec_len == 0 {
                return Err(DirError::corrupt(CorruptReason::ZeroRecLen));
            }
            prev = Some(walk);
            walk += rec.rec_len;
        }

        if let Some(pde_offset) = prev {
            let pde = read_record(page.data(), pde_offset, page_size)?;
            write_record_header(
                page.data_mut(),
                pde_offset,
                pde.inode,
                to - pde_offset,
                pde.name_len,
                pde.file_type,
                page_size,
            );
        } else {
            write_record_header(
                page.data_mut(),
                offset,
                0,
                entry.rec_len,
                entry.name_len,
                entry.file_type,
                page_size,
            );
        }

        let mut inode = store.iget(dir_ino)?;
        inode.i_flags &= !(crate::ext2::desc::EXT2_BTREE_FL as u32);
        store.iput(dir_ino, &inode)?;
        store.bump_version(dir_ino);
        store.mark_dirty(dir_ino)?;
        page.commit()?;
        Ok(())
    }

    /// 4.C.5 set_link: atomic in-place retarget.
    pub fn set_link<S: InodeStore>(
        &self,
        store: &S,
        dir_ino: u32,
        page: &mut PageGuard<'_>,
        offset: u32,
        new_inode: u32,
        new_mode: u32,
        filetype_enabled: bool,
    ) -> Result<(), DirError> {
        let rec = read_record(page.data(), offset, page.page_size())?;
        let file_type = if filetype_enabled {
            filetype_from_mode(new_mode)
        } else {
            0
        };
        write_record_header(
            page.data_mut(),
            offset,
            new_inode,
            rec.rec_len,
            rec.name_len,
            file_type,
            page.page_size(),
        );
        store.bump_version(dir_ino);
        store.mark_dirty(dir_ino)?;
        page.commit()?;
        Ok(())
    }

    /// 4.C.6 make_empty: builds the initial chunk with "." and "..".
    pub fn make_empty<S: InodeStore + SuperblockView>(
        &self,
        store: &S,
        dir_ino: u32,
        parent_ino: u32,
    ) -> Result<(), DirError> {
        let page_size = self.pages.page_size();
        let mut inode = store.iget(dir_ino)?;
        inode.i_size = 0; // page is fresh, quiet check_page on the all-zero read
        store.iput(dir_ino, &inode)?;

        let mut page = self.get_page(store, dir_ino, 0, true)?;

        let filetype_enabled = store.filetype_enabled();
        let dir_ft = if filetype_enabled {
            crate::ext2::desc::EXT2_FT_DIR as u8
        } else {
            0
        };

        let dot_len = min_rec_len(1);
        write_record_header(page.data_mut(), 0, dir_ino, dot_len, 1, dir_ft, page_size);
        write_name(page.data_mut(), 0, b".");

        let dotdot_len = page_size - dot_len;
        write_record_header(
            page.data_mut(),
            dot_len,
            parent_ino,
            dotdot_len,
            2,
            dir_ft,
            page_size,
        );
        write_name(page.data_mut(), dot_len, b"..");

        inode.i_size = page_size;
        inode.i_blocks = page_size / 512;
        store.iput(dir_ino, &inode)?;
        store.bump_version(dir_ino);
        page.commit_sync()?;
        Ok(())
    }

    /// 4.C.7 empty_dir: false if any live record other than "."/".." exists.
    pub fn empty_dir<S: InodeStore + SuperblockView>(&self, store: &S, dir_ino: u32) -> Result<bool, DirError> {
        let inode = store.iget(dir_ino)?;
        let page_size = self.pages.page_size();
        let npages = (inode.i_size + page_size - 1) / page_size;

        for page_index in 0..npages {
            let page = self.get_page(store, dir_ino, page_index, true)?;
            let page_start = page_index as u64 * page_size as u64;
            let limit = (inode.i_size as u64 - page_start).min(page_size as u64) as u32;
            let mut offset = 0u32;
            while offset < limit {
                let rec = read_record(page.data(), offset, page.page_size())?;
                if rec.inode != 0 {
                    let is_dot = rec.name_len == 1 && rec.name == b"." && rec.inode == dir_ino;
                    let is_dotdot = rec.name_len == 2 && rec.name == b"..";
                    if !(is_dot || is_dotdot) {
                        return Ok(false);
                    }
                }
                offset += rec.rec_len;
            }
        }
        Ok(true)
    }

    /// 4.C.8 dotdot: page 0's second record.
    pub fn dotdot<S: InodeStore>(&self, store: &S, dir_ino: u32) -> Result<(PageGuard<'_>, u32), DirError> {
        let page = self.get_page(store, dir_ino, 0, false)?;
        let first = read_record(page.data(), 0, page.page_size())?;
        Ok((page, first.rec_len))
    }

    pub fn read_record_at(&self, page: &PageGuard<'_>, offset: u32) -> Result<Record, DirError> {
        read_record(page.data(), offset, page.page_size())
    }

    /// Checks inode-number bounds against the superblock across every page
    /// of a directory (spec §3.3 invariant #5, split out of `check_page`
    /// which has no superblock access of its own).
    pub fn validate_bounds<S: InodeStore + SuperblockView>(
        &self,
        store: &S,
        dir_ino: u32,
    ) -> Result<bool, DirError> {
        let inode = store.iget(dir_ino)?;
        let page_size = self.pages.page_size();
        let npages = (inode.i_size + page_size - 1) / page_size;
        for page_index in 0..npages {
            let page = self.get_page(store, dir_ino, page_index, true)?;
            if !validate_inode_bounds(page.data(), page_size, store.inodes_count()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext2::inode::MemInodeStore;
    use disk_driver::memory::MemoryDiskDriver;

    const DIR_INO: u32 = 11;
    const PARENT_INO: u32 = 2;

    fn fresh_engine() -> (DirEngine<MemoryDiskDriver>, MemInodeStore) {
        let engine = DirEngine::new(PageCache::new(MemoryDiskDriver::new(), 4096, 4096));
        let store = MemInodeStore::new(256, 4096, true);
        (engine, store)
    }

    fn make_dir_ino(store: &MemInodeStore, target: u32) -> u32 {
        loop {
            let cand = store.new_inode(PARENT_INO, 0o040755).unwrap();
            if cand == target {
                return cand;
            }
            assert!(cand < target, "overshot target inode number");
        }
    }

    #[test]
    fn make_empty_produces_spec_scenario_1_layout() {
        let (engine, store) = fresh_engine();
        let dir_ino = make_dir_ino(&store, DIR_INO);

        engine.make_empty(&store, dir_ino, PARENT_INO).unwrap();

        let page = engine.get_page(&store, DIR_INO, 0, true).unwrap();
        let dot = read_record(page.data(), 0, 4096).unwrap();
        assert_eq!(dot.inode, DIR_INO);
        assert_eq!(dot.rec_len, 12);
        assert_eq!(dot.name_len, 1);
        assert_eq!(dot.file_type, 2);
        assert_eq!(&dot.name, b".");

        let dotdot = read_record(page.data(), 12, 4096).unwrap();
        assert_eq!(dotdot.inode, PARENT_INO);
        assert_eq!(dotdot.rec_len, 4084);
        assert_eq!(dotdot.name_len, 2);
        assert_eq!(dotdot.file_type, 2);
        assert_eq!(&dotdot.name, b"..");
    }

    #[test]
    fn insert_then_find_then_delete_round_trips() {
        let (engine, store) = fresh_engine();
        let dir_ino = make_dir_ino(&store, DIR_INO);
        engine.make_empty(&store, dir_ino, PARENT_INO).unwrap();

        let foo_ino = 17;
        engine
            .insert(&store, dir_ino, "foo", foo_ino, libc::S_IFREG | 0o644)
            .unwrap();

        let (page, offset) = engine.find_entry(&store, dir_ino, "foo").unwrap();
        assert_eq!(offset, 24);
        let rec = read_record(page.data(), offset, 4096).unwrap();
        assert_eq!(rec.inode, foo_ino);
        assert_eq!(rec.rec_len, 4072);
        assert_eq!(rec.name_len, 3);
        assert_eq!(rec.file_type, 1);
        drop(page);

        assert_eq!(store.lookup_hint(dir_ino), 0);

        let dotdot_rec = {
            let page = engine.get_page(&store, dir_ino, 0, true).unwrap();
            read_record(page.data(), 12, 4096).unwrap()
        };
        assert_eq!(dotdot_rec.rec_len, 12);

        let (mut page, offset) = engine.find_entry(&store, dir_ino, "foo").unwrap();
        engine.delete_entry(&store, dir_ino, &mut page, offset).unwrap();
        drop(page);

        let dotdot_rec = {
            let page = engine.get_page(&store, dir_ino, 0, true).unwrap();
            read_record(page.data(), 12, 4096).unwrap()
        };
        assert_eq!(dotdot_rec.rec_len, 4084);

        let err = engine.find_entry(&store, dir_ino, "foo").unwrap_err();
        assert!(matches!(err, DirError::NotFound));
    }

    #[test]
    fn insert_duplicate_name_fails_without_mutating() {
        let (engine, store) = fresh_engine();
        let dir_ino = make_dir_ino(&store, DIR_INO);
        engine.make_empty(&store, dir_ino, PARENT_INO).unwrap();
        engine.insert(&store, dir_ino, "foo", 17, libc::S_IFREG | 0o644).unwrap();
        let err = engine
            .insert(&store, dir_ino, "foo", 18, libc::S_IFREG | 0o644)
            .unwrap_err();
        assert!(matches!(err, DirError::AlreadyExists));
    }

    #[test]
    fn empty_dir_true_on_fresh_false_after_insert() {
        let (engine, store) = fresh_engine();
        let dir_ino = make_dir_ino(&store, DIR_INO);
        engine.make_empty(&store, dir_ino, PARENT_INO).unwrap();
        assert!(engine.empty_dir(&store, dir_ino).unwrap());
        engine.insert(&store, dir_ino, "foo", 17, libc::S_IFREG | 0o644).unwrap();
        assert!(!engine.empty_dir(&store, dir_ino).unwrap());
    }

    #[test]
    fn rename_foo_to_bar_bumps_version_by_two() {
        let (engine, store) = fresh_engine();
        let dir_ino = make_dir_ino(&store, DIR_INO);
        engine.make_empty(&store, dir_ino, PARENT_INO).unwrap();
        engine.insert(&store, dir_ino, "foo", 17, libc::S_IFREG | 0o644).unwrap();
        let before = store.version(dir_ino);

        engine.insert(&store, dir_ino, "bar", 17, libc::S_IFREG | 0o644).unwrap();
        let (mut page, offset) = engine.find_entry(&store, dir_ino, "foo").unwrap();
        engine.delete_entry(&store, dir_ino, &mut page, offset).unwrap();

        assert_eq!(store.version(dir_ino), before + 2);
        assert!(engine.find_entry(&store, dir_ino, "bar").is_ok());
        assert!(matches!(
            engine.find_entry(&store, dir_ino, "foo").unwrap_err(),
            DirError::NotFound
        ));
    }

    #[test]
    fn readdir_skips_tombstones_and_advances_past_them() {
        let (engine, store) = fresh_engine();
        let dir_ino = make_dir_ino(&store, DIR_INO);
        engine.make_empty(&store, dir_ino, PARENT_INO).unwrap();
        engine.insert(&store, dir_ino, "foo", 17, libc::S_IFREG | 0o644).unwrap();
        engine.insert(&store, dir_ino, "bar", 18, libc::S_IFREG | 0o644).unwrap();
        let (mut page, offset) = engine.find_entry(&store, dir_ino, "foo").unwrap();
        engine.delete_entry(&store, dir_ino, &mut page, offset).unwrap();
        drop(page);

        let mut seen = Vec::new();
        let version = store.version(dir_ino);
        engine
            .readdir(&store, dir_ino, 0, version, |name, ino, _dtype, _next| {
                seen.push((name.to_string(), ino));
                true
            })
            .unwrap();
        assert!(seen.iter().any(|(n, _)| n == "."));
        assert!(seen.iter().any(|(n, _)| n == ".."));
        assert!(seen.iter().any(|(n, i)| n == "bar" && *i == 18));
        assert!(!seen.iter().any(|(n, _)| n == "foo"));
    }
}
