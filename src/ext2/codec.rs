//! Pure, stateless translation between on-disk bytes and directory record
//! fields. Grounded on the teacher's `desc.rs` (`EXT2_FT_*` table,
//! `Ext2DirEntry` layout) and original `dir.c`
//! (`ext21_rec_len_from_disk`/`ext21_rec_len_to_disk`/`EXT21_DIR_REC_LEN`).
use crate::ext2::desc::{
    EXT2_FT_BLKDEV, EXT2_FT_CHRDEV, EXT2_FT_DIR, EXT2_FT_FIFO, EXT2_FT_REG_FILE, EXT2_FT_SOCK,
    EXT2_FT_SYMLINK, EXT2_FT_UNKNOWN,
};

/// Byte offset of each field within a directory record.
pub const REC_INODE_OFFSET: usize = 0;
pub const REC_REC_LEN_OFFSET: usize = 4;
pub const REC_NAME_LEN_OFFSET: usize = 6;
pub const REC_FILE_TYPE_OFFSET: usize = 7;
pub const REC_NAME_OFFSET: usize = 8;

/// Fixed 8-byte record header, before the variable-length name.
pub const REC_HEADER_LEN: u32 = 8;

const REC_LEN_SENTINEL: u16 = 0xFFFF;
const SENTINEL_THRESHOLD_PAGE_SIZE: u32 = 65536;

/// Decode the on-disk `rec_len` field, expanding the 64 KiB sentinel.
pub fn decode_rec_len(raw: u16, page_size: u32) -> u32 {
    if page_size >= SENTINEL_THRESHOLD_PAGE_SIZE && raw == REC_LEN_SENTINEL {
        SENTINEL_THRESHOLD_PAGE_SIZE
    } else {
        raw as u32
    }
}

/// Encode a logical record length back to its on-disk `u16`, emitting the
/// sentinel when the page size permits a full-64KiB record. Panics (the
/// caller's invariant, never reachable from validated on-disk data) if
/// `len` cannot be represented: `len > 65535` with a page too small for the
/// sentinel encoding.
pub fn encode_rec_len(len: u32, page_size: u32) -> u16 {
    if len == SENTINEL_THRESHOLD_PAGE_SIZE {
        if page_size >= SENTINEL_THRESHOLD_PAGE_SIZE {
            return REC_LEN_SENTINEL;
        }
        panic!("rec_len of 65536 requires a page size >= 64 KiB");
    }
    assert!(len <= 0xFFFF, "rec_len {} does not fit in 16 bits", len);
    len as u16
}

/// Minimum record length that can hold a name of `name_len` bytes, rounded
/// up to a 4-byte boundary: `(name_len + 8 + 3) & ~3`.
pub fn min_rec_len(name_len: usize) -> u32 {
    ((name_len + REC_HEADER_LEN as usize + 3) & !3) as u32
}

/// Inode-mode bits (the subset `S_IFMT` masks out) to the on-disk
/// `file_type` byte. Mirrors the teacher's `EXT2_FT_*` table.
pub fn filetype_from_mode(mode: u32) -> u8 {
    match mode & libc::S_IFMT {
        libc::S_IFREG => EXT2_FT_REG_FILE as u8,
        libc::S_IFDIR => EXT2_FT_DIR as u8,
        libc::S_IFCHR => EXT2_FT_CHRDEV as u8,
        libc::S_IFBLK => EXT2_FT_BLKDEV as u8,
        libc::S_IFIFO => EXT2_FT_FIFO as u8,
        libc::S_IFSOCK => EXT2_FT_SOCK as u8,
        libc::S_IFLNK => EXT2_FT_SYMLINK as u8,
        _ => EXT2_FT_UNKNOWN as u8,
    }
}

/// The generic "dirent type" exposed to readdir (matches `fuser::FileType`
/// ordinals conceptually; kept numeric here to stay independent of fuser).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DType {
    Unknown,
    RegularFile,
    Directory,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Symlink,
}

pub fn dtype_from_filetype(ft: u8) -> DType {
    match ft as usize {
        EXT2_FT_REG_FILE => DType::RegularFile,
        EXT2_FT_DIR => DType::Directory,
        EXT2_FT_CHRDEV => DType::CharDevice,
        EXT2_FT_BLKDEV => DType::BlockDevice,
        EXT2_FT_FIFO => DType::Fifo,
        EXT2_FT_SOCK => DType::Socket,
        EXT2_FT_SYMLINK => DType::Symlink,
        _ => DType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_sentinel_only_on_64k_pages() {
        assert_eq!(decode_rec_len(0xFFFF, 65536), 65536);
        assert_eq!(decode_rec_len(0xFFFF, 4096), 0xFFFF);
        assert_eq!(decode_rec_len(12, 4096), 12);
    }

    #[test]
    fn encode_decode_round_trip() {
        for (raw, pagesz) in [(12u16, 4096u32), (4084, 4096), (0xFFFE, 65536)] {
            let decoded = decode_rec_len(raw, pagesz);
            assert_eq!(encode_rec_len(decoded, pagesz), raw);
        }
        assert_eq!(encode_rec_len(65536, 65536), 0xFFFF);
    }

    #[test]
    fn min_rec_len_rounds_to_four() {
        assert_eq!(min_rec_len(1), 12);
        assert_eq!(min_rec_len(2), 12);
        assert_eq!(min_rec_len(3), 12);
        assert_eq!(min_rec_len(4), 12);
        assert_eq!(min_rec_len(5), 16);
        assert_eq!(min_rec_len(255), 268);
    }

    #[test]
    fn filetype_round_trip_known_kinds() {
        assert_eq!(
            dtype_from_filetype(filetype_from_mode(libc::S_IFDIR | 0o755)),
            DType::Directory
        );
        assert_eq!(
            dtype_from_filetype(filetype_from_mode(libc::S_IFREG | 0o644)),
            DType::RegularFile
        );
        assert_eq!(
            dtype_from_filetype(filetype_from_mode(libc::S_IFLNK | 0o777)),
            DType::Symlink
        );
    }
}
