//! Error taxonomy for the directory subsystem.
//!
//! The teacher repo propagates everything through bare `anyhow::Error`,
//! which cannot let a caller distinguish `AlreadyExists` from `NotFound`
//! without string matching. `DirError` gives the engine and namespace-ops
//! layers a typed contract; `anyhow` is still what `main.rs` deals in at
//! the process boundary.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirError {
    #[error("name exceeds 255 bytes")]
    NameTooLong,

    #[error("name already exists in directory")]
    AlreadyExists,

    #[error("name not found in directory")]
    NotFound,

    #[error("directory not empty")]
    NotEmpty,

    #[error("I/O error: {0}")]
    Io(#[source] anyhow::Error),

    #[error("on-disk structure corrupt: {0}")]
    Corrupt(#[source] Box<CorruptReason>),

    #[error("no space left to extend directory")]
    NoSpace,

    #[error("quota exceeded")]
    Quota,

    #[error("operation not permitted")]
    Perm,
}

/// Sub-taxonomy for `check_page`'s fatal-for-that-page findings (spec §4.B).
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum CorruptReason {
    #[error("directory size is not a multiple of chunk size")]
    BadSize,
    #[error("record shorter than its minimum length")]
    ShortRecord,
    #[error("record offset or length is not 4-byte aligned")]
    Unaligned,
    #[error("name_len exceeds 255")]
    NameLenTooLarge,
    #[error("record spans a chunk boundary")]
    SpansChunk,
    #[error("inode number is out of bounds for the filesystem")]
    InodeOutOfBounds,
    #[error("trailing garbage after the last record")]
    TrailingGarbage,
    #[error("rec_len == 0 encountered mid-walk")]
    ZeroRecLen,
}

impl DirError {
    pub fn corrupt(reason: CorruptReason) -> Self {
        DirError::Corrupt(Box::new(reason))
    }
}

impl From<std::io::Error> for DirError {
    fn from(e: std::io::Error) -> Self {
        DirError::Io(e.into())
    }
}

/// Maps a `DirError` onto a `libc` errno, for the FUSE adapter (component H).
pub fn to_errno(e: &DirError) -> libc::c_int {
    match e {
        DirError::NameTooLong => libc::ENAMETOOLONG,
        DirError::AlreadyExists => libc::EEXIST,
        DirError::NotFound => libc::ENOENT,
        DirError::NotEmpty => libc::ENOTEMPTY,
        DirError::Io(_) => libc::EIO,
        DirError::Corrupt(_) => libc::EIO,
        DirError::NoSpace => libc::ENOSPC,
        DirError::Quota => libc::EDQUOT,
        DirError::Perm => libc::EPERM,
    }
}
