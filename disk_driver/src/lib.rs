//! Pluggable block I/O underneath the directory page cache.
//!
//! This crate is intentionally small: it is the "Paged I/O" external
//! collaborator's foundation, not the collaborator itself (that lives in
//! `ext2dir::ext2::page`). It only knows about raw, fixed-size I/O units on
//! a seekable store.
use anyhow::Result;

#[derive(Default, Debug)]
pub struct DiskStats {
    pub read_cnt: u32,
    pub write_cnt: u32,
    pub seek_cnt: u32,
}

#[derive(Debug)]
pub struct DiskConst {
    pub read_lat: u32,
    pub write_lat: u32,
    pub seek_lat: u32,
    pub track_num: i32,
    pub major_num: i32,
    pub layout_size: u32,
    pub iounit_size: u32,
}

#[derive(Default, Debug)]
pub struct DiskInfo {
    pub stats: DiskStats,
    pub consts: DiskConst,
}

impl Default for DiskConst {
    fn default() -> Self {
        Self {
            read_lat: 2,
            write_lat: 1,
            seek_lat: 4,
            track_num: 0,
            major_num: 100,
            layout_size: 4 * 0x400 * 0x400,
            iounit_size: 512,
        }
    }
}

impl DiskInfo {
    pub fn disk_block_count(&self) -> u32 {
        self.consts.layout_size / self.consts.iounit_size
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SeekType {
    Set,
    Cur,
    End,
}

pub const IOC_REQ_DEVICE_SIZE: u32 = 1;
pub const IOC_REQ_DEVICE_STATE: u32 = 2;
pub const IOC_REQ_DEVICE_RESET: u32 = 3;
pub const IOC_REQ_DEVICE_IO_SZ: u32 = 4;

/// Abstract interface for a seekable, fixed-unit block store.
///
/// Out of scope per the directory-engine spec: block allocation and
/// inode-table I/O live above this trait, not in it.
pub trait DiskDriver {
    fn ddriver_open(&mut self, path: &str) -> Result<()>;
    fn ddriver_close(&mut self) -> Result<()>;
    fn ddriver_seek(&mut self, offset: i64, whence: SeekType) -> Result<u64>;
    fn ddriver_write(&mut self, buf: &[u8], size: usize) -> Result<usize>;
    fn ddriver_read(&mut self, buf: &mut [u8], size: usize) -> Result<usize>;
    fn ddriver_ioctl(&mut self, cmd: u32, arg: &mut [u8]) -> Result<()>;
    fn ddriver_reset(&mut self) -> Result<()>;

    /// Flush every buffered write. Default is a no-op for drivers with no
    /// write-back buffering of their own.
    fn ddriver_flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub mod file;
pub mod memory;
