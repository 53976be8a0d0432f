use crate::{DiskConst, DiskDriver, DiskInfo, DiskStats, SeekType, IOC_REQ_DEVICE_IO_SZ,
    IOC_REQ_DEVICE_RESET, IOC_REQ_DEVICE_SIZE, IOC_REQ_DEVICE_STATE};
use anyhow::Result;
use std::mem::size_of;

const MEM_DISK_SIZE: usize = 4 * 0x400 * 0x400;
const MEM_DISK_UNIT: usize = 512;

/// Owned, in-memory block store. The deterministic driver tests mount
/// against: no filesystem, no timing, just a `Vec<u8>` behind the trait.
pub struct MemoryDiskDriver {
    pub info: DiskInfo,
    pub mem: Vec<u8>,
    pointer: usize,
}

impl DiskDriver for MemoryDiskDriver {
    fn ddriver_open(&mut self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn ddriver_close(&mut self) -> Result<()> {
        Ok(())
    }

    fn ddriver_seek(&mut self, offset: i64, whence: SeekType) -> Result<u64> {
        self.pointer = match whence {
            SeekType::Set => offset as usize,
            SeekType::Cur => (self.pointer as i64 + offset) as usize,
            SeekType::End => (self.info.consts.layout_size as i64 - offset) as usize,
        };
        Ok(self.pointer as u64)
    }

    fn ddriver_write(&mut self, buf: &[u8], size: usize) -> Result<usize> {
        assert!(buf.len() >= size);
        let pointer = self.pointer;
        self.ensure_capacity(pointer + size);
        self.mem[pointer..pointer + size].copy_from_slice(&buf[..size]);
        self.pointer += size;
        self.info.stats.write_cnt += 1;
        Ok(size)
    }

    fn ddriver_read(&mut self, buf: &mut [u8], size: usize) -> Result<usize> {
        let pointer = self.pointer;
        self.ensure_capacity(pointer + size);
        buf[..size].copy_from_slice(&self.mem[pointer..pointer + size]);
        self.pointer += size;
        self.info.stats.read_cnt += 1;
        Ok(size)
    }

    fn ddriver_ioctl(&mut self, cmd: u32, arg: &mut [u8]) -> Result<()> {
        match cmd {
            IOC_REQ_DEVICE_SIZE => {
                arg[0..4].copy_from_slice(&self.info.consts.layout_size.to_le_bytes());
                Ok(())
            }
            IOC_REQ_DEVICE_STATE => {
                assert_eq!(3 * 4, size_of::<DiskStats>());
                arg[0..4].copy_from_slice(&self.info.stats.write_cnt.to_le_bytes());
                arg[4..8].copy_from_slice(&self.info.stats.read_cnt.to_le_bytes());
                arg[8..12].copy_from_slice(&self.info.stats.seek_cnt.to_le_bytes());
                Ok(())
            }
            IOC_REQ_DEVICE_RESET => self.ddriver_reset(),
            IOC_REQ_DEVICE_IO_SZ => {
                arg[0..4].copy_from_slice(&self.info.consts.iounit_size.to_le_bytes());
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn ddriver_reset(&mut self) -> Result<()> {
        self.mem.iter_mut().for_each(|b| *b = 0);
        self.info = DiskInfo {
            stats: Default::default(),
            consts: DiskConst {
                layout_size: MEM_DISK_SIZE as u32,
                iounit_size: MEM_DISK_UNIT as u32,
                ..Default::default()
            },
        };
        self.pointer = 0;
        Ok(())
    }
}

impl MemoryDiskDriver {
    /// Grows the backing buffer to cover `end`, zero-filling the new tail.
    /// `page_disk_offset`'s flat per-inode layout can address well past
    /// `MEM_DISK_SIZE` for ordinary inode numbers; this keeps every
    /// in-bounds read/write from ever indexing past the end of `mem`.
    fn ensure_capacity(&mut self, end: usize) {
        if end > self.mem.len() {
            self.mem.resize(end, 0);
        }
    }

    pub fn new() -> Self {
        Self {
            info: DiskInfo {
                stats: Default::default(),
                consts: DiskConst {
                    layout_size: MEM_DISK_SIZE as u32,
                    iounit_size: MEM_DISK_UNIT as u32,
                    ..Default::default()
                },
            },
            mem: vec![0u8; MEM_DISK_SIZE],
            pointer: 0,
        }
    }
}

impl Default for MemoryDiskDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_tester(driver: &mut dyn DiskDriver) -> Result<()> {
        driver.ddriver_open("test")?;
        driver.ddriver_seek(0, SeekType::Set)?;
        driver.ddriver_write(&[5, 6, 7, 8], 4)?;
        driver.ddriver_seek(0, SeekType::Set)?;
        let mut buf = [0u8; 4];
        driver.ddriver_read(&mut buf, 4)?;
        assert_eq!(buf, [5, 6, 7, 8]);
        Ok(())
    }

    #[test]
    fn simple_test() -> Result<()> {
        let mut driver = MemoryDiskDriver::new();
        driver_tester(&mut driver)
    }

    #[test]
    fn seek_end_is_relative_to_layout_size() -> Result<()> {
        let mut driver = MemoryDiskDriver::new();
        let pos = driver.ddriver_seek(4, SeekType::End)?;
        assert_eq!(pos as usize, MEM_DISK_SIZE - 4);
        Ok(())
    }
}
