use crate::{
    DiskConst, DiskDriver, DiskInfo, DiskStats, SeekType, IOC_REQ_DEVICE_IO_SZ,
    IOC_REQ_DEVICE_RESET, IOC_REQ_DEVICE_SIZE, IOC_REQ_DEVICE_STATE,
};
use anyhow::Result;
use std::mem::size_of;

const FILE_DISK_SIZE: usize = 4 * 0x400 * 0x400;
const FILE_DISK_UNIT: usize = 512;

/// Stand-in for a device file: a flat in-process buffer addressed the same
/// way an open fd would be (seek, then read/write at the pointer).
pub struct FileDiskDriver {
    pub info: DiskInfo,
    pub mem: Vec<u8>,
    pointer: usize,
}

impl DiskDriver for FileDiskDriver {
    fn ddriver_open(&mut self, path: &str) -> Result<()> {
        log::info!("FileDiskDriver open: {}", path);
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
        self.get_pointer_slice(size).copy_from_slice(&buf[..size]);
        self.pointer += size;
        Ok(size)
    }

    fn ddriver_read(&mut self, buf: &mut [u8], size: usize) -> Result<usize> {
        buf[..size].copy_from_slice(self.get_pointer_slice(size));
        self.pointer += size;
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
                layout_size: FILE_DISK_SIZE as u32,
                iounit_size: FILE_DISK_UNIT as u32,
                ..Default::default()
            },
        };
        self.pointer = 0;
        Ok(())
    }
}

impl FileDiskDriver {
    pub fn new(_path: &str) -> Self {
        Self {
            info: DiskInfo {
                stats: Default::default(),
                consts: DiskConst {
                    layout_size: FILE_DISK_SIZE as u32,
                    iounit_size: FILE_DISK_UNIT as u32,
                    ..Default::default()
                },
            },
            mem: vec![0u8; FILE_DISK_SIZE],
            pointer: 0,
        }
    }

    /// Returns a slice at the current pointer, growing (zero-filling) the
    /// backing buffer first if `size` reaches past it. `page_disk_offset`'s
    /// flat per-inode layout can address well past `FILE_DISK_SIZE` for
    /// ordinary inode numbers, so a fixed-size buffer would panic here.
    fn get_pointer_slice(&mut self, size: usize) -> &mut [u8] {
        let end = self.pointer + size;
        if end > self.mem.len() {
            self.mem.resize(end, 0);
        }
        &mut self.mem[self.pointer..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_tester(driver: &mut dyn DiskDriver) -> Result<()> {
        driver.ddriver_open("test")?;
        driver.ddriver_seek(512, SeekType::Set)?;
        driver.ddriver_write(&[1, 2, 3, 4], 4)?;
        driver.ddriver_seek(512, SeekType::Set)?;
        let mut buf = [0u8; 4];
        driver.ddriver_read(&mut buf, 4)?;
        assert_eq!(buf, [1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn simple_test() -> Result<()> {
        let mut driver = FileDiskDriver::new("");
        driver_tester(&mut driver)
    }

    #[test]
    fn reset_zeroes_buffer() -> Result<()> {
        let mut driver = FileDiskDriver::new("");
        driver.ddriver_write(&[9, 9, 9, 9], 4)?;
        driver.ddriver_reset()?;
        let mut buf = [0u8; 4];
        driver.ddriver_read(&mut buf, 4)?;
        assert_eq!(buf, [0, 0, 0, 0]);
        Ok(())
    }
}
