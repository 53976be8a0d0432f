/// FUSE operations: translates `fuser` requests into calls on the
/// namespace-operations layer (`namei.rs`), mapping `DirError` to libc
/// errno at this boundary (spec §4.H).
use crate::ext2::desc::Ext2INode;
use crate::ext2::error::to_errno;
use crate::ext2::{Ext2Fs, TTL};
use crate::prv;
use disk_driver::DiskDriver;
use fuser::{
    FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, Request,
};
use libc::c_int;
use log::*;
use std::ffi::OsStr;
use std::path::Path;

/// Evaluate a `Result<T, DirError>`, replying with the mapped errno and
/// returning from the caller on failure. Two forms: one binds the `Ok`
/// value to a name, the other is used for calls whose only output is
/// success/failure (the caller still calls `reply.ok()`/etc. itself).
macro_rules! rep {
    ($reply:expr, $binding:ident, $result:expr) => {
        let $binding = match $result {
            Ok(v) => v,
            Err(e) => {
                warn!("{}", e);
                $reply.error(to_errno(&e));
                return;
            }
        };
    };
    ($reply:expr, $result:expr) => {
        match $result {
            Ok(v) => v,
            Err(e) => {
                warn!("{}", e);
                $reply.error(to_errno(&e));
                return;
            }
        }
    };
}

fn name_str(name: &OsStr) -> &str {
    name.to_str().unwrap_or("")
}

impl<D: DiskDriver> Ext2Fs<D> {
    fn to_attr(&self, ino: u32, inode: &Ext2INode) -> fuser::FileAttr {
        inode.to_attr(ino as usize)
    }
}

impl<D: DiskDriver> Filesystem for Ext2Fs<D> {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!("ext2 directory subsystem mounted");
        Ok(())
    }

    fn destroy(&mut self) {
        info!("ext2 directory subsystem unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        prv!("lookup", parent, name);
        rep!(reply, ino, self.namei.lookup(parent as u32, name_str(name)));
        rep!(reply, inode, self.namei.store.iget(ino));
        let attr = self.to_attr(ino, &inode);
        reply.entry(&TTL, &attr, 0);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        prv!("getattr", ino);
        rep!(reply, inode, self.namei.store.iget(ino as u32));
        let attr = self.to_attr(ino as u32, &inode);
        reply.attr(&TTL, &attr);
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        rep!(reply, inode, self.namei.store.iget(ino as u32));
        let block_bytes: &[u8] = unsafe {
            std::slice::from_raw_parts(inode.i_block.as_ptr() as *const u8, inode.i_block.len() * 4)
        };
        let len = (inode.i_size as usize).min(block_bytes.len());
        reply.data(&block_bytes[..len]);
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        prv!("mknod", parent, name, mode);
        rep!(
            reply,
            ino,
            self.namei.mknod(parent as u32, name_str(name), mode, rdev)
        );
        rep!(reply, inode, self.namei.store.iget(ino));
        let attr = self.to_attr(ino, &inode);
        reply.entry(&TTL, &attr, 0);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        prv!("mkdir", parent, name, mode);
        rep!(reply, ino, self.namei.mkdir(parent as u32, name_str(name), mode));
        rep!(reply, inode, self.namei.store.iget(ino));
        let attr = self.to_attr(ino, &inode);
        reply.entry(&TTL, &attr, 0);
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        rep!(reply, self.namei.unlink(parent as u32, name_str(name)));
        reply.ok();
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        rep!(reply, self.namei.rmdir(parent as u32, name_str(name)));
        reply.ok();
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        link: &Path,
        reply: ReplyEntry,
    ) {
        let target = link.to_str().unwrap_or("");
        prv!("symlink", parent, name, target);
        rep!(
            reply,
            ino,
            self.namei.symlink(parent as u32, name_str(name), target)
        );
        rep!(reply, inode, self.namei.store.iget(ino));
        let attr = self.to_attr(ino, &inode);
        reply.entry(&TTL, &attr, 0);
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        rep!(
            reply,
            self.namei
                .link(newparent as u32, name_str(newname), ino as u32)
        );
        rep!(reply, inode, self.namei.store.iget(ino as u32));
        let attr = self.to_attr(ino as u32, &inode);
        reply.entry(&TTL, &attr, 0);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        rep!(
            reply,
            self.namei.rename(
                parent as u32,
                name_str(name),
                newparent as u32,
                name_str(newname)
            )
        );
        reply.ok();
    }

    /// File content storage is outside the directory subsystem's scope
    /// (no data-block allocator is implemented here); directories are the
    /// only thing backed by real pages.
    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _offset: i64,
        _size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        prv!("read", ino);
        reply.error(libc::ENOSYS);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        prv!("write", ino);
        reply.error(libc::ENOSYS);
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn readdir(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        prv!("readdir", ino, offset);
        let version = self.namei.store.version(ino as u32);
        // The cookie fuser hands back on the next call is the byte position
        // engine::readdir should resume from, not a sequential index, so the
        // kernel can stop partway through a directory without us re-walking
        // entries it already has.
        let mut entries = Vec::new();
        let result = self.namei.engine.readdir(
            &self.namei.store,
            ino as u32,
            offset as u64,
            version,
            |name, entry_ino, dtype, next| {
                entries.push((name.to_string(), entry_ino, dtype, next));
                true
            },
        );
        rep!(reply, result);
        for (name, entry_ino, dtype, next) in entries.iter() {
            let kind = match dtype {
                crate::ext2::codec::DType::Directory => FileType::Directory,
                crate::ext2::codec::DType::RegularFile => FileType::RegularFile,
                crate::ext2::codec::DType::Symlink => FileType::Symlink,
                crate::ext2::codec::DType::CharDevice => FileType::CharDevice,
                crate::ext2::codec::DType::BlockDevice => FileType::BlockDevice,
                crate::ext2::codec::DType::Fifo => FileType::NamedPipe,
                crate::ext2::codec::DType::Socket => FileType::Socket,
                crate::ext2::codec::DType::Unknown => FileType::RegularFile,
            };
            let full = reply.add(*entry_ino as u64, *next as i64, kind, name);
            if full {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, _mask: i32, reply: ReplyEmpty) {
        rep!(reply, self.namei.store.iget(ino as u32));
        reply.ok();
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        prv!("create", parent, name, mode);
        rep!(reply, ino, self.namei.create(parent as u32, name_str(name), mode));
        rep!(reply, inode, self.namei.store.iget(ino));
        let attr = self.to_attr(ino, &inode);
        reply.created(&TTL, &attr, 0, 0, 0);
    }
}
