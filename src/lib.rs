extern crate core;

pub mod ext2;

use lazy_static::lazy_static;
use mut_static::MutStatic;
pub use ext2::*;

lazy_static! {
    // Store static mount point argument for signal call use
    pub static ref MOUNT_POINT: MutStatic<String> = MutStatic::new();
    pub static ref DEVICE_FILE: MutStatic<String> = MutStatic::new();
    pub static ref FORCE_FORMAT: MutStatic<bool> = MutStatic::new();
    pub static ref MKFS_FORMAT: MutStatic<bool> = MutStatic::new();
    pub static ref LAYOUT_FILE: MutStatic<String> = MutStatic::new();
    pub static ref ENABLE_CACHING: MutStatic<bool> = MutStatic::new();
}
