//! Scalar aliases used by `desc.rs`'s on-disk struct definitions. These are
//! plain little-endian integers; the alias names only document field
//! provenance against the real ext2 header layout.
#![allow(non_camel_case_types)]

pub type le16 = u16;
pub type le32 = u32;
pub type s16 = i16;
