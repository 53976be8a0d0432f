//! In-memory mirror of the superblock fields the directory subsystem
//! actually consumes (spec §6.2). Previously generated by the teacher's
//! `macro_tools::ApplyMem` derive; that macro's expansion is a fixed stub
//! (`fn answer() -> u32 { 42 }` regardless of its input) and never did
//! anything, so the mirroring here is hand-written instead.
use crate::ext2::desc::Ext2SuperBlock;

#[derive(Default, Clone, Copy)]
pub struct Ext2SuperBlockMem {
    /// Inodes count
    pub s_inodes_count: u32,
    /// Reserved blocks count
    pub s_r_blocks_count: u32,
    /// Free blocks count
    pub s_free_blocks_count: u32,
    /// Free inodes count
    pub s_free_inodes_count: u32,
    /// First Data Block
    pub s_first_data_block: u32,
    /// Block size
    pub s_log_block_size: u32,
    /// First non-reserved inode
    pub s_first_ino: u32,
    /// FILETYPE bit of `s_feature_incompat` (spec §6.2)
    pub filetype_enabled: bool,
}

impl Ext2SuperBlockMem {
    pub fn from_disk(sb: &Ext2SuperBlock) -> Self {
        Self {
            s_inodes_count: sb.s_inodes_count,
            s_r_blocks_count: sb.s_r_blocks_count,
            s_free_blocks_count: sb.s_free_blocks_count,
            s_free_inodes_count: sb.s_free_inodes_count,
            s_first_data_block: sb.s_first_data_block,
            s_log_block_size: sb.s_log_block_size,
            s_first_ino: sb.s_first_ino,
            filetype_enabled: sb.s_feature_incompat
                & crate::ext2::desc::EXT2_FEATURE_INCOMPAT_FILETYPE as u32
                != 0,
        }
    }

    pub fn block_size(&self) -> u32 {
        1024 << self.s_log_block_size
    }

    pub fn to_string(&self) -> String {
        format!(
            "EXT2 {} inodes, {} B per block, free inodes {}, free blocks {}",
            self.s_inodes_count,
            self.block_size(),
            self.s_free_inodes_count,
            self.s_free_blocks_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_filetype_flag_from_incompat_mask() {
        let mut sb = Ext2SuperBlock::default();
        sb.s_feature_incompat = crate::ext2::desc::EXT2_FEATURE_INCOMPAT_FILETYPE as u32;
        let mem = Ext2SuperBlockMem::from_disk(&sb);
        assert!(mem.filetype_enabled);
    }
}
