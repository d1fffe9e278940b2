//! A miniature filesystem stored in a single host file.
//!
//! The image holds a header, a fixed-capacity file table, a block-status
//! table and the data blocks, each at a fixed offset computed when the
//! disk is created. Files are stored as singly-linked chains of 1 KiB
//! blocks.

pub mod disk;
pub mod fs;

pub use disk::{ByteStore, FileDisk, MemDisk};
pub use fs::{
    block_table::BlockStatus,
    config::{BLOCK_SIZE, MAX_FILES, MAX_NAME},
    error::{Result, VfsError},
    file_table::FileEntry,
    layout::{Layout, Region},
    DiskDump, VirtualDisk,
};
