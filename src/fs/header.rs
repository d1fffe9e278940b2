use serde::{Deserialize, Serialize};

use crate::{
    disk::ByteStore,
    fs::{error::Result, record},
};

/// Serialized size of [`Header`].
pub const HEADER_SIZE: u64 = 24;

/// Disk-wide metadata stored at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub total_bytes: u64, // exact length of the image
    pub block_count: u64, // fixed at creation
    pub file_count: u64,  // live entries in the file table
}

impl Header {
    pub fn new(total_bytes: u64, block_count: u64) -> Self {
        Self {
            total_bytes,
            block_count,
            file_count: 0,
        }
    }

    pub fn load<S: ByteStore + ?Sized>(store: &mut S) -> Result<Self> {
        record::read(store, 0, HEADER_SIZE, "header")
    }

    pub fn sync<S: ByteStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        record::write(store, 0, self)
    }
}
