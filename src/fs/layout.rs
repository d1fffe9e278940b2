//! Region arithmetic for the image.
//!
//! ```text
//! | header | file table (MAX_FILES entries) | block table | data blocks | unused |
//! ```

use crate::fs::{
    block_table::BLOCK_STATUS_SIZE,
    config::{BlockId, BLOCK_SIZE, MAX_FILES},
    error::{Result, VfsError},
    file_table::FILE_ENTRY_SIZE,
    header::{Header, HEADER_SIZE},
};

/// Bytes taken by the header plus a capacity-sized file table.
pub const METADATA_SIZE: u64 = HEADER_SIZE + MAX_FILES as u64 * FILE_ENTRY_SIZE;

/// A half-open byte range `[start, end)` of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub total_bytes: u64,
    pub block_count: u64,
}

impl Layout {
    /// Compute the layout for a disk of `size_kb` kilobytes.
    pub fn for_size_kb(size_kb: u64) -> Result<Self> {
        let total_bytes = size_kb
            .checked_mul(1024)
            .ok_or(VfsError::DiskTooLarge { size_kb })?;
        Self::for_total_bytes(total_bytes).ok_or(VfsError::DiskTooSmall { size_kb })
    }

    /// `None` when `total_bytes` cannot hold even the empty metadata.
    pub fn for_total_bytes(total_bytes: u64) -> Option<Self> {
        let room = total_bytes.checked_sub(METADATA_SIZE)?;
        Some(Self {
            total_bytes,
            block_count: room / (BLOCK_SIZE as u64 + BLOCK_STATUS_SIZE),
        })
    }

    pub fn from_header(header: &Header) -> Self {
        Self {
            total_bytes: header.total_bytes,
            block_count: header.block_count,
        }
    }

    pub fn file_table_offset(&self) -> u64 {
        HEADER_SIZE
    }

    pub fn file_entry_offset(&self, index: usize) -> u64 {
        self.file_table_offset() + index as u64 * FILE_ENTRY_SIZE
    }

    pub fn block_table_offset(&self) -> u64 {
        METADATA_SIZE
    }

    pub fn block_status_offset(&self, block: BlockId) -> u64 {
        self.block_table_offset() + block * BLOCK_STATUS_SIZE
    }

    pub fn data_offset(&self) -> u64 {
        self.block_status_offset(self.block_count)
    }

    pub fn data_block_offset(&self, block: BlockId) -> u64 {
        self.data_offset() + block * BLOCK_SIZE as u64
    }

    pub fn data_end(&self) -> u64 {
        self.data_block_offset(self.block_count)
    }

    /// The five consecutive regions covering the whole image.
    pub fn regions(&self) -> [Region; 5] {
        [
            Region {
                name: "header",
                start: 0,
                end: self.file_table_offset(),
            },
            Region {
                name: "file nodes",
                start: self.file_table_offset(),
                end: self.block_table_offset(),
            },
            Region {
                name: "structure of data blocks",
                start: self.block_table_offset(),
                end: self.data_offset(),
            },
            Region {
                name: "real data",
                start: self.data_offset(),
                end: self.data_end(),
            },
            Region {
                name: "unused space",
                start: self.data_end(),
                end: self.total_bytes,
            },
        ]
    }
}
