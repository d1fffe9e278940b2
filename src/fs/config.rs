/// Payload bytes held by one data block.
pub const BLOCK_SIZE: usize = 1024;

/// Name buffer size on disk, including the NUL terminator.
/// Usable names are at most `MAX_NAME - 1` bytes.
pub const MAX_NAME: usize = 16;

// The file table region is always sized for this many entries,
// regardless of how many are live.
pub const MAX_FILES: usize = 64;

/// On-disk marker for "no block" (end of chain, or empty file).
pub const NO_BLOCK: u64 = u64::MAX;

pub type BlockId = u64;
