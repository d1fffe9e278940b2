use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    disk::ByteStore,
    fs::{
        config::{BlockId, BLOCK_SIZE, NO_BLOCK},
        error::{Result, VfsError},
        layout::Layout,
        record,
    },
};

/// Serialized size of one block-status entry.
pub const BLOCK_STATUS_SIZE: u64 = 9;

/// Occupancy and chain link of one data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockStatus {
    pub in_use: bool,
    pub next_block: Option<BlockId>,
}

#[derive(Serialize, Deserialize)]
struct RawBlockStatus {
    in_use: bool,
    next_block: u64,
}

impl From<BlockStatus> for RawBlockStatus {
    fn from(status: BlockStatus) -> Self {
        Self {
            in_use: status.in_use,
            next_block: status.next_block.unwrap_or(NO_BLOCK),
        }
    }
}

impl From<RawBlockStatus> for BlockStatus {
    fn from(raw: RawBlockStatus) -> Self {
        Self {
            in_use: raw.in_use,
            next_block: (raw.next_block != NO_BLOCK).then_some(raw.next_block),
        }
    }
}

/// Number of blocks needed to hold `byte_length` bytes.
pub fn blocks_for(byte_length: u64) -> u64 {
    byte_length.div_ceil(BLOCK_SIZE as u64)
}

/// In-memory mirror of the block-status table.
///
/// Every mutation is written through to the store before the call returns.
#[derive(Debug)]
pub struct BlockTable {
    blocks: Vec<BlockStatus>,
    layout: Layout,
}

impl BlockTable {
    /// A table with every block free.
    pub fn new(layout: Layout) -> Self {
        Self {
            blocks: vec![BlockStatus::default(); layout.block_count as usize],
            layout,
        }
    }

    pub fn load<S: ByteStore + ?Sized>(store: &mut S, layout: Layout) -> Result<Self> {
        let raw: Vec<RawBlockStatus> = record::read_many(
            store,
            layout.block_table_offset(),
            BLOCK_STATUS_SIZE,
            layout.block_count,
            "block status",
        )?;
        let blocks: Vec<BlockStatus> = raw.into_iter().map(BlockStatus::from).collect();

        if let Some((index, next)) = blocks
            .iter()
            .enumerate()
            .find_map(|(i, b)| b.next_block.filter(|&n| n >= layout.block_count).map(|n| (i, n)))
        {
            return Err(VfsError::InvalidDiskImage(format!(
                "block {index} links to block {next} out of {}",
                layout.block_count
            )));
        }

        Ok(Self { blocks, layout })
    }

    /// Write the whole table in one go. Used when formatting.
    pub fn sync<S: ByteStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        let raw: Vec<RawBlockStatus> = self.blocks.iter().copied().map(Into::into).collect();
        let bytes = record::encode_many(&raw)?;
        store.write_at(self.layout.block_table_offset(), &bytes)?;
        Ok(())
    }

    fn persist<S: ByteStore + ?Sized>(&self, store: &mut S, block: BlockId) -> Result<()> {
        let raw = RawBlockStatus::from(self.blocks[block as usize]);
        record::write(store, self.layout.block_status_offset(block), &raw)
    }

    pub fn len(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn statuses(&self) -> &[BlockStatus] {
        &self.blocks
    }

    pub fn status(&self, block: BlockId) -> Option<BlockStatus> {
        self.blocks.get(block as usize).copied()
    }

    pub fn free_blocks(&self) -> u64 {
        self.blocks.iter().filter(|b| !b.in_use).count() as u64
    }

    /// Free payload capacity in bytes.
    pub fn free_space(&self) -> u64 {
        self.free_blocks() * BLOCK_SIZE as u64
    }

    /// First free block at or after `from`.
    pub fn find_free(&self, from: BlockId) -> Option<BlockId> {
        (from..self.len()).find(|&block| !self.blocks[block as usize].in_use)
    }

    /// Claim and link enough blocks for `byte_length` bytes.
    ///
    /// The search always starts at block 0 and moves forward through the
    /// table, so low-index holes are reused first. Returns the chain in
    /// order; an empty chain for a zero-length file.
    pub fn allocate_chain<S: ByteStore + ?Sized>(
        &mut self,
        store: &mut S,
        byte_length: u64,
    ) -> Result<Vec<BlockId>> {
        let needed = blocks_for(byte_length);
        let available = self.free_blocks();
        if needed > available {
            return Err(VfsError::InsufficientSpace {
                needed: needed * BLOCK_SIZE as u64,
                available: available * BLOCK_SIZE as u64,
            });
        }

        let mut chain: Vec<BlockId> = Vec::with_capacity(needed as usize);
        let mut cursor = 0;
        while (chain.len() as u64) < needed {
            let block = self.find_free(cursor).ok_or(VfsError::InsufficientSpace {
                needed: needed * BLOCK_SIZE as u64,
                available: 0,
            })?;

            // mark the new tail first, so the on-disk chain is always terminated
            self.blocks[block as usize] = BlockStatus {
                in_use: true,
                next_block: None,
            };
            self.persist(store, block)?;

            if let Some(&prev) = chain.last() {
                self.blocks[prev as usize].next_block = Some(block);
                self.persist(store, prev)?;
            }

            debug!(block, "allocated block");
            chain.push(block);
            cursor = block;
        }

        Ok(chain)
    }

    /// Release every block of the chain starting at `first`.
    /// Returns the number of blocks freed.
    pub fn free_chain<S: ByteStore + ?Sized>(
        &mut self,
        store: &mut S,
        first: Option<BlockId>,
    ) -> Result<u64> {
        let mut freed = 0;
        let mut current = first;

        while let Some(block) = current {
            let status = self.status(block).ok_or_else(|| {
                VfsError::Corrupted(format!("chain references missing block {block}"))
            })?;
            if !status.in_use {
                warn!(block, "chain reaches a block that is already free");
                break;
            }

            self.blocks[block as usize].in_use = false;
            self.persist(store, block)?;
            debug!(block, "freed block");

            freed += 1;
            current = status.next_block;
        }

        Ok(freed)
    }

    /// Iterate the chain starting at `first`.
    ///
    /// Stops after `len()` steps, so a looping chain cannot hang the caller.
    pub fn chain(&self, first: Option<BlockId>) -> Chain<'_> {
        Chain {
            table: self,
            current: first,
            remaining: self.len(),
        }
    }
}

pub struct Chain<'a> {
    table: &'a BlockTable,
    current: Option<BlockId>,
    remaining: u64,
}

impl Iterator for Chain<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        if self.remaining == 0 {
            return None;
        }
        let block = self.current?;
        let status = self.table.status(block)?;
        self.remaining -= 1;
        self.current = status.next_block;
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    fn setup(size_kb: u64) -> (MemDisk, BlockTable) {
        let layout = Layout::for_size_kb(size_kb).unwrap();
        let mut disk = MemDisk::new();
        disk.set_byte_len(layout.total_bytes).unwrap();
        let table = BlockTable::new(layout);
        table.sync(&mut disk).unwrap();
        (disk, table)
    }

    #[test]
    fn test_serialized_size_matches_constant() {
        let raw = RawBlockStatus::from(BlockStatus {
            in_use: true,
            next_block: Some(3),
        });
        assert_eq!(bincode::serialized_size(&raw).unwrap(), BLOCK_STATUS_SIZE);
    }

    #[test]
    fn test_blocks_for() {
        assert_eq!(blocks_for(0), 0);
        assert_eq!(blocks_for(1), 1);
        assert_eq!(blocks_for(1024), 1);
        assert_eq!(blocks_for(1025), 2);
        assert_eq!(blocks_for(2000), 2);
    }

    #[test]
    fn test_new_table_is_all_free() {
        let (_, table) = setup(64);
        assert_eq!(table.len(), 61);
        assert_eq!(table.free_blocks(), 61);
        assert_eq!(table.free_space(), 61 * 1024);
        assert_eq!(table.find_free(0), Some(0));
        assert_eq!(table.find_free(61), None);
    }

    #[test]
    fn test_allocate_chain_links_in_order() {
        let (mut disk, mut table) = setup(64);
        let chain = table.allocate_chain(&mut disk, 3000).unwrap();

        assert_eq!(chain, vec![0, 1, 2]);
        assert!(!table.status(3).unwrap().in_use);
        assert_eq!(table.status(0).unwrap().next_block, Some(1));
        assert_eq!(table.status(1).unwrap().next_block, Some(2));
        assert_eq!(table.status(2).unwrap().next_block, None);
        assert_eq!(table.chain(Some(0)).collect::<Vec<_>>(), chain);
        assert_eq!(table.free_blocks(), 58);
    }

    #[test]
    fn test_zero_length_allocates_nothing() {
        let (mut disk, mut table) = setup(64);
        assert!(table.allocate_chain(&mut disk, 0).unwrap().is_empty());
        assert_eq!(table.free_blocks(), 61);
    }

    #[test]
    fn test_allocation_reuses_low_holes_first() {
        let (mut disk, mut table) = setup(64);
        let a = table.allocate_chain(&mut disk, 2048).unwrap();
        let b = table.allocate_chain(&mut disk, 1024).unwrap();
        assert_eq!((a.as_slice(), b.as_slice()), (&[0, 1][..], &[2][..]));

        table.free_chain(&mut disk, Some(0)).unwrap();
        let c = table.allocate_chain(&mut disk, 3 * 1024).unwrap();
        assert_eq!(c, vec![0, 1, 3]);
    }

    #[test]
    fn test_free_chain_releases_every_block() {
        let (mut disk, mut table) = setup(64);
        table.allocate_chain(&mut disk, 5000).unwrap();
        let freed = table.free_chain(&mut disk, Some(0)).unwrap();

        assert_eq!(freed, 5);
        assert_eq!(table.free_blocks(), 61);
        assert_eq!(table.free_chain(&mut disk, None).unwrap(), 0);
    }

    #[test]
    fn test_insufficient_space_leaves_table_untouched() {
        let (mut disk, mut table) = setup(8);
        let before = disk.as_bytes().to_vec();
        let capacity = table.free_space();

        let err = table.allocate_chain(&mut disk, capacity + 1).unwrap_err();
        assert!(matches!(err, VfsError::InsufficientSpace { .. }));
        assert_eq!(table.free_space(), capacity);
        assert_eq!(disk.as_bytes(), before.as_slice());
    }

    #[test]
    fn test_changes_are_persisted_per_block() {
        let (mut disk, mut table) = setup(64);
        table.allocate_chain(&mut disk, 4000).unwrap();
        table.free_chain(&mut disk, Some(0)).unwrap();
        table.allocate_chain(&mut disk, 1500).unwrap();

        let reloaded = BlockTable::load(&mut disk, table.layout).unwrap();
        assert_eq!(reloaded.statuses(), table.statuses());
    }

    #[test]
    fn test_load_rejects_out_of_range_link() {
        let (mut disk, table) = setup(8);
        let bad = RawBlockStatus {
            in_use: true,
            next_block: 999,
        };
        record::write(&mut disk, table.layout.block_status_offset(0), &bad).unwrap();

        let err = BlockTable::load(&mut disk, table.layout).unwrap_err();
        assert!(matches!(err, VfsError::InvalidDiskImage(_)));
    }

    #[test]
    fn test_chain_walk_stops_on_cycle() {
        let (mut disk, mut table) = setup(8);
        table.allocate_chain(&mut disk, 2048).unwrap();
        table.blocks[1].next_block = Some(0);

        assert_eq!(table.chain(Some(0)).count() as u64, table.len());
    }
}
