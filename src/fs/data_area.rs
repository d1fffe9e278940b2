use crate::{
    disk::ByteStore,
    fs::{
        config::{BlockId, BLOCK_SIZE},
        error::{Result, VfsError},
        layout::Layout,
    },
};

/// Payload I/O against the data region.
///
/// Reads and writes touch only the logical fill of a block; bytes past
/// the fill keep whatever they held before.
#[derive(Debug, Clone, Copy)]
pub struct DataArea {
    layout: Layout,
}

impl DataArea {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    fn check(&self, index: BlockId, len: usize) -> Result<u64> {
        if index >= self.layout.block_count {
            return Err(VfsError::Corrupted(format!(
                "block index {index} out of range"
            )));
        }
        if len > BLOCK_SIZE {
            return Err(VfsError::Corrupted(format!(
                "{len} bytes do not fit in a {BLOCK_SIZE}-byte block"
            )));
        }
        Ok(self.layout.data_block_offset(index))
    }

    pub fn write_block<S: ByteStore + ?Sized>(
        &self,
        store: &mut S,
        index: BlockId,
        buf: &[u8],
    ) -> Result<()> {
        let offset = self.check(index, buf.len())?;
        store.write_at(offset, buf)?;
        Ok(())
    }

    pub fn read_block<S: ByteStore + ?Sized>(
        &self,
        store: &mut S,
        index: BlockId,
        buf: &mut [u8],
    ) -> Result<()> {
        let offset = self.check(index, buf.len())?;
        store.read_at(offset, buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    fn setup() -> (MemDisk, DataArea, Layout) {
        let layout = Layout::for_size_kb(16).unwrap();
        let mut disk = MemDisk::new();
        disk.set_byte_len(layout.total_bytes).unwrap();
        (disk, DataArea::new(layout), layout)
    }

    #[test]
    fn test_partial_block_round_trip() {
        let (mut disk, area, layout) = setup();
        area.write_block(&mut disk, 2, b"payload").unwrap();

        let start = layout.data_block_offset(2) as usize;
        assert_eq!(&disk.as_bytes()[start..start + 7], b"payload");

        let mut buf = [0u8; 7];
        area.read_block(&mut disk, 2, &mut buf).unwrap();
        assert_eq!(&buf, b"payload");
    }

    #[test]
    fn test_rejects_bad_index_and_oversize() {
        let (mut disk, area, layout) = setup();
        assert!(area
            .write_block(&mut disk, layout.block_count, b"x")
            .is_err());
        assert!(area
            .write_block(&mut disk, 0, &[0u8; BLOCK_SIZE + 1])
            .is_err());
    }
}
