use std::io::{Error, ErrorKind, Result};

use crate::disk::byte_store::ByteStore;

/// An in-memory byte store, mainly for tests.
#[derive(Debug, Default, Clone)]
pub struct MemDisk {
    bytes: Vec<u8>,
}

impl MemDisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn range(&self, offset: u64, len: usize) -> Result<std::ops::Range<usize>> {
        let start = usize::try_from(offset)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "offset out of range"))?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "offset out of range"))?;
        Ok(start..end)
    }
}

impl ByteStore for MemDisk {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.range(offset, buf.len())?;
        let src = self
            .bytes
            .get(range)
            .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "read past end of store"))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let range = self.range(offset, buf.len())?;
        if range.end > self.bytes.len() {
            self.bytes.resize(range.end, 0);
        }
        self.bytes[range].copy_from_slice(buf);
        Ok(())
    }

    fn byte_len(&mut self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn set_byte_len(&mut self, len: u64) -> Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "length out of range"))?;
        self.bytes.resize(len, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_extends_and_reads_back() {
        let mut disk = MemDisk::new();
        disk.write_at(4, b"abc").unwrap();
        assert_eq!(disk.as_bytes(), &[0, 0, 0, 0, b'a', b'b', b'c']);

        let mut buf = [0u8; 2];
        disk.read_at(5, &mut buf).unwrap();
        assert_eq!(&buf, b"bc");
    }

    #[test]
    fn test_read_past_end_is_eof() {
        let mut disk = MemDisk::from_bytes(vec![1, 2, 3]);
        let mut buf = [0u8; 4];
        let err = disk.read_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
