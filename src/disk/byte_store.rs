use std::io::Result;

/// Random-access byte storage backing a virtual disk.
///
/// Every access names its absolute offset; implementations do not keep a
/// cursor that callers can observe.
pub trait ByteStore {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Current length of the store in bytes.
    fn byte_len(&mut self) -> Result<u64>;

    /// Grow or shrink the store to exactly `len` bytes.
    fn set_byte_len(&mut self, len: u64) -> Result<()>;
}
