//! Fixed-size record codec shared by the header and both tables.
//!
//! Records go through bincode's default (fixed-width little-endian)
//! encoding, so every record type has a constant serialized size.

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    disk::ByteStore,
    fs::error::{Result, VfsError},
};

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| VfsError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| VfsError::InvalidDiskImage(format!("unreadable {what}: {e}")))
}

pub fn write<T: Serialize, S: ByteStore + ?Sized>(
    store: &mut S,
    offset: u64,
    value: &T,
) -> Result<()> {
    let bytes = encode(value)?;
    store.write_at(offset, &bytes)?;
    Ok(())
}

pub fn read<T: DeserializeOwned, S: ByteStore + ?Sized>(
    store: &mut S,
    offset: u64,
    size: u64,
    what: &str,
) -> Result<T> {
    let mut buf = vec![0u8; size as usize];
    store.read_at(offset, &mut buf)?;
    decode(&buf, what)
}

/// Read `count` consecutive records of `size` bytes each, starting at `offset`.
pub fn read_many<T: DeserializeOwned, S: ByteStore + ?Sized>(
    store: &mut S,
    offset: u64,
    size: u64,
    count: u64,
    what: &str,
) -> Result<Vec<T>> {
    let total = size
        .checked_mul(count)
        .ok_or_else(|| VfsError::InvalidDiskImage(format!("{what} table too large")))?;
    let mut buf = vec![0u8; total as usize];
    store.read_at(offset, &mut buf)?;
    buf.chunks_exact(size as usize)
        .map(|chunk| decode(chunk, what))
        .collect()
}

/// Encode records back to back into one buffer.
pub fn encode_many<T: Serialize>(values: &[T]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for value in values {
        out.extend(encode(value)?);
    }
    Ok(out)
}
