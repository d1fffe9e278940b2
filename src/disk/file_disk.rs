use std::{
    fs::{File, OpenOptions},
    io::{Read, Result, Seek, SeekFrom, Write},
    path::Path,
};

use crate::disk::byte_store::ByteStore;

/// A disk image stored in a host file.
///
/// The handle is closed when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct FileDisk {
    file: File,
}

impl FileDisk {
    /// Open the image at `path`, creating it if missing.
    ///
    /// Existing contents are kept; callers size the file themselves.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self { file })
    }

    /// Open an existing image for reading and writing.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl ByteStore for FileDisk {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)
    }

    fn byte_len(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_byte_len(&mut self, len: u64) -> Result<()> {
        // sparse on filesystems that support it, zero-filled otherwise
        self.file.set_len(len)
    }
}
