use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    disk::ByteStore,
    fs::{
        block_table::BlockTable,
        config::{BlockId, MAX_FILES, MAX_NAME, NO_BLOCK},
        error::{Result, VfsError},
        header::Header,
        layout::Layout,
        record,
    },
};

/// Serialized size of one file entry.
pub const FILE_ENTRY_SIZE: u64 = 32;

/// Metadata of one stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub size: u64,
    pub name: String,
    pub first_block: Option<BlockId>, // None for empty files
}

#[derive(Serialize, Deserialize)]
struct RawFileEntry {
    size: u64,
    name: [u8; MAX_NAME], // NUL padded
    first_block: u64,
}

impl From<&FileEntry> for RawFileEntry {
    fn from(entry: &FileEntry) -> Self {
        let mut name = [0u8; MAX_NAME];
        let bytes = entry.name.as_bytes();
        let len = bytes.len().min(MAX_NAME - 1);
        name[..len].copy_from_slice(&bytes[..len]);
        Self {
            size: entry.size,
            name,
            first_block: entry.first_block.unwrap_or(NO_BLOCK),
        }
    }
}

impl TryFrom<RawFileEntry> for FileEntry {
    type Error = VfsError;

    fn try_from(raw: RawFileEntry) -> Result<Self> {
        let end = raw.name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME);
        let name = std::str::from_utf8(&raw.name[..end])
            .map_err(|_| VfsError::InvalidDiskImage("file name is not UTF-8".to_string()))?;
        Ok(Self {
            size: raw.size,
            name: name.to_string(),
            first_block: (raw.first_block != NO_BLOCK).then_some(raw.first_block),
        })
    }
}

/// The dense array of live file entries.
///
/// Entries `0..len()` are live; the on-disk region always has room for
/// `MAX_FILES` of them.
#[derive(Debug)]
pub struct FileTable {
    entries: Vec<FileEntry>,
    layout: Layout,
}

impl FileTable {
    pub fn new(layout: Layout) -> Self {
        Self {
            entries: Vec::new(),
            layout,
        }
    }

    pub fn load<S: ByteStore + ?Sized>(store: &mut S, layout: Layout, count: u64) -> Result<Self> {
        if count > MAX_FILES as u64 {
            return Err(VfsError::InvalidDiskImage(format!(
                "file count {count} exceeds capacity {MAX_FILES}"
            )));
        }

        let raw: Vec<RawFileEntry> = record::read_many(
            store,
            layout.file_table_offset(),
            FILE_ENTRY_SIZE,
            count,
            "file entry",
        )?;
        let entries = raw
            .into_iter()
            .map(FileEntry::try_from)
            .collect::<Result<Vec<_>>>()?;

        if let Some(entry) = entries
            .iter()
            .find(|e| e.first_block.is_some_and(|b| b >= layout.block_count))
        {
            return Err(VfsError::InvalidDiskImage(format!(
                "file {} starts outside the data region",
                entry.name
            )));
        }

        Ok(Self { entries, layout })
    }

    fn persist<S: ByteStore + ?Sized>(&self, store: &mut S, index: usize) -> Result<()> {
        let raw = RawFileEntry::from(&self.entries[index]);
        record::write(store, self.layout.file_entry_offset(index), &raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_FILES
    }

    /// Live entries in stored order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Index of the entry named exactly `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.find(name).map(|index| &self.entries[index])
    }

    /// Check that an entry called `name` could be inserted right now.
    pub fn check_insert(&self, name: &str) -> Result<()> {
        if self.is_full() {
            return Err(VfsError::FileTableFull);
        }
        if name.len() > MAX_NAME - 1 {
            return Err(VfsError::NameTooLong(name.to_string()));
        }
        if name.trim().is_empty() || name.contains('\0') {
            return Err(VfsError::InvalidName(name.to_string()));
        }
        if self.find(name).is_some() {
            return Err(VfsError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Append `entry` and bump the header's file count, persisting both.
    pub fn insert<S: ByteStore + ?Sized>(
        &mut self,
        store: &mut S,
        header: &mut Header,
        entry: FileEntry,
    ) -> Result<()> {
        self.check_insert(&entry.name)?;

        self.entries.push(entry);
        let index = self.entries.len() - 1;
        self.persist(store, index)?;

        header.file_count = self.entries.len() as u64;
        header.sync(store)?;
        debug!(index, "inserted file entry");
        Ok(())
    }

    /// Drop the entry called `name` and free its chain.
    ///
    /// The last live entry moves into the vacated slot, so stored order
    /// is not preserved.
    pub fn remove<S: ByteStore + ?Sized>(
        &mut self,
        store: &mut S,
        header: &mut Header,
        blocks: &mut BlockTable,
        name: &str,
    ) -> Result<FileEntry> {
        let index = self
            .find(name)
            .ok_or_else(|| VfsError::FileNotFound(name.to_string()))?;

        blocks.free_chain(store, self.entries[index].first_block)?;

        let removed = self.entries.swap_remove(index);
        header.file_count = self.entries.len() as u64;
        header.sync(store)?;

        if index < self.entries.len() {
            self.persist(store, index)?;
            debug!(from = self.entries.len(), to = index, "moved file entry");
        }
        Ok(removed)
    }
}
