use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use tracing::{info, warn};

use crate::{
    disk::{ByteStore, FileDisk},
    fs::{
        block_table::{blocks_for, BlockStatus, BlockTable},
        config::{BlockId, BLOCK_SIZE},
        data_area::DataArea,
        error::{Result, VfsError},
        file_table::{FileEntry, FileTable},
        header::{Header, HEADER_SIZE},
        layout::{Layout, Region},
    },
};

pub mod block_table;
pub mod config;
pub mod data_area;
pub mod error;
pub mod file_table;
pub mod header;
pub mod layout;
pub mod record;

/// An open virtual disk.
///
/// The header and both tables are loaded into memory when the disk is
/// mounted; every mutation updates memory and writes the changed records
/// back before returning.
#[derive(Debug)]
pub struct VirtualDisk<S: ByteStore = FileDisk> {
    store: S,
    header: Header,
    layout: Layout,
    files: FileTable,
    blocks: BlockTable,
    data: DataArea,
}

/// Read-only snapshot of the image layout and block usage.
#[derive(Debug)]
pub struct DiskDump<'a> {
    pub regions: [Region; 5],
    pub blocks: &'a [BlockStatus],
}

impl VirtualDisk<FileDisk> {
    /// Create (or overwrite) a disk image of `size_kb` kilobytes at `path`.
    ///
    /// An existing image is only discarded once the host has accepted the
    /// new length; on failure a freshly created file is removed again.
    pub fn create(path: &Path, size_kb: u64) -> Result<Self> {
        let layout = Layout::for_size_kb(size_kb)?;
        let existed = path.exists();

        Self::create_at(path, layout).inspect_err(|_| {
            if !existed {
                let _ = std::fs::remove_file(path);
            }
        })
    }

    fn create_at(path: &Path, layout: Layout) -> Result<Self> {
        let create_failed = |source| VfsError::DiskCreateFailed {
            path: path.to_path_buf(),
            source,
        };

        let mut store = FileDisk::create(path).map_err(create_failed)?;
        store
            .set_byte_len(layout.total_bytes)
            .map_err(create_failed)?;
        // start from zeroes rather than the previous image's bytes
        store.set_byte_len(0).map_err(create_failed)?;

        let disk = Self::format(store, layout).map_err(|e| match e {
            VfsError::Io(source) => create_failed(source),
            other => other,
        })?;
        info!(
            path = %path.display(),
            total_bytes = layout.total_bytes,
            blocks = layout.block_count,
            "created disk"
        );
        Ok(disk)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let store = FileDisk::open(path).map_err(|source| VfsError::DiskOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let disk = Self::mount(store).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "rejected disk image");
        })?;
        info!(
            path = %path.display(),
            files = disk.header.file_count,
            blocks = disk.header.block_count,
            "opened disk"
        );
        Ok(disk)
    }

    /// Delete the image file at `path`.
    pub fn destroy(path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|source| VfsError::DiskRemoveFailed {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "removed disk");
        Ok(())
    }
}

impl<S: ByteStore> VirtualDisk<S> {
    /// Lay out an empty filesystem on `store`, sizing it to `layout.total_bytes`.
    pub fn format(mut store: S, layout: Layout) -> Result<Self> {
        // pre-extend, so later writes at any offset never append
        store.set_byte_len(layout.total_bytes)?;

        let header = Header::new(layout.total_bytes, layout.block_count);
        header.sync(&mut store)?;
        let blocks = BlockTable::new(layout);
        blocks.sync(&mut store)?;

        Ok(Self {
            store,
            header,
            layout,
            files: FileTable::new(layout),
            blocks,
            data: DataArea::new(layout),
        })
    }

    /// Validate the image in `store` and load its tables.
    pub fn mount(mut store: S) -> Result<Self> {
        let len = store.byte_len()?;
        if len < HEADER_SIZE {
            return Err(VfsError::InvalidDiskImage(format!(
                "{len} bytes is too short for a header"
            )));
        }

        let header = Header::load(&mut store)?;
        if header.total_bytes != len {
            return Err(VfsError::InvalidDiskImage(format!(
                "header records {} bytes but the image has {len}",
                header.total_bytes
            )));
        }

        let layout = Layout::from_header(&header);
        match Layout::for_total_bytes(len) {
            Some(expected) if expected == layout => {}
            _ => {
                return Err(VfsError::InvalidDiskImage(format!(
                    "block count {} does not match image size",
                    header.block_count
                )))
            }
        }

        let files = FileTable::load(&mut store, layout, header.file_count)?;
        let blocks = BlockTable::load(&mut store, layout)?;

        Ok(Self {
            store,
            header,
            layout,
            files,
            blocks,
            data: DataArea::new(layout),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn total_bytes(&self) -> u64 {
        self.header.total_bytes
    }

    pub fn free_space(&self) -> u64 {
        self.blocks.free_space()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.get(name)
    }

    /// Give back the underlying store, closing the session.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Check that a `len`-byte file called `name` would be accepted.
    ///
    /// Runs the same checks, in the same order, as [`Self::add_from`]:
    /// table capacity, name, duplicate, then free space.
    pub fn check_add(&self, name: &str, len: u64) -> Result<()> {
        self.files.check_insert(name)?;

        let available = self.blocks.free_space();
        if len > available {
            return Err(VfsError::InsufficientSpace {
                needed: blocks_for(len) * BLOCK_SIZE as u64,
                available,
            });
        }
        Ok(())
    }

    /// Store `payload` as a new file called `name`.
    pub fn add(&mut self, name: &str, payload: &[u8]) -> Result<()> {
        self.add_from(name, payload.len() as u64, payload, name)
    }

    /// Store `len` bytes read from `src` as a new file called `name`.
    ///
    /// All checks run before anything is allocated, so a rejected call
    /// leaves the image unchanged and `src` unread. The payload is copied
    /// one block at a time. If `src` fails or ends early, the claimed
    /// blocks are released again and no entry is written.
    pub fn add_from<R: Read>(
        &mut self,
        name: &str,
        len: u64,
        mut src: R,
        src_label: &str,
    ) -> Result<()> {
        self.check_add(name, len)?;

        let chain = self.blocks.allocate_chain(&mut self.store, len)?;
        if let Err(e) = self.fill_chain(&chain, len, &mut src, src_label) {
            if let Err(release) = self
                .blocks
                .free_chain(&mut self.store, chain.first().copied())
            {
                warn!(name, error = %release, "could not release blocks of failed copy");
            }
            return Err(e);
        }

        let entry = FileEntry {
            size: len,
            name: name.to_string(),
            first_block: chain.first().copied(),
        };
        self.files
            .insert(&mut self.store, &mut self.header, entry)?;

        info!(name, size = len, blocks = chain.len(), "added file");
        Ok(())
    }

    fn fill_chain<R: Read>(
        &mut self,
        chain: &[BlockId],
        len: u64,
        src: &mut R,
        src_label: &str,
    ) -> Result<()> {
        let unreadable = |source| VfsError::SourceFileUnreadable {
            target: src_label.to_string(),
            source,
        };

        let mut buf = [0u8; BLOCK_SIZE];
        let mut remaining = len;
        for &block in chain {
            let fill = remaining.min(BLOCK_SIZE as u64) as usize;
            src.read_exact(&mut buf[..fill]).map_err(unreadable)?;
            self.data.write_block(&mut self.store, block, &buf[..fill])?;
            remaining -= fill as u64;
        }
        Ok(())
    }

    /// Write the contents of `name` to `dest`. Returns the byte count.
    ///
    /// `dest_label` names the destination in error messages.
    pub fn extract<W: Write>(&mut self, name: &str, mut dest: W, dest_label: &str) -> Result<u64> {
        let entry = self
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| VfsError::FileNotFound(name.to_string()))?;

        let unwritable = |source| VfsError::DestinationUnwritable {
            target: dest_label.to_string(),
            source,
        };

        let mut buf = [0u8; BLOCK_SIZE];
        let mut remaining = entry.size;
        for block in self.blocks.chain(entry.first_block) {
            if remaining == 0 {
                break;
            }
            // the last block may be partially filled
            let fill = remaining.min(BLOCK_SIZE as u64) as usize;
            self.data
                .read_block(&mut self.store, block, &mut buf[..fill])?;
            dest.write_all(&buf[..fill]).map_err(unwritable)?;
            remaining -= fill as u64;
        }

        if remaining > 0 {
            return Err(VfsError::Corrupted(format!(
                "chain of {name} ends {remaining} bytes short"
            )));
        }
        dest.flush().map_err(unwritable)?;

        info!(name, size = entry.size, "extracted file");
        Ok(entry.size)
    }

    /// Extract `name` into a new host file at `dest`.
    ///
    /// The name is resolved first, so a missing file never leaves an
    /// empty destination behind.
    pub fn extract_to(&mut self, name: &str, dest: &Path) -> Result<u64> {
        if self.files.find(name).is_none() {
            return Err(VfsError::FileNotFound(name.to_string()));
        }
        let target = dest.display().to_string();
        let out = File::create(dest).map_err(|source| VfsError::DestinationUnwritable {
            target: target.clone(),
            source,
        })?;
        self.extract(name, out, &target)
    }

    /// Read the whole contents of `name` into memory.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.extract(name, &mut out, "memory")?;
        Ok(out)
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let removed =
            self.files
                .remove(&mut self.store, &mut self.header, &mut self.blocks, name)?;
        info!(name, size = removed.size, "removed file");
        Ok(())
    }

    /// `(name, size)` of every file, sorted by name. Stored order is untouched.
    pub fn list(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        let mut entries: Vec<&FileEntry> = self.files.entries().iter().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.into_iter().map(|e| (e.name.as_str(), e.size))
    }

    pub fn dump(&self) -> DiskDump<'_> {
        DiskDump {
            regions: self.layout.regions(),
            blocks: self.blocks.statuses(),
        }
    }
}
