pub mod byte_store;
pub mod file_disk;
pub mod mem_disk;

pub use byte_store::ByteStore;
pub use file_disk::FileDisk;
pub use mem_disk::MemDisk;
