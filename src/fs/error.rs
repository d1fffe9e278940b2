use std::path::PathBuf;

use thiserror::Error;

use crate::fs::config::MAX_NAME;

/// Every failure a disk operation can report.
///
/// None of these are retried; the caller prints the message and gives up.
#[derive(Error, Debug)]
pub enum VfsError {
    #[error("cannot create disk {}: {source}", .path.display())]
    DiskCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open disk {}: {source}", .path.display())]
    DiskOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot remove disk {}: {source}", .path.display())]
    DiskRemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a valid disk image: {0}")]
    InvalidDiskImage(String),

    #[error("provided disk size is too small: {size_kb}KB")]
    DiskTooSmall { size_kb: u64 },

    #[error("provided disk size is too large: {size_kb}KB")]
    DiskTooLarge { size_kb: u64 },

    #[error("maximum number of files reached")]
    FileTableFull,

    #[error("filename {0} is too long (max {max} bytes)", max = MAX_NAME - 1)]
    NameTooLong(String),

    #[error("invalid filename {0:?}")]
    InvalidName(String),

    #[error("file {0} already exists")]
    DuplicateName(String),

    #[error("not enough disk space: need {needed}B, {available}B free")]
    InsufficientSpace { needed: u64, available: u64 },

    #[error("file {0} doesnt exist")]
    FileNotFound(String),

    #[error("cannot read {target}: {source}")]
    SourceFileUnreadable {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {target}: {source}")]
    DestinationUnwritable {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file system corrupted: {0}")]
    Corrupted(String),

    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_single_line() {
        let errors = [
            VfsError::FileTableFull,
            VfsError::NameTooLong("0123456789abcdef".to_string()),
            VfsError::FileNotFound("a.txt".to_string()),
            VfsError::InsufficientSpace {
                needed: 2048,
                available: 1024,
            },
            VfsError::DiskOpenFailed {
                path: PathBuf::from("disk.img"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            },
        ];

        for err in errors {
            let msg = err.to_string();
            assert!(!msg.contains('\n'), "multi-line message: {msg}");
        }
    }

    #[test]
    fn test_name_too_long_mentions_limit() {
        let msg = VfsError::NameTooLong("x".repeat(16)).to_string();
        assert!(msg.contains("max 15 bytes"));
    }
}
