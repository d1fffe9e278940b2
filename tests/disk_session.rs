use std::fs::OpenOptions;

use proptest::prelude::*;
use tempfile::TempDir;
use vdisk::{Layout, MemDisk, VfsError, VirtualDisk, BLOCK_SIZE, MAX_FILES, MAX_NAME};

fn scratch() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.img");
    (dir, path)
}

fn mem_disk(size_kb: u64) -> VirtualDisk<MemDisk> {
    VirtualDisk::format(MemDisk::new(), Layout::for_size_kb(size_kb).unwrap()).unwrap()
}

#[test]
fn test_create_open_scenario() {
    let (dir, path) = scratch();
    VirtualDisk::create(&path, 64).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 64 * 1024);

    let mut disk = VirtualDisk::open(&path).unwrap();
    let initial = disk.free_space();

    let payload: Vec<u8> = (0..2000u32).map(|i| (i * 7) as u8).collect();
    disk.add("a.txt", &payload).unwrap();
    disk.add("b.txt", b"").unwrap();
    drop(disk);

    let mut disk = VirtualDisk::open(&path).unwrap();
    let listed: Vec<_> = disk.list().collect();
    assert_eq!(listed, [("a.txt", 2000), ("b.txt", 0)]);
    assert_eq!(disk.free_space(), initial - 2 * BLOCK_SIZE as u64);

    disk.remove("a.txt").unwrap();
    assert_eq!(disk.free_space(), initial);

    let out = dir.path().join("b.out");
    assert_eq!(disk.extract_to("b.txt", &out).unwrap(), 0);
    assert_eq!(std::fs::read(&out).unwrap(), b"");
}

#[test]
fn test_create_rejects_tiny_disk_without_touching_path() {
    let (_dir, path) = scratch();
    assert!(matches!(
        VirtualDisk::create(&path, 1),
        Err(VfsError::DiskTooSmall { size_kb: 1 })
    ));
    assert!(!path.exists());
}

#[test]
fn test_create_unsupported_size_keeps_existing_image() {
    let (_dir, path) = scratch();
    let mut disk = VirtualDisk::create(&path, 16).unwrap();
    disk.add("keep", b"still here").unwrap();
    drop(disk);

    // larger than any host file length
    let err = VirtualDisk::create(&path, u64::MAX / 1024).unwrap_err();
    assert!(matches!(err, VfsError::DiskCreateFailed { .. }));

    assert_eq!(std::fs::metadata(&path).unwrap().len(), 16 * 1024);
    let mut disk = VirtualDisk::open(&path).unwrap();
    assert_eq!(disk.read("keep").unwrap(), b"still here");
}

#[test]
fn test_failed_create_leaves_no_new_file() {
    let (_dir, path) = scratch();
    assert!(matches!(
        VirtualDisk::create(&path, u64::MAX / 1024),
        Err(VfsError::DiskCreateFailed { .. })
    ));
    assert!(!path.exists());
}

#[test]
fn test_create_over_existing_image_starts_empty() {
    let (_dir, path) = scratch();
    let mut disk = VirtualDisk::create(&path, 64).unwrap();
    disk.add("old", &[3u8; 4000]).unwrap();
    drop(disk);

    VirtualDisk::create(&path, 32).unwrap();
    let disk = VirtualDisk::open(&path).unwrap();
    assert_eq!(disk.file_count(), 0);
    assert_eq!(disk.total_bytes(), 32 * 1024);
    assert_eq!(disk.free_space(), disk.header().block_count * BLOCK_SIZE as u64);
}

#[test]
fn test_create_in_missing_directory_fails() {
    let (dir, _) = scratch();
    let path = dir.path().join("no/such/dir/disk.img");
    assert!(matches!(
        VirtualDisk::create(&path, 64),
        Err(VfsError::DiskCreateFailed { .. })
    ));
}

#[test]
fn test_open_missing_disk_fails() {
    let (_dir, path) = scratch();
    assert!(matches!(
        VirtualDisk::open(&path),
        Err(VfsError::DiskOpenFailed { .. })
    ));
}

#[test]
fn test_reopen_rejects_resized_image() {
    let (_dir, path) = scratch();
    VirtualDisk::create(&path, 32).unwrap();

    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(32 * 1024 - 100).unwrap();
    drop(file);
    assert!(matches!(
        VirtualDisk::open(&path),
        Err(VfsError::InvalidDiskImage(_))
    ));

    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(33 * 1024).unwrap();
    drop(file);
    assert!(matches!(
        VirtualDisk::open(&path),
        Err(VfsError::InvalidDiskImage(_))
    ));
}

#[test]
fn test_open_rejects_random_file() {
    let (_dir, path) = scratch();
    std::fs::write(&path, b"definitely not a disk image at all").unwrap();
    assert!(matches!(
        VirtualDisk::open(&path),
        Err(VfsError::InvalidDiskImage(_))
    ));
}

#[test]
fn test_destroy() {
    let (_dir, path) = scratch();
    VirtualDisk::create(&path, 16).unwrap();
    VirtualDisk::destroy(&path).unwrap();
    assert!(!path.exists());
    assert!(matches!(
        VirtualDisk::destroy(&path),
        Err(VfsError::DiskRemoveFailed { .. })
    ));
}

#[test]
fn test_extract_missing_name_leaves_no_output() {
    let (dir, path) = scratch();
    let mut disk = VirtualDisk::create(&path, 16).unwrap();
    let out = dir.path().join("out");
    assert!(matches!(
        disk.extract_to("ghost", &out),
        Err(VfsError::FileNotFound(_))
    ));
    assert!(!out.exists());
}

#[test]
fn test_capacity_boundary() {
    let mut disk = mem_disk(256);
    for i in 0..MAX_FILES {
        disk.add(&format!("file{i}"), b"x").unwrap();
    }
    assert!(matches!(
        disk.add("extra", b"x"),
        Err(VfsError::FileTableFull)
    ));

    disk.remove("file10").unwrap();
    disk.add("extra", b"x").unwrap();
    assert!(matches!(
        disk.add("extra2", b"x"),
        Err(VfsError::FileTableFull)
    ));
}

#[test]
fn test_name_constraints() {
    let mut disk = mem_disk(64);
    assert!(matches!(
        disk.add(&"n".repeat(MAX_NAME), b"data"),
        Err(VfsError::NameTooLong(_))
    ));
    disk.add(&"n".repeat(MAX_NAME - 1), b"data").unwrap();

    let free = disk.free_space();
    assert!(matches!(
        disk.add(&"n".repeat(MAX_NAME - 1), b"other"),
        Err(VfsError::DuplicateName(_))
    ));
    assert_eq!(disk.free_space(), free);
}

#[test]
fn test_removal_order_does_not_matter_for_contents() {
    let mut disk = mem_disk(64);
    let files: Vec<(String, Vec<u8>)> = (0..6)
        .map(|i| (format!("f{i}"), vec![i as u8; 700 * (i + 1)]))
        .collect();
    for (name, data) in &files {
        disk.add(name, data).unwrap();
    }
    disk.remove("f1").unwrap();
    disk.remove("f4").unwrap();
    disk.add("late", &[9u8; 2500]).unwrap();

    let mut disk = VirtualDisk::mount(disk.into_store()).unwrap();
    for (name, data) in &files {
        if name == "f1" || name == "f4" {
            assert!(disk.file(name).is_none());
        } else {
            assert_eq!(&disk.read(name).unwrap(), data);
        }
    }
    assert_eq!(disk.read("late").unwrap(), vec![9u8; 2500]);
}

proptest! {
    #[test]
    fn prop_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..8192)) {
        let mut disk = mem_disk(64);
        disk.add("p", &payload).unwrap();
        prop_assert_eq!(disk.read("p").unwrap(), payload);
    }

    #[test]
    fn prop_free_space_conservation(len in 0usize..10_000) {
        let mut disk = mem_disk(64);
        disk.add("pad", &[1u8; 10]).unwrap();
        let before = disk.free_space();

        disk.add("p", &vec![0u8; len]).unwrap();
        let used = before - disk.free_space();
        prop_assert_eq!(used, len.div_ceil(BLOCK_SIZE) as u64 * BLOCK_SIZE as u64);

        disk.remove("p").unwrap();
        prop_assert_eq!(disk.free_space(), before);
    }
}
