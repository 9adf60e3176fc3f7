//! Runs the same kind of batch as `tests/scenarios.rs` but against
//! `LocalFileSystem` and real temp directories, the way the teacher's
//! `integration_file_util.rs` exercises `file_util::copy`/`compression`
//! against real tempdirs rather than mocks.

use std::fs;

use synthfs::fs_backend::LocalFileSystem;
use synthfs::item::ArchiveFormat;
use synthfs::Batch;
use tempfile::tempdir;

#[test]
fn create_file_with_auto_parent_on_real_disk() {
    let root = tempdir().unwrap();
    let target = root.path().join("nested/dir/greeting.txt");

    let fs = LocalFileSystem::new();
    let batch = Batch::with_filesystem(&fs)
        .create_file(&target, b"hello disk".to_vec(), 0o644)
        .unwrap();
    let report = batch.run_with_prerequisites().unwrap();

    assert!(report.success, "errors: {:?}", report.errors().collect::<Vec<_>>());
    assert_eq!(fs::read(&target).unwrap(), b"hello disk");
}

#[test]
fn restorable_delete_round_trip_on_real_disk() {
    let root = tempdir().unwrap();
    let file = root.path().join("doomed.txt");
    fs::write(&file, b"do not lose me").unwrap();

    let fs = LocalFileSystem::new();
    let batch = Batch::with_filesystem(&fs).delete(&file).unwrap();
    let report = batch.run_restorable_with_budget(1.0).unwrap();

    assert!(report.success);
    assert!(!file.exists());

    let ctx = synthfs::operation::ExecContext::new("restore");
    report.restore.unwrap().run(&ctx, &fs).unwrap();
    assert_eq!(fs::read(&file).unwrap(), b"do not lose me");
}

#[test]
fn archive_and_unarchive_round_trip_on_real_disk() {
    let root = tempdir().unwrap();
    let source_dir = root.path().join("payload");
    fs::create_dir_all(&source_dir).unwrap();
    fs::write(source_dir.join("a.txt"), b"alpha").unwrap();
    fs::write(source_dir.join("b.txt"), b"beta").unwrap();

    let archive_path = root.path().join("payload.tar.gz");
    let extract_path = root.path().join("extracted");

    let fs = LocalFileSystem::new();
    let batch = Batch::with_filesystem(&fs)
        .create_archive(&archive_path, ArchiveFormat::TarGz, vec![source_dir.clone()])
        .unwrap()
        .unarchive(&archive_path, &extract_path, None)
        .unwrap();
    let report = batch.run_with_prerequisites().unwrap();

    assert!(report.success, "errors: {:?}", report.errors().collect::<Vec<_>>());
    assert!(archive_path.exists());
    assert_eq!(fs::read(extract_path.join("payload/a.txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(extract_path.join("payload/b.txt")).unwrap(), b"beta");
}
