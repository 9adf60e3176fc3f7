//! End-to-end batch scenarios run against the in-memory filesystem:
//! auto-parent resolution, add-time conflict detection, restorable
//! delete round-trips, budget enforcement, and rollback on mid-batch
//! failure.

use synthfs::backup::BackupBudget;
use synthfs::error::Error;
use synthfs::executor::{ExecutionOptions, Executor, OpStatus};
use synthfs::fs_backend::{FileSystem, MemoryFileSystem};
use synthfs::operation::ExecContext;
use synthfs::pipeline::Pipeline;
use synthfs::prereq::PrerequisiteResolver;
use synthfs::{default_factory, Batch};

#[test]
fn s1_auto_parent_resolution() {
    let fs = MemoryFileSystem::new();
    let batch = Batch::with_filesystem(&fs)
        .create_file("a/b/c.txt", b"hello".to_vec(), 0o644)
        .unwrap();
    let report = batch.run_with_prerequisites().unwrap();
    assert!(report.success, "errors: {:?}", report.errors().collect::<Vec<_>>());
    assert_eq!(report.executed_ids().len(), 2, "expected a synthesized parent dir + the file");

    assert_eq!(fs.read(std::path::Path::new("a/b/c.txt")).unwrap(), b"hello");
    let dir_info = fs.stat(std::path::Path::new("a/b")).unwrap().unwrap();
    assert!(dir_info.is_dir());
    assert_eq!(dir_info.mode, 0o755);
}

#[test]
fn s2_duplicate_create_conflicts_at_add_time() {
    let fs = MemoryFileSystem::new();
    let batch = Batch::with_filesystem(&fs).create_file("x", b"1".to_vec(), 0o644).unwrap();
    let err = batch.create_file("x", b"2".to_vec(), 0o644).unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }));
}

#[test]
fn s3_delete_then_create_conflicts_at_add_time() {
    let fs = MemoryFileSystem::new();
    fs.seed_file("x", b"old".to_vec(), 0o644);
    let batch = Batch::with_filesystem(&fs).delete("x").unwrap();
    let err = batch.create_file("x", b"new".to_vec(), 0o644).unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }));
    assert!(err.to_string().contains("scheduled for deletion"));
}

#[test]
fn s4_restorable_delete_round_trip() {
    let fs = MemoryFileSystem::new();
    fs.seed_file("x", b"abc".to_vec(), 0o600);
    let batch = Batch::with_filesystem(&fs).delete("x").unwrap();
    let report = batch.run_restorable_with_budget(10.0).unwrap();
    assert!(report.success);
    assert!(fs.stat(std::path::Path::new("x")).unwrap().is_none());

    let budget = report.budget.as_ref().unwrap();
    let expected_used = 3.0 / synthfs::backup::BYTES_PER_MB;
    assert!((budget.used_mb() - expected_used).abs() < 1e-9);
    assert!((budget.remaining_mb() - (10.0 - expected_used)).abs() < 1e-9);
    assert_eq!(budget.used_mb() + budget.remaining_mb(), budget.total_mb());

    let ctx = ExecContext::new("restore");
    report.restore.unwrap().run(&ctx, &fs).unwrap();
    assert_eq!(fs.read(std::path::Path::new("x")).unwrap(), b"abc");
    assert_eq!(fs.stat(std::path::Path::new("x")).unwrap().unwrap().mode, 0o600);
}

#[test]
fn s5_budget_exceeded_leaves_file_untouched() {
    let fs = MemoryFileSystem::new();
    let big = vec![0u8; 11 * 1024 * 1024];
    fs.seed_file("big", big, 0o644);
    let batch = Batch::with_filesystem(&fs).delete("big").unwrap();
    let report = batch.run_restorable_with_budget(10.0).unwrap();

    assert!(!report.success);
    let budget = report.budget.as_ref().unwrap();
    assert_eq!(budget.used_mb(), 0.0);
    assert!(report.errors().any(|e| matches!(e, Error::BudgetExceeded { .. })));
    assert!(fs.stat(std::path::Path::new("big")).unwrap().is_some());
}

#[test]
fn s6_rollback_on_mid_batch_failure() {
    let fs = MemoryFileSystem::new();
    let factory = default_factory();
    let mut pipeline = Pipeline::new();
    pipeline.push(factory.create_file("a", b"1".to_vec(), 0o644)).unwrap();
    // "b" doesn't exist as a directory, and prerequisite resolution is
    // skipped below, so this create fails at execute time.
    pipeline.push(factory.create_file("b/forbidden", b"2".to_vec(), 0o644)).unwrap();

    let ctx = ExecContext::new("s6");
    let executor = Executor::new(&fs);
    let options = ExecutionOptions {
        resolve_prerequisites: false,
        ..ExecutionOptions::default()
    };
    let report = executor.run(&pipeline, &ctx, &options).unwrap();

    assert!(!report.success);
    assert!(fs.stat(std::path::Path::new("a")).unwrap().is_some());
    assert!(fs.stat(std::path::Path::new("b/forbidden")).unwrap().is_none());

    assert!(!report.rollback.is_noop());
    report.rollback.run(&ctx, &fs).unwrap();
    assert!(fs.stat(std::path::Path::new("a")).unwrap().is_none());
}

#[test]
fn cancellation_stops_before_later_operations() {
    let fs = MemoryFileSystem::new();
    let factory = default_factory();
    let mut pipeline = Pipeline::new();
    pipeline.push(factory.create_file("a", b"1".to_vec(), 0o644)).unwrap();
    pipeline.push(factory.create_file("b", b"2".to_vec(), 0o644)).unwrap();

    let ctx = ExecContext::new("cancel");
    let token = ctx.cancellation_token();
    token.cancel();

    let executor = Executor::new(&fs);
    let report = executor.run(&pipeline, &ctx, &ExecutionOptions::default()).unwrap();

    assert!(report.cancelled);
    assert!(!report.success);
    assert!(report.operations.iter().all(|r| r.status == OpStatus::Skipped));
    assert!(fs.stat(std::path::Path::new("a")).unwrap().is_none());
}

#[test]
fn prerequisite_resolver_synthesizes_parent_only() {
    let fs = MemoryFileSystem::new();
    let factory = default_factory();
    let resolver = PrerequisiteResolver::new(&factory);
    let mut pipeline = Pipeline::new();
    pipeline.push(factory.create_file("a/b.txt", b"x".to_vec(), 0o644)).unwrap();
    pipeline.resolve_prerequisites(&resolver, &fs).unwrap();
    pipeline.resolve().unwrap();
    assert_eq!(pipeline.len(), 2);
    assert_eq!(pipeline.operations()[0].kind(), synthfs::operation::OperationKind::CreateDirectory);
}

#[test]
fn unarchive_rollback_removes_extracted_directory() {
    use synthfs::item::ArchiveFormat;

    let fs = MemoryFileSystem::new();
    let batch = Batch::with_filesystem(&fs)
        .create_file("src/a.txt", b"alpha".to_vec(), 0o644)
        .unwrap();
    batch.run_with_prerequisites().unwrap();

    let factory = default_factory();
    let mut pipeline = Pipeline::new();
    pipeline.push(factory.create_archive("payload.tar.gz", ArchiveFormat::TarGz, vec!["src".into()])).unwrap();
    pipeline.push(factory.unarchive("payload.tar.gz", "extracted", None)).unwrap();

    let ctx = ExecContext::new("unarchive_rollback");
    let executor = Executor::new(&fs);
    let options = ExecutionOptions { resolve_prerequisites: true, ..ExecutionOptions::default() };
    let report = executor.run(&pipeline, &ctx, &options).unwrap();
    assert!(report.success, "errors: {:?}", report.errors().collect::<Vec<_>>());
    assert!(fs.stat(std::path::Path::new("extracted/src/a.txt")).unwrap().is_some());

    report.rollback.run(&ctx, &fs).unwrap();
    assert!(fs.stat(std::path::Path::new("extracted")).unwrap().is_none());
}

#[test]
fn operation_results_carry_duration_and_backup_data() {
    let fs = MemoryFileSystem::new();
    fs.seed_file("x", b"abc".to_vec(), 0o600);
    let batch = Batch::with_filesystem(&fs).delete("x").unwrap();
    let report = batch.run_restorable_with_budget(10.0).unwrap();

    assert!(report.success);
    assert_eq!(report.operations.len(), 1);
    let result = &report.operations[0];
    assert_eq!(result.status, OpStatus::Success);
    assert!(result.backup_data.is_some());
    assert!(result.backup_size_mb > 0.0);
}

#[test]
fn budget_conservation_under_successful_backup() {
    let mut budget = BackupBudget::new(5.0);
    budget.reserve(2.0).unwrap();
    assert_eq!(budget.used_mb() + budget.remaining_mb(), budget.total_mb());
    budget.release(2.0);
    assert_eq!(budget.used_mb(), 0.0);
}
