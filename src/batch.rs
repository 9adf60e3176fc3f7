//! Batch facade (C8, §4.8): the thin, chainable entry point most callers
//! use instead of wiring `Pipeline`/`Executor`/`OperationFactory`
//! together by hand. Mirrors the one-method-per-subcommand shape of
//! the teacher's `Commands` enum / `commands.rs` handler functions.

use std::path::PathBuf;

use crate::error::Result;
use crate::executor::{EventBus, ExecutionOptions, ExecutionReport, Executor};
use crate::factory::OperationFactory;
use crate::fs_backend::FileSystem;
use crate::item::ArchiveFormat;
use crate::operation::{CancellationToken, ExecContext, Operation};
use crate::pipeline::Pipeline;
use crate::prereq::PrerequisiteResolver;
use crate::state::{PathStateTracker, WillBeType};

pub struct Batch<'a> {
    fs: &'a dyn FileSystem,
    factory: OperationFactory,
    pipeline: Pipeline,
    ctx: ExecContext,
    events: Option<EventBus>,
    tracker: PathStateTracker,
}

impl<'a> std::fmt::Debug for Batch<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch").finish_non_exhaustive()
    }
}

impl<'a> Batch<'a> {
    pub fn with_filesystem(fs: &'a dyn FileSystem) -> Self {
        Batch {
            fs,
            factory: OperationFactory::new(),
            pipeline: Pipeline::new(),
            ctx: ExecContext::new("batch"),
            events: None,
            tracker: PathStateTracker::new(),
        }
    }

    pub fn with_context(mut self, batch_id: impl Into<String>) -> Self {
        self.ctx = ExecContext::new(batch_id);
        self
    }

    pub fn with_registry(mut self, factory: OperationFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_logger(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancellation_token()
    }

    fn push(mut self, op: Box<dyn Operation>) -> Result<Self> {
        self.pipeline.push(op)?;
        Ok(self)
    }

    /// Each builder method tracks the operation's projected effect against
    /// `tracker` *before* appending it, so conflicts like "create the same
    /// path twice" or "create over a scheduled deletion" (S2/S3) surface
    /// immediately at add-time rather than only at execute-time.
    pub fn create_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>, mode: u32) -> Result<Self> {
        let path = path.into();
        let op = self.factory.create_file(path.clone(), content, mode);
        self.tracker.apply_create(&path, WillBeType::File, op.id(), self.fs)?;
        self.push(op)
    }

    pub fn create_dir(mut self, path: impl Into<PathBuf>, mode: u32) -> Result<Self> {
        let path = path.into();
        let op = self.factory.create_directory(path.clone(), mode);
        self.tracker.apply_create_directory(&path, op.id(), self.fs)?;
        self.push(op)
    }

    pub fn create_symlink(mut self, path: impl Into<PathBuf>, target: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let op = self.factory.create_symlink(path.clone(), target);
        self.tracker.apply_create(&path, WillBeType::Symlink, op.id(), self.fs)?;
        self.push(op)
    }

    pub fn create_archive(mut self, path: impl Into<PathBuf>, format: ArchiveFormat, sources: Vec<PathBuf>) -> Result<Self> {
        let path = path.into();
        let op = self.factory.create_archive(path.clone(), format, sources);
        self.tracker.apply_create(&path, WillBeType::File, op.id(), self.fs)?;
        self.push(op)
    }

    pub fn unarchive(mut self, archive_path: impl Into<PathBuf>, extract_path: impl Into<PathBuf>, patterns: Option<Vec<String>>) -> Result<Self> {
        let archive_path = archive_path.into();
        let extract_path = extract_path.into();
        let op = self.factory.unarchive(archive_path.clone(), extract_path.clone(), patterns);
        self.tracker.apply_unarchive(&archive_path, &extract_path, op.id(), self.fs)?;
        self.push(op)
    }

    pub fn copy(mut self, src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Result<Self> {
        let src = src.into();
        let dst = dst.into();
        let op = self.factory.copy(src.clone(), dst.clone());
        self.tracker.apply_copy(&src, &dst, op.id(), self.fs)?;
        self.push(op)
    }

    pub fn mv(mut self, src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Result<Self> {
        let src = src.into();
        let dst = dst.into();
        let op = self.factory.mv(src.clone(), dst.clone());
        self.tracker.apply_move(&src, &dst, op.id(), self.fs)?;
        self.push(op)
    }

    pub fn delete(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let op = self.factory.delete(path.clone());
        self.tracker.apply_delete(&path, op.id(), self.fs)?;
        self.push(op)
    }

    pub fn run(self) -> Result<ExecutionReport> {
        self.run_with_options(ExecutionOptions::default())
    }

    pub fn run_restorable(self) -> Result<ExecutionReport> {
        self.run_with_options(ExecutionOptions {
            restorable: true,
            ..ExecutionOptions::default()
        })
    }

    pub fn run_restorable_with_budget(self, max_backup_size_mb: f64) -> Result<ExecutionReport> {
        self.run_with_options(ExecutionOptions {
            restorable: true,
            max_backup_size_mb,
            ..ExecutionOptions::default()
        })
    }

    pub fn run_with_prerequisites(self) -> Result<ExecutionReport> {
        self.run_with_options(ExecutionOptions {
            resolve_prerequisites: true,
            ..ExecutionOptions::default()
        })
    }

    /// Resolves prerequisites, orders, and validates the pipeline — any
    /// of which halts the batch before execution and surfaces as `Err`
    /// here — then hands it to the [`Executor`]. A per-operation failure
    /// during execution does *not* surface as `Err`: it is recorded in
    /// the returned report, which always carries a rollback closure the
    /// caller may invoke at their discretion (§4.6, §7).
    pub fn run_with_options(mut self, options: ExecutionOptions) -> Result<ExecutionReport> {
        if options.resolve_prerequisites {
            let resolver = PrerequisiteResolver::new(&self.factory);
            self.pipeline.resolve_prerequisites(&resolver, self.fs)?;
        }
        self.pipeline.resolve()?;
        self.pipeline.validate(&self.ctx, self.fs)?;

        let mut executor = Executor::new(self.fs);
        if let Some(events) = self.events {
            executor = executor.with_events(events);
        }
        executor.run(&self.pipeline, &self.ctx, &options)
    }
}

/// Fresh, unshared factory instance — the escape hatch from the
/// constructor-injected design for callers that don't need a `Batch`.
/// Never a process-wide singleton (§9 Design Notes).
pub fn default_factory() -> OperationFactory {
    OperationFactory::new()
}
