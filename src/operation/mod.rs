//! The Operation contract (C2, §4.1): one planned mutation, with its own
//! identity, description, optional item, declared prerequisites, and
//! validate/execute/reverse/rollback behavior.
//!
//! Modeled as a closed tagged variant per the Design Notes: one struct
//! per [`OperationKind`], all behind the single object-safe [`Operation`]
//! trait, rather than duck-typed capability checks.

mod copy;
mod create_archive;
mod create_directory;
mod create_file;
mod create_symlink;
mod delete;
mod mv;
mod unarchive;

pub use copy::CopyOp;
pub use create_archive::CreateArchiveOp;
pub use create_directory::CreateDirectoryOp;
pub use create_file::CreateFileOp;
pub use create_symlink::CreateSymlinkOp;
pub use delete::DeleteOp;
pub use mv::MoveOp;
pub use unarchive::UnarchiveOp;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backup::{BackupBudget, BackupData};
use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::item::FsItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateFile,
    CreateDirectory,
    CreateSymlink,
    CreateArchive,
    Unarchive,
    Copy,
    Move,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreateFile => "create_file",
            OperationKind::CreateDirectory => "create_directory",
            OperationKind::CreateSymlink => "create_symlink",
            OperationKind::CreateArchive => "create_archive",
            OperationKind::Unarchive => "unarchive",
            OperationKind::Copy => "copy",
            OperationKind::Move => "move",
            OperationKind::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create_file" => Some(OperationKind::CreateFile),
            "create_directory" => Some(OperationKind::CreateDirectory),
            "create_symlink" => Some(OperationKind::CreateSymlink),
            "create_archive" => Some(OperationKind::CreateArchive),
            "unarchive" => Some(OperationKind::Unarchive),
            "copy" => Some(OperationKind::Copy),
            "move" => Some(OperationKind::Move),
            "delete" => Some(OperationKind::Delete),
            _ => None,
        }
    }
}

/// Declarative per-operation precondition (§3 Prerequisite).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prerequisite {
    ParentDir(PathBuf),
    NoConflict(PathBuf),
    SourceExists(PathBuf),
}

impl Prerequisite {
    /// `(kind_tag, path)` used by the pipeline to dedup resolution
    /// attempts within a single `resolve_prerequisites` pass.
    pub fn dedup_key(&self) -> (&'static str, &Path) {
        match self {
            Prerequisite::ParentDir(p) => ("parent_dir", p.as_path()),
            Prerequisite::NoConflict(p) => ("no_conflict", p.as_path()),
            Prerequisite::SourceExists(p) => ("source_exists", p.as_path()),
        }
    }

    pub fn validate(&self, fs: &dyn FileSystem) -> Result<()> {
        match self {
            Prerequisite::ParentDir(p) => {
                let parent = p.parent();
                match parent {
                    None => Ok(()),
                    Some(parent) if parent.as_os_str().is_empty() => Ok(()),
                    Some(parent) => match fs.stat(parent) {
                        Ok(Some(info)) if info.is_dir() => Ok(()),
                        Ok(Some(_)) => Err(crate::error::Error::validation(
                            "<prereq>",
                            "parent_dir",
                            format!("{} exists but is not a directory", parent.display()),
                        )),
                        Ok(None) => Err(crate::error::Error::validation(
                            "<prereq>",
                            "parent_dir",
                            format!("parent directory {} does not exist", parent.display()),
                        )),
                        Err(e) => Err(crate::error::Error::filesystem("<prereq>", parent, e)),
                    },
                }
            }
            Prerequisite::NoConflict(p) => match fs.stat(p) {
                Ok(None) => Ok(()),
                Ok(Some(_)) => Err(crate::error::Error::validation(
                    "<prereq>",
                    "no_conflict",
                    format!("{} already exists", p.display()),
                )),
                Err(e) => Err(crate::error::Error::filesystem("<prereq>", p, e)),
            },
            Prerequisite::SourceExists(p) => match fs.stat(p) {
                Ok(Some(_)) => Ok(()),
                Ok(None) => Err(crate::error::Error::validation(
                    "<prereq>",
                    "source_exists",
                    format!("{} does not exist", p.display()),
                )),
                Err(e) => Err(crate::error::Error::filesystem("<prereq>", p, e)),
            },
        }
    }
}

/// Threaded through validate/execute/reverse_ops/rollback: cooperative
/// cancellation (§5) plus a correlation id for logging.
#[derive(Clone)]
pub struct ExecContext {
    pub batch_id: String,
    cancel: Arc<AtomicBool>,
}

impl ExecContext {
    pub fn new(batch_id: impl Into<String>) -> Self {
        ExecContext {
            batch_id: batch_id.into(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        CancellationToken {
            cancel: self.cancel.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct CancellationToken {
    cancel: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Outcome of computing a reverse operation set for one executed
/// operation (§4.7).
pub struct ReverseOutcome {
    pub restore_ops: Vec<Box<dyn Operation>>,
    pub backup_data: Option<BackupData>,
}

impl ReverseOutcome {
    pub fn none() -> Self {
        ReverseOutcome {
            restore_ops: Vec::new(),
            backup_data: None,
        }
    }
}

/// One planned filesystem mutation (§4.1).
pub trait Operation: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> OperationKind;
    fn describe(&self) -> String;
    fn path(&self) -> &Path;
    fn get_item(&self) -> Option<&FsItem>;

    /// Attaches or replaces this operation's item payload (§4.2's
    /// `set_item_for_operation`), rejecting any item whose variant
    /// doesn't match the operation's own kind. Operations with no item
    /// slot (copy/move/delete) reject every item.
    fn set_item(&mut self, item: FsItem) -> Result<()> {
        let _ = item;
        Err(Error::validation(self.id(), self.describe(), "operation does not accept an item"))
    }

    fn dependencies(&self) -> &[String];
    fn add_dependency(&mut self, id: String);
    fn prerequisites(&self) -> Vec<Prerequisite>;

    fn validate(&self, ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()>;
    fn execute(&self, ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()>;

    /// Compute the restore operations and backup payload needed to undo
    /// this operation's effect *before* it executes. `budget` is consulted
    /// before any bytes are copied (§4.6 budget policy).
    fn reverse_ops(
        &self,
        ctx: &ExecContext,
        fs: &dyn FileSystem,
        budget: &mut BackupBudget,
    ) -> Result<ReverseOutcome>;

    /// Best-effort synchronous undo of this specific operation's effect,
    /// used by the executor's rollback closure.
    fn rollback(&self, ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()>;

    /// Clone behind the trait object, so the executor can retain its own
    /// copy of each executed operation for a rollback closure returned
    /// independently of the pipeline that produced it.
    fn box_clone(&self) -> Box<dyn Operation>;
}

pub(crate) fn sanitize_path_for_id(path: &Path) -> String {
    path.to_string_lossy().replace(['/', '\\'], "_")
}
