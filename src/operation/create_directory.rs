use std::path::{Path, PathBuf};

use super::{ExecContext, Operation, OperationKind, Prerequisite, ReverseOutcome};
use crate::backup::BackupBudget;
use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::item::FsItem;

#[derive(Debug, Clone)]
pub struct CreateDirectoryOp {
    id: String,
    path: PathBuf,
    item: Option<FsItem>,
    deps: Vec<String>,
}

impl CreateDirectoryOp {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        CreateDirectoryOp {
            id: id.into(),
            path: path.into(),
            item: None,
            deps: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: FsItem) -> Self {
        self.item = Some(item);
        self
    }
}

impl Operation for CreateDirectoryOp {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> OperationKind {
        OperationKind::CreateDirectory
    }

    fn describe(&self) -> String {
        format!("create directory {}", self.path.display())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get_item(&self) -> Option<&FsItem> {
        self.item.as_ref()
    }

    fn set_item(&mut self, item: FsItem) -> Result<()> {
        match item {
            FsItem::Directory { .. } => {
                self.item = Some(item);
                Ok(())
            }
            _ => Err(Error::validation(&self.id, self.describe(), "expected a directory item")),
        }
    }

    fn dependencies(&self) -> &[String] {
        &self.deps
    }

    fn add_dependency(&mut self, id: String) {
        self.deps.push(id);
    }

    /// Explicitly does NOT declare `no_conflict`: mkdir-like idempotence
    /// means creating over an existing directory is not a conflict.
    fn prerequisites(&self) -> Vec<Prerequisite> {
        vec![Prerequisite::ParentDir(self.path.clone())]
    }

    fn validate(&self, _ctx: &ExecContext, _fs: &dyn FileSystem) -> Result<()> {
        match &self.item {
            Some(FsItem::Directory { path, .. }) if !path.as_os_str().is_empty() => Ok(()),
            Some(_) => Err(Error::validation(&self.id, self.describe(), "item is not a non-empty directory item")),
            None => Err(Error::validation(&self.id, self.describe(), "missing directory item")),
        }
    }

    fn execute(&self, _ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        let Some(FsItem::Directory { path, mode }) = &self.item else {
            return Err(Error::validation(&self.id, self.describe(), "missing directory item"));
        };
        if let Some(info) = fs.stat(path).map_err(|e| Error::filesystem(&self.id, path, e))? {
            if !info.is_dir() {
                return Err(Error::validation(
                    &self.id,
                    self.describe(),
                    format!("{} exists and is not a directory", path.display()),
                ));
            }
            return Ok(());
        }
        fs.mkdir_all(path, *mode)
            .map_err(|e| Error::filesystem(&self.id, path, e))
    }

    fn reverse_ops(
        &self,
        _ctx: &ExecContext,
        fs: &dyn FileSystem,
        _budget: &mut BackupBudget,
    ) -> Result<ReverseOutcome> {
        // Idempotent creation of a pre-existing directory leaves nothing
        // for us to undo.
        let already_existed = fs
            .stat(&self.path)
            .map_err(|e| Error::filesystem(&self.id, &self.path, e))?
            .is_some();
        if already_existed {
            return Ok(ReverseOutcome::none());
        }
        let restore: Box<dyn Operation> = Box::new(super::DeleteOp::new(
            format!("restore_{}", self.id),
            self.path.clone(),
        ));
        Ok(ReverseOutcome {
            restore_ops: vec![restore],
            backup_data: None,
        })
    }

    fn rollback(&self, _ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        if let Some(info) = fs.stat(&self.path).map_err(|e| Error::filesystem(&self.id, &self.path, e))? {
            if info.is_dir() {
                // Best effort: only remove if we actually made it (empty).
                let _ = fs.remove(&self.path);
            }
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }
}
