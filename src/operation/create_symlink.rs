use std::path::{Path, PathBuf};

use super::{ExecContext, Operation, OperationKind, Prerequisite, ReverseOutcome};
use crate::backup::BackupBudget;
use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::item::FsItem;

#[derive(Debug, Clone)]
pub struct CreateSymlinkOp {
    id: String,
    path: PathBuf,
    item: Option<FsItem>,
    deps: Vec<String>,
}

impl CreateSymlinkOp {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        CreateSymlinkOp {
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

impl Operation for CreateSymlinkOp {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> OperationKind {
        OperationKind::CreateSymlink
    }

    fn describe(&self) -> String {
        format!("create symlink {}", self.path.display())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get_item(&self) -> Option<&FsItem> {
        self.item.as_ref()
    }

    fn set_item(&mut self, item: FsItem) -> Result<()> {
        match item {
            FsItem::Symlink { .. } => {
                self.item = Some(item);
                Ok(())
            }
            _ => Err(Error::validation(&self.id, self.describe(), "expected a symlink item")),
        }
    }

    fn dependencies(&self) -> &[String] {
        &self.deps
    }

    fn add_dependency(&mut self, id: String) {
        self.deps.push(id);
    }

    fn prerequisites(&self) -> Vec<Prerequisite> {
        vec![
            Prerequisite::ParentDir(self.path.clone()),
            Prerequisite::NoConflict(self.path.clone()),
        ]
    }

    fn validate(&self, _ctx: &ExecContext, _fs: &dyn FileSystem) -> Result<()> {
        match &self.item {
            Some(FsItem::Symlink { path, target }) if !path.as_os_str().is_empty() && !target.is_empty() => Ok(()),
            Some(_) => Err(Error::validation(&self.id, self.describe(), "item is not a valid symlink item")),
            None => Err(Error::validation(&self.id, self.describe(), "missing symlink item")),
        }
    }

    fn execute(&self, _ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        let Some(FsItem::Symlink { path, target }) = &self.item else {
            return Err(Error::validation(&self.id, self.describe(), "missing symlink item"));
        };
        if fs.exists(path).map_err(|e| Error::filesystem(&self.id, path, e))? {
            return Err(Error::validation(&self.id, self.describe(), format!("{} already exists", path.display())));
        }
        fs.symlink(target, path)
            .map_err(|e| Error::filesystem(&self.id, path, e))
    }

    fn reverse_ops(
        &self,
        _ctx: &ExecContext,
        _fs: &dyn FileSystem,
        _budget: &mut BackupBudget,
    ) -> Result<ReverseOutcome> {
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
        if fs.exists(&self.path).map_err(|e| Error::filesystem(&self.id, &self.path, e))? {
            fs.remove(&self.path)
                .map_err(|e| Error::filesystem(&self.id, &self.path, e))?;
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }
}
