use std::path::{Path, PathBuf};

use super::{ExecContext, Operation, OperationKind, Prerequisite, ReverseOutcome};
use crate::backup::BackupBudget;
use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::item::FsItem;

#[derive(Debug, Clone)]
pub struct MoveOp {
    id: String,
    src: PathBuf,
    dst: PathBuf,
    deps: Vec<String>,
}

impl MoveOp {
    pub fn new(id: impl Into<String>, src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        MoveOp {
            id: id.into(),
            src: src.into(),
            dst: dst.into(),
            deps: Vec::new(),
        }
    }
}

impl Operation for MoveOp {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Move
    }

    fn describe(&self) -> String {
        format!("move {} -> {}", self.src.display(), self.dst.display())
    }

    fn path(&self) -> &Path {
        &self.dst
    }

    fn get_item(&self) -> Option<&FsItem> {
        None
    }

    fn dependencies(&self) -> &[String] {
        &self.deps
    }

    fn add_dependency(&mut self, id: String) {
        self.deps.push(id);
    }

    fn prerequisites(&self) -> Vec<Prerequisite> {
        vec![
            Prerequisite::SourceExists(self.src.clone()),
            Prerequisite::ParentDir(self.dst.clone()),
            Prerequisite::NoConflict(self.dst.clone()),
        ]
    }

    fn validate(&self, _ctx: &ExecContext, _fs: &dyn FileSystem) -> Result<()> {
        if self.src.as_os_str().is_empty() || self.dst.as_os_str().is_empty() {
            return Err(Error::validation(&self.id, self.describe(), "empty src or dst"));
        }
        Ok(())
    }

    fn execute(&self, _ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        fs.stat(&self.src)
            .map_err(|e| Error::filesystem(&self.id, &self.src, e))?
            .ok_or_else(|| Error::validation(&self.id, self.describe(), format!("source {} does not exist", self.src.display())))?;
        fs.rename(&self.src, &self.dst)
            .map_err(|e| Error::filesystem(&self.id, &self.dst, e))
    }

    fn reverse_ops(
        &self,
        _ctx: &ExecContext,
        _fs: &dyn FileSystem,
        _budget: &mut BackupBudget,
    ) -> Result<ReverseOutcome> {
        let restore: Box<dyn Operation> = Box::new(MoveOp::new(
            format!("restore_{}", self.id),
            self.dst.clone(),
            self.src.clone(),
        ));
        Ok(ReverseOutcome {
            restore_ops: vec![restore],
            backup_data: None,
        })
    }

    fn rollback(&self, _ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        if fs.exists(&self.dst).map_err(|e| Error::filesystem(&self.id, &self.dst, e))? {
            fs.rename(&self.dst, &self.src)
                .map_err(|e| Error::filesystem(&self.id, &self.src, e))?;
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }
}
