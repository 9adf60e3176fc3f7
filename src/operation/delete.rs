use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{create_file::CreateFileOp, ExecContext, Operation, OperationKind, Prerequisite, ReverseOutcome};
use crate::backup::{bytes_to_mb, BackupBudget, BackupData, BackupKind};
use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::item::FsItem;

#[derive(Debug, Clone)]
pub struct DeleteOp {
    id: String,
    path: PathBuf,
    deps: Vec<String>,
}

impl DeleteOp {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        DeleteOp {
            id: id.into(),
            path: path.into(),
            deps: Vec::new(),
        }
    }
}

impl Operation for DeleteOp {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Delete
    }

    fn describe(&self) -> String {
        format!("delete {}", self.path.display())
    }

    fn path(&self) -> &Path {
        &self.path
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
        vec![Prerequisite::SourceExists(self.path.clone())]
    }

    fn validate(&self, _ctx: &ExecContext, _fs: &dyn FileSystem) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::validation(&self.id, self.describe(), "empty path"));
        }
        Ok(())
    }

    fn execute(&self, _ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        match fs.stat(&self.path).map_err(|e| Error::filesystem(&self.id, &self.path, e))? {
            None => Ok(()), // idempotent on missing paths
            Some(info) if info.is_dir() => fs
                .remove_all(&self.path)
                .map_err(|e| Error::filesystem(&self.id, &self.path, e)),
            Some(_) => fs
                .remove(&self.path)
                .map_err(|e| Error::filesystem(&self.id, &self.path, e)),
        }
    }

    fn reverse_ops(
        &self,
        _ctx: &ExecContext,
        fs: &dyn FileSystem,
        budget: &mut BackupBudget,
    ) -> Result<ReverseOutcome> {
        let Some(info) = fs.stat(&self.path).map_err(|e| Error::filesystem(&self.id, &self.path, e))? else {
            // Nothing exists; deleting it is already a no-op, nothing to restore.
            return Ok(ReverseOutcome::none());
        };

        if info.is_dir() {
            return self.reverse_directory(fs, budget);
        }

        let content = fs.read(&self.path).map_err(|e| Error::filesystem(&self.id, &self.path, e))?;
        let size_mb = bytes_to_mb(content.len() as u64);
        budget.reserve(size_mb)?;

        let restore: Box<dyn Operation> = Box::new(
            CreateFileOp::new(format!("restore_{}", self.id), self.path.clone())
                .with_item(FsItem::file_with_mode(self.path.clone(), content.clone(), info.mode)),
        );
        let backup = BackupData {
            operation_id: self.id.clone(),
            backup_type: BackupKind::File,
            original_path: self.path.clone(),
            content,
            mode: info.mode,
            timestamp: Some(info.modified),
            size_mb,
            metadata: HashMap::new(),
        };
        Ok(ReverseOutcome {
            restore_ops: vec![restore],
            backup_data: Some(backup),
        })
    }

    fn rollback(&self, _ctx: &ExecContext, _fs: &dyn FileSystem) -> Result<()> {
        // A delete's on-disk effect can only be undone through the restore
        // operation produced by reverse_ops (it needs the backed-up
        // content); a bare rollback has nothing to recreate from.
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }
}

impl DeleteOp {
    fn reverse_directory(&self, fs: &dyn FileSystem, budget: &mut BackupBudget) -> Result<ReverseOutcome> {
        let rel_files = fs
            .walk_files(&self.path)
            .map_err(|e| Error::filesystem(&self.id, &self.path, e))?;

        let mut total_mb = 0.0;
        let mut entries = Vec::new();
        for rel in &rel_files {
            let full = self.path.join(rel);
            let content = fs.read(&full).map_err(|e| Error::filesystem(&self.id, &full, e))?;
            let mode = fs
                .stat(&full)
                .map_err(|e| Error::filesystem(&self.id, &full, e))?
                .map(|i| i.mode)
                .unwrap_or(crate::item::DEFAULT_FILE_MODE);
            total_mb += bytes_to_mb(content.len() as u64);
            entries.push((rel.clone(), content, mode));
        }
        budget.reserve(total_mb)?;

        let dir_mode = fs
            .stat(&self.path)
            .map_err(|e| Error::filesystem(&self.id, &self.path, e))?
            .map(|i| i.mode)
            .unwrap_or(crate::item::DEFAULT_DIR_MODE);

        let mut restore_ops: Vec<Box<dyn Operation>> = Vec::new();
        restore_ops.push(Box::new(
            super::CreateDirectoryOp::new(format!("restore_{}_root", self.id), self.path.clone())
                .with_item(FsItem::directory_with_mode(self.path.clone(), dir_mode)),
        ));
        let mut metadata = HashMap::new();
        for (i, (rel, content, mode)) in entries.iter().enumerate() {
            let full = self.path.join(rel);
            metadata.insert(format!("entry_{i}"), rel.to_string_lossy().into_owned());
            restore_ops.push(Box::new(
                CreateFileOp::new(format!("restore_{}_{i}", self.id), full.clone())
                    .with_item(FsItem::file_with_mode(full, content.clone(), *mode)),
            ));
        }

        let backup = BackupData {
            operation_id: self.id.clone(),
            backup_type: BackupKind::Dir,
            original_path: self.path.clone(),
            content: Vec::new(),
            mode: dir_mode,
            timestamp: None,
            size_mb: total_mb,
            metadata,
        };
        Ok(ReverseOutcome {
            restore_ops,
            backup_data: Some(backup),
        })
    }
}
