use std::path::{Path, PathBuf};

use super::{ExecContext, Operation, OperationKind, Prerequisite, ReverseOutcome};
use crate::archive;
use crate::backup::BackupBudget;
use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::item::FsItem;

#[derive(Debug, Clone)]
pub struct CreateArchiveOp {
    id: String,
    path: PathBuf,
    item: Option<FsItem>,
    deps: Vec<String>,
}

impl CreateArchiveOp {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        CreateArchiveOp {
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

impl Operation for CreateArchiveOp {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> OperationKind {
        OperationKind::CreateArchive
    }

    fn describe(&self) -> String {
        format!("create archive {}", self.path.display())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get_item(&self) -> Option<&FsItem> {
        self.item.as_ref()
    }

    fn set_item(&mut self, item: FsItem) -> Result<()> {
        match item {
            FsItem::Archive { .. } => {
                self.item = Some(item);
                Ok(())
            }
            _ => Err(Error::validation(&self.id, self.describe(), "expected an archive item")),
        }
    }

    fn dependencies(&self) -> &[String] {
        &self.deps
    }

    fn add_dependency(&mut self, id: String) {
        self.deps.push(id);
    }

    fn prerequisites(&self) -> Vec<Prerequisite> {
        let mut prereqs = vec![
            Prerequisite::ParentDir(self.path.clone()),
            Prerequisite::NoConflict(self.path.clone()),
        ];
        if let Some(FsItem::Archive { sources, .. }) = &self.item {
            prereqs.extend(sources.iter().cloned().map(Prerequisite::SourceExists));
        }
        prereqs
    }

    fn validate(&self, _ctx: &ExecContext, _fs: &dyn FileSystem) -> Result<()> {
        match &self.item {
            Some(FsItem::Archive { sources, .. }) if !sources.is_empty() => Ok(()),
            Some(FsItem::Archive { .. }) => Err(Error::validation(&self.id, self.describe(), "archive has no sources")),
            Some(_) => Err(Error::validation(&self.id, self.describe(), "item is not an archive item")),
            None => Err(Error::validation(&self.id, self.describe(), "missing archive item")),
        }
    }

    fn execute(&self, _ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        let Some(FsItem::Archive { path, format, sources }) = &self.item else {
            return Err(Error::validation(&self.id, self.describe(), "missing archive item"));
        };
        if fs.exists(path).map_err(|e| Error::filesystem(&self.id, path, e))? {
            return Err(Error::validation(&self.id, self.describe(), format!("{} already exists", path.display())));
        }

        let mut entries = Vec::new();
        for src in sources {
            let info = fs
                .stat(src)
                .map_err(|e| Error::filesystem(&self.id, src, e))?
                .ok_or_else(|| Error::validation(&self.id, self.describe(), format!("source {} does not exist", src.display())))?;
            if info.is_dir() {
                let rel_files = fs.walk_files(src).map_err(|e| Error::filesystem(&self.id, src, e))?;
                for rel in rel_files {
                    let full = src.join(&rel);
                    let content = fs.read(&full).map_err(|e| Error::filesystem(&self.id, &full, e))?;
                    let mode = fs
                        .stat(&full)
                        .map_err(|e| Error::filesystem(&self.id, &full, e))?
                        .map(|i| i.mode)
                        .unwrap_or(crate::item::DEFAULT_FILE_MODE);
                    let name = src
                        .file_name()
                        .map(|n| Path::new(n).join(&rel))
                        .unwrap_or(rel)
                        .to_string_lossy()
                        .into_owned();
                    entries.push((name, content, mode));
                }
            } else {
                let content = fs.read(src).map_err(|e| Error::filesystem(&self.id, src, e))?;
                let name = src.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                entries.push((name, content, info.mode));
            }
        }

        let codec = archive::codec_for(format);
        let packed = codec.pack(&entries)?;
        fs.write_file(path, &packed, crate::item::DEFAULT_FILE_MODE)
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
