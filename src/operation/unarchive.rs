use std::path::{Path, PathBuf};

use super::{ExecContext, Operation, OperationKind, Prerequisite, ReverseOutcome};
use crate::archive;
use crate::backup::BackupBudget;
use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::item::FsItem;

#[derive(Debug, Clone)]
pub struct UnarchiveOp {
    id: String,
    path: PathBuf,
    item: Option<FsItem>,
    deps: Vec<String>,
}

impl UnarchiveOp {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        UnarchiveOp {
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

impl Operation for UnarchiveOp {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Unarchive
    }

    fn describe(&self) -> String {
        format!("unarchive into {}", self.path.display())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get_item(&self) -> Option<&FsItem> {
        self.item.as_ref()
    }

    fn set_item(&mut self, item: FsItem) -> Result<()> {
        match item {
            FsItem::Unarchive { .. } => {
                self.item = Some(item);
                Ok(())
            }
            _ => Err(Error::validation(&self.id, self.describe(), "expected an unarchive item")),
        }
    }

    fn dependencies(&self) -> &[String] {
        &self.deps
    }

    fn add_dependency(&mut self, id: String) {
        self.deps.push(id);
    }

    fn prerequisites(&self) -> Vec<Prerequisite> {
        match &self.item {
            Some(FsItem::Unarchive { archive_path, extract_path, .. }) => vec![
                Prerequisite::SourceExists(archive_path.clone()),
                Prerequisite::ParentDir(extract_path.clone()),
            ],
            _ => vec![Prerequisite::ParentDir(self.path.clone())],
        }
    }

    fn validate(&self, _ctx: &ExecContext, _fs: &dyn FileSystem) -> Result<()> {
        match &self.item {
            Some(FsItem::Unarchive { archive_path, extract_path, .. })
                if !archive_path.as_os_str().is_empty() && !extract_path.as_os_str().is_empty() =>
            {
                Ok(())
            }
            Some(FsItem::Unarchive { .. }) => Err(Error::validation(&self.id, self.describe(), "empty archive_path or extract_path")),
            Some(_) => Err(Error::validation(&self.id, self.describe(), "item is not an unarchive item")),
            None => Err(Error::validation(&self.id, self.describe(), "missing unarchive item")),
        }
    }

    fn execute(&self, _ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        let Some(FsItem::Unarchive { archive_path, extract_path, patterns }) = &self.item else {
            return Err(Error::validation(&self.id, self.describe(), "missing unarchive item"));
        };
        let info = fs
            .stat(archive_path)
            .map_err(|e| Error::filesystem(&self.id, archive_path, e))?
            .ok_or_else(|| Error::validation(&self.id, self.describe(), format!("archive {} does not exist", archive_path.display())))?;
        if info.is_dir() {
            return Err(Error::validation(&self.id, self.describe(), "archive path is a directory"));
        }

        let format = crate::item::ArchiveFormat::parse(extension_of(archive_path))
            .ok_or_else(|| Error::validation(&self.id, self.describe(), format!("unrecognized archive extension for {}", archive_path.display())))?;
        let raw = fs.read(archive_path).map_err(|e| Error::filesystem(&self.id, archive_path, e))?;
        let codec = archive::codec_for(&format);
        let pattern_list = patterns.clone().unwrap_or_default();
        let entries = codec.unpack(&raw, &pattern_list)?;

        if !fs.exists(extract_path).map_err(|e| Error::filesystem(&self.id, extract_path, e))? {
            fs.mkdir_all(extract_path, crate::item::DEFAULT_DIR_MODE)
                .map_err(|e| Error::filesystem(&self.id, extract_path, e))?;
        }
        for (name, content, mode) in entries {
            let dest = extract_path.join(&name);
            if let Some(parent) = dest.parent() {
                if !fs.exists(parent).map_err(|e| Error::filesystem(&self.id, parent, e))? {
                    fs.mkdir_all(parent, crate::item::DEFAULT_DIR_MODE)
                        .map_err(|e| Error::filesystem(&self.id, parent, e))?;
                }
            }
            fs.write_file(&dest, &content, mode)
                .map_err(|e| Error::filesystem(&self.id, &dest, e))?;
        }
        Ok(())
    }

    fn reverse_ops(
        &self,
        _ctx: &ExecContext,
        _fs: &dyn FileSystem,
        _budget: &mut BackupBudget,
    ) -> Result<ReverseOutcome> {
        let Some(FsItem::Unarchive { extract_path, .. }) = &self.item else {
            return Ok(ReverseOutcome::none());
        };
        // Best-effort: the restoration of whatever previously lived under
        // extract_path is out of scope (the extracted set can overlap
        // pre-existing content); undo is a best-effort removal of the
        // directory this operation populated.
        let restore: Box<dyn Operation> = Box::new(super::DeleteOp::new(
            format!("restore_{}", self.id),
            extract_path.clone(),
        ));
        Ok(ReverseOutcome {
            restore_ops: vec![restore],
            backup_data: None,
        })
    }

    fn rollback(&self, ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        let Some(FsItem::Unarchive { extract_path, .. }) = &self.item else {
            return Ok(());
        };
        // Same best-effort removal reverse_ops would stage as a restore
        // step; rollback runs it directly since there's no separate
        // restore handle in this path.
        super::DeleteOp::new(format!("rollback_{}", self.id), extract_path.clone()).execute(ctx, fs)
    }

    fn box_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }
}

fn extension_of(path: &Path) -> &str {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        "tar.gz"
    } else if name.ends_with(".zip") {
        "zip"
    } else {
        ""
    }
}
