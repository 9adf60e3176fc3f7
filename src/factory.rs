//! Constructor-injected operation builder (§9 Design Notes: no global
//! singleton in the core — every caller owns its own factory instance).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::item::FsItem;
use crate::operation::{
    self, CopyOp, CreateArchiveOp, CreateDirectoryOp, CreateFileOp, CreateSymlinkOp, DeleteOp,
    MoveOp, Operation, OperationKind, UnarchiveOp,
};

/// Builds [`Operation`] instances with stable, collision-resistant ids.
/// One `OperationFactory` per batch (or per caller) is the expected
/// lifetime; it holds no filesystem state, only an id counter.
#[derive(Debug, Default)]
pub struct OperationFactory {
    counter: AtomicU64,
}

impl OperationFactory {
    pub fn new() -> Self {
        OperationFactory {
            counter: AtomicU64::new(0),
        }
    }

    fn next_id(&self, kind: OperationKind, path: &Path) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}_{}_{}", kind.as_str(), n, operation::sanitize_path_for_id(path))
    }

    pub fn create_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>, mode: u32) -> Box<dyn Operation> {
        let path = path.into();
        let id = self.next_id(OperationKind::CreateFile, &path);
        Box::new(CreateFileOp::new(id, path.clone()).with_item(FsItem::file_with_mode(path, content, mode)))
    }

    pub fn create_directory(&self, path: impl Into<PathBuf>, mode: u32) -> Box<dyn Operation> {
        let path = path.into();
        let id = self.next_id(OperationKind::CreateDirectory, &path);
        Box::new(CreateDirectoryOp::new(id, path.clone()).with_item(FsItem::directory_with_mode(path, mode)))
    }

    pub fn create_symlink(&self, path: impl Into<PathBuf>, target: impl Into<String>) -> Box<dyn Operation> {
        let path = path.into();
        let id = self.next_id(OperationKind::CreateSymlink, &path);
        Box::new(CreateSymlinkOp::new(id, path.clone()).with_item(FsItem::symlink(path, target)))
    }

    pub fn create_archive(
        &self,
        path: impl Into<PathBuf>,
        format: crate::item::ArchiveFormat,
        sources: Vec<PathBuf>,
    ) -> Box<dyn Operation> {
        let path = path.into();
        let id = self.next_id(OperationKind::CreateArchive, &path);
        Box::new(CreateArchiveOp::new(id, path.clone()).with_item(FsItem::archive(path, format, sources)))
    }

    pub fn unarchive(
        &self,
        archive_path: impl Into<PathBuf>,
        extract_path: impl Into<PathBuf>,
        patterns: Option<Vec<String>>,
    ) -> Box<dyn Operation> {
        let extract_path = extract_path.into();
        let id = self.next_id(OperationKind::Unarchive, &extract_path);
        Box::new(
            UnarchiveOp::new(id, extract_path.clone())
                .with_item(FsItem::unarchive(archive_path, extract_path, patterns)),
        )
    }

    pub fn copy(&self, src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Box<dyn Operation> {
        let dst = dst.into();
        let id = self.next_id(OperationKind::Copy, &dst);
        Box::new(CopyOp::new(id, src.into(), dst))
    }

    pub fn mv(&self, src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Box<dyn Operation> {
        let dst = dst.into();
        let id = self.next_id(OperationKind::Move, &dst);
        Box::new(MoveOp::new(id, src.into(), dst))
    }

    pub fn delete(&self, path: impl Into<PathBuf>) -> Box<dyn Operation> {
        let path = path.into();
        let id = self.next_id(OperationKind::Delete, &path);
        Box::new(DeleteOp::new(id, path))
    }

    /// Used by the prerequisite resolver to synthesize ids for
    /// auto-inserted parent-directory creations.
    pub(crate) fn synthesize_parent_dir_id(&self, path: &Path) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("prereq_parent_dir_{}_{}", n, operation::sanitize_path_for_id(path))
    }

    /// Builds a bare operation with a caller-supplied id and no item
    /// attached yet (§4.2's `create_operation(id, type_name, path)`).
    /// Item-carrying kinds need a follow-up [`Self::set_item_for_operation`]
    /// before `validate`/`execute` will accept them.
    pub fn create_operation(
        &self,
        id: impl Into<String>,
        type_name: &str,
        path: impl Into<PathBuf>,
    ) -> Result<Box<dyn Operation>> {
        let id = id.into();
        let path = path.into();
        let kind = OperationKind::parse(type_name)
            .ok_or_else(|| Error::validation(&id, type_name, "unknown operation type"))?;
        Ok(match kind {
            OperationKind::CreateFile => Box::new(CreateFileOp::new(id, path)),
            OperationKind::CreateDirectory => Box::new(CreateDirectoryOp::new(id, path)),
            OperationKind::CreateSymlink => Box::new(CreateSymlinkOp::new(id, path)),
            OperationKind::CreateArchive => Box::new(CreateArchiveOp::new(id, path)),
            OperationKind::Unarchive => Box::new(UnarchiveOp::new(id, path)),
            OperationKind::Copy => Box::new(CopyOp::new(id, PathBuf::new(), path)),
            OperationKind::Move => Box::new(MoveOp::new(id, PathBuf::new(), path)),
            OperationKind::Delete => Box::new(DeleteOp::new(id, path)),
        })
    }

    /// Attaches `item` to an operation built by [`Self::create_operation`]
    /// (§4.2's `set_item_for_operation`). Rejects a mismatched item kind
    /// and rejects item-less kinds (copy/move/delete) outright.
    pub fn set_item_for_operation(&self, operation: &mut Box<dyn Operation>, item: FsItem) -> Result<()> {
        operation.set_item(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_operation_then_set_item_round_trip() {
        let factory = OperationFactory::new();
        let mut op = factory.create_operation("f1", "create_file", "a.txt").unwrap();
        assert!(op.get_item().is_none());
        factory
            .set_item_for_operation(&mut op, FsItem::file(PathBuf::from("a.txt"), b"hi".to_vec()))
            .unwrap();
        assert!(matches!(op.get_item(), Some(FsItem::File { .. })));
    }

    #[test]
    fn set_item_for_operation_rejects_mismatched_item() {
        let factory = OperationFactory::new();
        let mut op = factory.create_operation("d1", "create_directory", "dir").unwrap();
        let err = factory
            .set_item_for_operation(&mut op, FsItem::file(PathBuf::from("dir"), Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn set_item_for_operation_rejects_itemless_kind() {
        let factory = OperationFactory::new();
        let mut op = factory.create_operation("c1", "delete", "x").unwrap();
        let err = factory
            .set_item_for_operation(&mut op, FsItem::file(PathBuf::from("x"), Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn create_operation_rejects_unknown_type() {
        let factory = OperationFactory::new();
        assert!(factory.create_operation("z1", "reformat_disk", "x").is_err());
    }
}
