//! Automatic resolution of declared [`Prerequisite`]s into synthesized
//! operations the pipeline inserts ahead of the operation that needs
//! them (§3, §4.2).

use std::path::Path;

use crate::factory::OperationFactory;
use crate::fs_backend::FileSystem;
use crate::operation::{Operation, Prerequisite};

/// `parent_dir` is the only auto-resolvable prerequisite: a missing
/// parent can be synthesized as a `create_directory`. `no_conflict` and
/// `source_exists` describe facts about the batch author's intent that
/// the resolver has no safe way to manufacture.
pub struct PrerequisiteResolver<'a> {
    factory: &'a OperationFactory,
}

impl<'a> PrerequisiteResolver<'a> {
    pub fn new(factory: &'a OperationFactory) -> Self {
        PrerequisiteResolver { factory }
    }

    pub fn can_resolve(&self, prereq: &Prerequisite) -> bool {
        matches!(prereq, Prerequisite::ParentDir(_))
    }

    /// Returns `Some(op)` when the prerequisite is missing and
    /// resolvable, `None` when it is already satisfied or cannot be
    /// auto-resolved (the caller falls through to normal validation).
    pub fn resolve(&self, prereq: &Prerequisite, fs: &dyn FileSystem) -> std::io::Result<Option<Box<dyn Operation>>> {
        let Prerequisite::ParentDir(path) = prereq else {
            return Ok(None);
        };
        let Some(parent) = path.parent() else {
            return Ok(None);
        };
        // An empty parent is "current directory"; `/` is the filesystem
        // root. Neither is something `create_directory` can sensibly
        // synthesize, and a backend like `MemoryFileSystem` that never
        // seeds `/` would otherwise report it missing forever.
        if parent.as_os_str().is_empty() || parent == Path::new("/") || fs.exists(parent)? {
            return Ok(None);
        }
        let id = self.factory.synthesize_parent_dir_id(parent);
        Ok(Some(Box::new(
            crate::operation::CreateDirectoryOp::new(id, parent.to_path_buf())
                .with_item(crate::item::FsItem::directory(parent.to_path_buf())),
        )))
    }
}
