//! Simulated end-state of every path touched by a batch (C4, §4.3).
//!
//! The tracker never touches the disk except to lazily seed a path's
//! initial snapshot the first time it is observed; all else is pure
//! bookkeeping used to catch batch-level contradictions at add-time.

use path_clean::PathClean;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs_backend::{FileInfo, FileSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WillBeType {
    File,
    Dir,
    Symlink,
    None,
}

#[derive(Debug, Clone)]
pub struct PathState {
    pub path: PathBuf,
    pub will_exist: bool,
    pub will_be_type: WillBeType,
    pub created_by: Option<String>,
    pub deleted_by: Option<String>,
    pub modified_by: Vec<String>,
    pub initial_info: Option<FileInfo>,
}

impl PathState {
    fn fresh(path: PathBuf, initial_info: Option<FileInfo>) -> Self {
        let (will_exist, will_be_type) = match &initial_info {
            Some(info) if info.is_dir() => (true, WillBeType::Dir),
            Some(info) if info.is_symlink() => (true, WillBeType::Symlink),
            Some(_) => (true, WillBeType::File),
            None => (false, WillBeType::None),
        };
        PathState {
            path,
            will_exist,
            will_be_type,
            created_by: None,
            deleted_by: None,
            modified_by: Vec::new(),
            initial_info,
        }
    }
}

pub fn normalize(path: &Path) -> PathBuf {
    path.to_path_buf().clean()
}

#[derive(Debug, Default)]
pub struct PathStateTracker {
    states: HashMap<PathBuf, PathState>,
}

impl PathStateTracker {
    pub fn new() -> Self {
        PathStateTracker {
            states: HashMap::new(),
        }
    }

    fn ensure(&mut self, path: &Path, fs: &dyn FileSystem) -> Result<()> {
        let key = normalize(path);
        if !self.states.contains_key(&key) {
            let info = fs
                .stat(&key)
                .map_err(|e| Error::filesystem("state-tracker", key.clone(), e))?;
            self.states.insert(key.clone(), PathState::fresh(key, info));
        }
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<&PathState> {
        self.states.get(&normalize(path))
    }

    pub fn is_deleted(&self, path: &Path) -> bool {
        self.get(path).map(|s| s.deleted_by.is_some()).unwrap_or(false)
    }

    fn mark_created(&mut self, path: &Path, kind: WillBeType, op_id: &str) {
        let key = normalize(path);
        let state = self.states.get_mut(&key).expect("ensure was called");
        state.will_exist = true;
        state.will_be_type = kind;
        state.created_by = Some(op_id.to_string());
        state.deleted_by = None;
    }

    fn check_create_conflict(&self, path: &Path, op_id: &str) -> Result<()> {
        let key = normalize(path);
        if let Some(state) = self.states.get(&key) {
            if state.will_exist {
                let other = state.created_by.clone().unwrap_or_else(|| "<pre-existing>".into());
                return Err(Error::conflict(
                    op_id,
                    other,
                    format!("cannot create {}, it already exists or was already created in this batch", key.display()),
                ));
            }
            if state.deleted_by.is_some() {
                let other = state.deleted_by.clone().unwrap();
                return Err(Error::conflict(
                    op_id,
                    other,
                    "path was scheduled for deletion",
                ));
            }
        }
        Ok(())
    }

    /// Apply the effect of a `create_file` / `create_symlink` / `create_archive`
    /// operation: conflicts if the path will already exist or is scheduled
    /// for deletion.
    pub fn apply_create(
        &mut self,
        path: &Path,
        kind: WillBeType,
        op_id: &str,
        fs: &dyn FileSystem,
    ) -> Result<()> {
        self.ensure(path, fs)?;
        self.check_create_conflict(path, op_id)?;
        self.mark_created(path, kind, op_id);
        Ok(())
    }

    /// `create_directory` is idempotent against an existing directory and
    /// never declares `no_conflict`, so it only rejects a true type clash
    /// or a pending deletion.
    pub fn apply_create_directory(&mut self, path: &Path, op_id: &str, fs: &dyn FileSystem) -> Result<()> {
        self.ensure(path, fs)?;
        let key = normalize(path);
        let state = self.states.get(&key).unwrap();
        if state.deleted_by.is_some() {
            let other = state.deleted_by.clone().unwrap();
            return Err(Error::conflict(op_id, other, "path was scheduled for deletion"));
        }
        if state.will_exist && state.will_be_type != WillBeType::Dir {
            let other = state.created_by.clone().unwrap_or_else(|| "<pre-existing>".into());
            return Err(Error::conflict(
                op_id,
                other,
                format!("cannot create directory at {}, a non-directory is scheduled there", key.display()),
            ));
        }
        if !state.will_exist {
            self.mark_created(path, WillBeType::Dir, op_id);
        }
        Ok(())
    }

    pub fn apply_delete(&mut self, path: &Path, op_id: &str, fs: &dyn FileSystem) -> Result<()> {
        self.ensure(path, fs)?;
        let key = normalize(path);
        let state = self.states.get(&key).unwrap();
        if !state.will_exist {
            return Err(Error::conflict(
                op_id,
                "<none>",
                format!("cannot delete {}, nothing exists there", key.display()),
            ));
        }
        if let Some(other) = &state.deleted_by {
            return Err(Error::conflict(
                op_id,
                other.clone(),
                format!("cannot delete {}, it is already scheduled for deletion", key.display()),
            ));
        }
        if let Some(other) = &state.created_by {
            return Err(Error::conflict(
                op_id,
                other.clone(),
                format!("cannot delete {}, it was created in the same batch", key.display()),
            ));
        }
        let state = self.states.get_mut(&key).unwrap();
        state.will_exist = false;
        state.will_be_type = WillBeType::None;
        state.deleted_by = Some(op_id.to_string());
        Ok(())
    }

    pub fn apply_copy(&mut self, src: &Path, dst: &Path, op_id: &str, fs: &dyn FileSystem) -> Result<()> {
        self.validate_source(src, op_id, fs)?;
        self.apply_create(dst, self.kind_of(src, fs)?, op_id, fs)
    }

    pub fn apply_move(&mut self, src: &Path, dst: &Path, op_id: &str, fs: &dyn FileSystem) -> Result<()> {
        self.validate_source(src, op_id, fs)?;
        let kind = self.kind_of(src, fs)?;
        self.apply_create(dst, kind, op_id, fs)?;
        let key = normalize(src);
        let state = self.states.get_mut(&key).unwrap();
        state.will_exist = false;
        state.will_be_type = WillBeType::None;
        state.deleted_by = Some(op_id.to_string());
        Ok(())
    }

    pub fn apply_unarchive(&mut self, archive: &Path, extract_dir: &Path, op_id: &str, fs: &dyn FileSystem) -> Result<()> {
        self.validate_source(archive, op_id, fs)?;
        self.ensure(extract_dir, fs)?;
        let key = normalize(extract_dir);
        let state = self.states.get_mut(&key).unwrap();
        state.modified_by.push(op_id.to_string());
        Ok(())
    }

    fn kind_of(&self, path: &Path, fs: &dyn FileSystem) -> Result<WillBeType> {
        let key = normalize(path);
        if let Some(state) = self.states.get(&key) {
            return Ok(state.will_be_type);
        }
        let info = fs
            .stat(&key)
            .map_err(|e| Error::filesystem("state-tracker", key.clone(), e))?;
        Ok(match info {
            Some(i) if i.is_dir() => WillBeType::Dir,
            Some(i) if i.is_symlink() => WillBeType::Symlink,
            Some(_) => WillBeType::File,
            None => WillBeType::None,
        })
    }

    fn validate_source(&mut self, path: &Path, op_id: &str, fs: &dyn FileSystem) -> Result<()> {
        self.ensure(path, fs)?;
        let key = normalize(path);
        let state = self.states.get(&key).unwrap();
        if !state.will_exist {
            return Err(Error::validation(
                op_id,
                "source-exists check",
                format!("source {} does not exist", key.display()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_backend::MemoryFileSystem;

    #[test]
    fn create_over_existing_conflicts() {
        let fs = MemoryFileSystem::new();
        fs.seed_file("/x", b"a".to_vec(), 0o644);
        let mut tracker = PathStateTracker::new();
        let err = tracker
            .apply_create(Path::new("/x"), WillBeType::File, "op2", &fs)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn delete_of_nonexistent_fails() {
        let fs = MemoryFileSystem::new();
        let mut tracker = PathStateTracker::new();
        let err = tracker.apply_delete(Path::new("/missing"), "op1", &fs).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn delete_of_just_created_fails() {
        let fs = MemoryFileSystem::new();
        let mut tracker = PathStateTracker::new();
        tracker.apply_create(Path::new("/x"), WillBeType::File, "op1", &fs).unwrap();
        let err = tracker.apply_delete(Path::new("/x"), "op2", &fs).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn double_delete_fails() {
        let fs = MemoryFileSystem::new();
        fs.seed_file("/x", b"a".to_vec(), 0o644);
        let mut tracker = PathStateTracker::new();
        tracker.apply_delete(Path::new("/x"), "op1", &fs).unwrap();
        let err = tracker.apply_delete(Path::new("/x"), "op2", &fs).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn create_over_scheduled_deletion_conflicts() {
        let fs = MemoryFileSystem::new();
        fs.seed_file("/x", b"a".to_vec(), 0o644);
        let mut tracker = PathStateTracker::new();
        tracker.apply_delete(Path::new("/x"), "op1", &fs).unwrap();
        let err = tracker
            .apply_create(Path::new("/x"), WillBeType::File, "op2", &fs)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert!(err.to_string().contains("scheduled for deletion"));
    }

    #[test]
    fn create_directory_is_idempotent() {
        let fs = MemoryFileSystem::new();
        fs.seed_dir("/x", 0o755);
        let mut tracker = PathStateTracker::new();
        tracker.apply_create_directory(Path::new("/x"), "op1", &fs).unwrap();
        assert!(tracker.get(Path::new("/x")).unwrap().created_by.is_none());
    }
}
