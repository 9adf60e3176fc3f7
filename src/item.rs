//! Typed descriptors for what a create-style operation materializes.
//!
//! Mirrors the variant set from the spec: every operation owns at most
//! one item, items are created by the [`crate::factory::OperationFactory`]
//! alone, and are never mutated after construction.

use std::path::PathBuf;

pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const DEFAULT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tar.gz" => Some(ArchiveFormat::TarGz),
            "zip" => Some(ArchiveFormat::Zip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FsItem {
    File {
        path: PathBuf,
        content: Vec<u8>,
        mode: u32,
    },
    Directory {
        path: PathBuf,
        mode: u32,
    },
    Symlink {
        path: PathBuf,
        target: String,
    },
    Archive {
        path: PathBuf,
        format: ArchiveFormat,
        sources: Vec<PathBuf>,
    },
    Unarchive {
        archive_path: PathBuf,
        extract_path: PathBuf,
        patterns: Option<Vec<String>>,
    },
}

impl FsItem {
    pub fn file(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        FsItem::File {
            path: path.into(),
            content: content.into(),
            mode: DEFAULT_FILE_MODE,
        }
    }

    pub fn file_with_mode(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>, mode: u32) -> Self {
        FsItem::File {
            path: path.into(),
            content: content.into(),
            mode,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        FsItem::Directory {
            path: path.into(),
            mode: DEFAULT_DIR_MODE,
        }
    }

    pub fn directory_with_mode(path: impl Into<PathBuf>, mode: u32) -> Self {
        FsItem::Directory {
            path: path.into(),
            mode,
        }
    }

    pub fn symlink(path: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        FsItem::Symlink {
            path: path.into(),
            target: target.into(),
        }
    }

    pub fn archive(path: impl Into<PathBuf>, format: ArchiveFormat, sources: Vec<PathBuf>) -> Self {
        FsItem::Archive {
            path: path.into(),
            format,
            sources,
        }
    }

    pub fn unarchive(
        archive_path: impl Into<PathBuf>,
        extract_path: impl Into<PathBuf>,
        patterns: Option<Vec<String>>,
    ) -> Self {
        FsItem::Unarchive {
            archive_path: archive_path.into(),
            extract_path: extract_path.into(),
            patterns,
        }
    }
}
